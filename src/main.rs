//! # Hark - MPD playback tracker
//!
//! Hark observes a running MPD instance and records what actually happened
//! to each song: fully listened, skipped away from, or neither. A companion
//! `dj` mode keeps the queue topped up with random picks from the library.
//!
//! ## Usage
//!
//! ```bash
//! # Build the library database
//! hark init-db ~/Music
//!
//! # Record play/skip verdicts until interrupted
//! hark tracker
//!
//! # Keep 30 songs upcoming in the queue
//! hark dj -n 30
//! ```
//!
//! Logging is controlled via `RUST_LOG`, e.g. `RUST_LOG=debug hark tracker`.

use anyhow::Result;
use clap::{CommandFactory, Parser};

use hark::autoqueue::AutoQueue;
use hark::cli;
use hark::config::Config;
use hark::library::{self, Library};
use hark::mpd_client::MpdHandle;
use hark::tracker::Tracker;

fn mpd_handle(config: &Config) -> MpdHandle {
    MpdHandle::new(
        &config.mpd.host,
        config.mpd.port,
        config.mpd.password.as_deref(),
    )
}

fn main() -> Result<()> {
    env_logger::init();

    let args = cli::Args::parse();

    match args.command {
        cli::Command::Tracker => {
            let config = Config::load()?;
            let mpd = mpd_handle(&config);
            let library = Library::open_default()?;
            Tracker::new(config, mpd, library)?.run()?;
        }
        cli::Command::Dj { number, album } => {
            let mut config = Config::load()?;
            config.auto_queue.items = number;
            config.auto_queue.album = config.auto_queue.album || album;

            let music_dir = config.music_directory()?;
            let mpd = mpd_handle(&config);
            let library = Library::open_default()?;
            AutoQueue::new(
                mpd,
                library,
                music_dir,
                config.auto_queue.items,
                config.auto_queue.album,
            )
            .run()?;
        }
        cli::Command::InitDb { path, force } => {
            library::init_database(&path, force)?;
        }
        cli::Command::Update {
            path,
            remove_missing,
        } => {
            library::update_database(&path, remove_missing)?;
        }
        cli::Command::List => {
            library::list_items()?;
        }
        cli::Command::Completion { shell } => {
            let mut cmd = cli::Args::command();
            clap_complete::generate(shell, &mut cmd, "hark", &mut std::io::stdout());
        }
    }

    Ok(())
}
