//! Command-line interface definitions.
//!
//! Clap derive structures for the `hark` binary. The two long-running modes
//! (`tracker`, `dj`) wrap the loops in [`crate::tracker`] and
//! [`crate::autoqueue`]; the remaining commands manage the library database.
//!
//! ```bash
//! hark init-db ~/Music
//! hark tracker
//! hark dj -n 30 -a
//! ```

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

/// Main application arguments.
#[derive(Parser)]
#[command(name = "hark")]
#[command(about = "Hark: MPD playback tracker - play/skip verdicts & queue topping-up")]
#[command(version)]
pub struct Args {
    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Track playback and record play/skip verdicts
    ///
    /// Watches MPD's player events, reconstructs how much of each song was
    /// actually heard, and writes play counts, skip counts, and last-played
    /// timestamps to the library. Runs until interrupted.
    Tracker,

    /// Keep the MPD queue topped up with random library picks
    ///
    /// Watches the queue and adds random songs (or albums) whenever fewer
    /// than the target number of items are upcoming. Runs until interrupted.
    Dj {
        /// Number of upcoming items to maintain in the queue
        #[arg(short = 'n', long = "number", default_value_t = 20)]
        number: usize,

        /// Queue whole albums instead of single songs
        #[arg(short = 'a', long = "album")]
        album: bool,
    },

    /// Initialize the library database from a music directory (full scan)
    InitDb {
        /// Root of the music collection to scan
        path: PathBuf,

        /// Overwrite an existing database
        #[arg(long)]
        force: bool,
    },

    /// Update the library database with new files (incremental)
    Update {
        /// Root of the music collection to scan
        path: PathBuf,

        /// Remove entries for files that no longer exist
        #[arg(long)]
        remove_missing: bool,
    },

    /// List library items with their playback statistics
    List,

    /// Generate shell completions
    ///
    /// Usage: hark completion bash > ~/.local/share/bash-completion/completions/hark
    Completion {
        /// Shell to generate completions for
        shell: Shell,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn dj_defaults() {
        let args = Args::try_parse_from(["hark", "dj"]).unwrap();
        match args.command {
            Command::Dj { number, album } => {
                assert_eq!(number, 20);
                assert!(!album);
            }
            _ => panic!("expected dj subcommand"),
        }
    }

    #[test]
    fn dj_flags() {
        let args = Args::try_parse_from(["hark", "dj", "-n", "7", "-a"]).unwrap();
        match args.command {
            Command::Dj { number, album } => {
                assert_eq!(number, 7);
                assert!(album);
            }
            _ => panic!("expected dj subcommand"),
        }
    }
}
