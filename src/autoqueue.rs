//! Queue topping-up loop.
//!
//! `hark dj` watches the queue and player subsystems and keeps the number of
//! upcoming items at the configured target by adding random picks from the
//! library. "Upcoming" is counted in library identities - item ids, or album
//! ids in album mode - so two queued tracks from the same album count once
//! when albums are the unit.
//!
//! MPD's random mode is switched off every cycle: upcoming only means
//! something when the queue plays in order. An emptied queue is left alone;
//! clearing it is how the user says stop.

use anyhow::{Context, Result};
use log::{debug, info, warn};
use rand::seq::SliceRandom;
use rand::thread_rng;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::library::Library;
use crate::mpd_client::{MpdHandle, Subsystem};
use crate::paths;

/// Long-running queue minder for one MPD connection.
pub struct AutoQueue {
    mpd: MpdHandle,
    library: Library,
    music_dir: PathBuf,
    /// Target number of upcoming identities.
    target: usize,
    /// Queue whole album directories instead of single items.
    album_mode: bool,
}

impl AutoQueue {
    pub fn new(
        mpd: MpdHandle,
        library: Library,
        music_dir: PathBuf,
        target: usize,
        album_mode: bool,
    ) -> Self {
        Self {
            mpd,
            library,
            music_dir,
            target,
            album_mode,
        }
    }

    /// Run until the connection is lost for good or the process is killed.
    pub fn run(&mut self) -> Result<()> {
        self.mpd.connect().context("cannot start auto-queue")?;
        let unit = if self.album_mode { "albums" } else { "songs" };
        info!("auto-queue started: keeping {} {unit} upcoming", self.target);

        loop {
            if let Err(e) = self.top_up() {
                warn!("queue top-up failed: {e:#}");
            }

            self.mpd
                .wait(&[Subsystem::Player, Subsystem::Queue])
                .context("lost connection to MPD")?;
        }
    }

    /// One idle cycle: count upcoming identities, fill the deficit.
    fn top_up(&mut self) -> Result<()> {
        // Upcoming is only well-defined on an in-order queue.
        self.mpd.set_random(false)?;

        let snapshot = self.mpd.snapshot()?;
        if snapshot.queue_len == 0 {
            debug!("queue is empty; leaving it alone");
            return Ok(());
        }

        let queue = self.mpd.queue_files()?;
        let upcoming = self.upcoming_identities(&queue, snapshot.queue_pos)?;

        let deficit = self.target.saturating_sub(upcoming.len());
        debug!("{} upcoming, target {}", upcoming.len(), self.target);
        if deficit == 0 {
            return Ok(());
        }

        for path in self.pick_candidates(deficit)? {
            let uri = match paths::to_mpd_uri(&self.music_dir, Path::new(&path)) {
                Ok(uri) => uri,
                Err(e) => {
                    warn!("skipping candidate: {e:#}");
                    continue;
                }
            };

            match self.mpd.add(&uri) {
                Ok(()) => info!("queued {uri}"),
                Err(e) => warn!("failed to queue {uri}: {e:#}"),
            }
        }

        Ok(())
    }

    /// Library identities of the queue entries after the current song.
    /// Entries the library does not know contribute no identity.
    fn upcoming_identities(
        &self,
        queue: &[String],
        current_pos: Option<u32>,
    ) -> Result<HashSet<i64>> {
        let first_upcoming = current_pos.map(|pos| pos as usize + 1).unwrap_or(0);
        let mut identities = HashSet::new();

        for file in queue.iter().skip(first_upcoming) {
            let absolute = paths::to_absolute(&self.music_dir, file);
            let Some(item) = self.library.item_by_path(&absolute.to_string_lossy())? else {
                warn!("queued file not in library: {file}");
                continue;
            };

            if self.album_mode {
                match item.album_id {
                    Some(album_id) => {
                        identities.insert(album_id);
                    }
                    None => debug!("item has no album: {file}"),
                }
            } else {
                identities.insert(item.id);
            }
        }

        Ok(identities)
    }

    /// Random sample of `count` candidate paths - item files, or album
    /// directories in album mode.
    fn pick_candidates(&self, count: usize) -> Result<Vec<String>> {
        let pool = if self.album_mode {
            self.library.album_directories()?
        } else {
            self.library.item_paths()?
        };

        if pool.is_empty() {
            warn!("library has no candidates to queue");
            return Ok(Vec::new());
        }

        let mut rng = thread_rng();
        Ok(pool
            .choose_multiple(&mut rng, count)
            .cloned()
            .collect::<Vec<_>>())
    }
}
