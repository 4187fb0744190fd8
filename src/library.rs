//! Library database operations.
//!
//! Handles SQLite operations for items, albums, and playback statistics
//! (play counts, skip counts, last-played timestamps).

use anyhow::{Context, Result};
use log::debug;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::config;

/// One song in the library, keyed by its absolute path.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub id: i64,
    pub path: String,
    pub album_id: Option<i64>,
    pub artist: String,
    pub title: String,
    pub play_count: u32,
    pub skip_count: u32,
    /// Unix seconds of the last completed listen; never set for items that
    /// have only ever been skipped.
    pub last_played: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Album {
    pub id: i64,
    pub artist: String,
    pub title: String,
    /// Directory holding the album's files, used for album-mode queueing.
    pub directory: String,
    pub last_played: Option<i64>,
}

pub struct Library {
    conn: Connection,
}

fn item_from_row(row: &Row) -> rusqlite::Result<Item> {
    Ok(Item {
        id: row.get(0)?,
        path: row.get(1)?,
        album_id: row.get(2)?,
        artist: row.get(3)?,
        title: row.get(4)?,
        play_count: row.get(5)?,
        skip_count: row.get(6)?,
        last_played: row.get(7)?,
    })
}

const ITEM_COLUMNS: &str = "id, path, album_id, artist, title, play_count, skip_count, last_played";

impl Library {
    /// Open (and if necessary create) a library database.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open library database at {}", path.display()))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS albums (
                id INTEGER PRIMARY KEY,
                artist TEXT NOT NULL,
                title TEXT NOT NULL,
                directory TEXT NOT NULL,
                last_played INTEGER,
                UNIQUE(artist, title)
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS items (
                id INTEGER PRIMARY KEY,
                path TEXT UNIQUE NOT NULL,
                album_id INTEGER,
                artist TEXT NOT NULL,
                title TEXT NOT NULL,
                play_count INTEGER NOT NULL DEFAULT 0,
                skip_count INTEGER NOT NULL DEFAULT 0,
                last_played INTEGER,
                FOREIGN KEY (album_id) REFERENCES albums (id)
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_items_album ON items(album_id)",
            [],
        )?;

        Ok(Self { conn })
    }

    /// Open the library at its default data-directory location.
    pub fn open_default() -> Result<Self> {
        Self::open(&config::get_db_path()?)
    }

    pub fn item_by_path(&self, path: &str) -> Result<Option<Item>> {
        let query = format!("SELECT {ITEM_COLUMNS} FROM items WHERE path = ?1");
        let item = self
            .conn
            .query_row(&query, params![path], item_from_row)
            .optional()?;
        Ok(item)
    }

    pub fn album(&self, album_id: i64) -> Result<Option<Album>> {
        let album = self
            .conn
            .query_row(
                "SELECT id, artist, title, directory, last_played FROM albums WHERE id = ?1",
                params![album_id],
                |row| {
                    Ok(Album {
                        id: row.get(0)?,
                        artist: row.get(1)?,
                        title: row.get(2)?,
                        directory: row.get(3)?,
                        last_played: row.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(album)
    }

    pub fn album_items(&self, album_id: i64) -> Result<Vec<Item>> {
        let query = format!("SELECT {ITEM_COLUMNS} FROM items WHERE album_id = ?1");
        let mut stmt = self.conn.prepare(&query)?;
        let items = stmt
            .query_map(params![album_id], item_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }

    /// Record a completed listen: bump the play count and stamp the time.
    /// Returns the new play count.
    pub fn record_play(&self, item_id: i64, now: i64) -> Result<u32> {
        self.conn.execute(
            "UPDATE items SET play_count = play_count + 1, last_played = ?2 WHERE id = ?1",
            params![item_id, now],
        )?;

        let count = self.conn.query_row(
            "SELECT play_count FROM items WHERE id = ?1",
            params![item_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Record a skip. Returns the new skip count.
    pub fn record_skip(&self, item_id: i64) -> Result<u32> {
        self.conn.execute(
            "UPDATE items SET skip_count = skip_count + 1 WHERE id = ?1",
            params![item_id],
        )?;

        let count = self.conn.query_row(
            "SELECT skip_count FROM items WHERE id = ?1",
            params![item_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Update the album's `last_played` once every member item has one.
    ///
    /// The album takes the *oldest* member timestamp: it only counts as
    /// played once its least-recently-played track has been heard. Returns
    /// the timestamp that was set, or `None` when members are still missing.
    pub fn rollup_album_last_played(&self, album_id: i64) -> Result<Option<i64>> {
        let stamps: Vec<Option<i64>> = {
            let mut stmt = self
                .conn
                .prepare("SELECT last_played FROM items WHERE album_id = ?1")?;
            let rows = stmt
                .query_map(params![album_id], |row| row.get(0))?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        };

        if stamps.is_empty() || stamps.iter().any(Option::is_none) {
            return Ok(None);
        }

        let oldest = stamps.into_iter().flatten().min();
        self.conn.execute(
            "UPDATE albums SET last_played = ?2 WHERE id = ?1",
            params![album_id, oldest],
        )?;

        Ok(oldest)
    }

    /// All item paths, for random queue candidates.
    pub fn item_paths(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT path FROM items")?;
        let paths = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(paths)
    }

    /// All album directories, for album-mode queue candidates.
    pub fn album_directories(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT directory FROM albums")?;
        let dirs = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(dirs)
    }

    /// Scan a music directory into the library. Existing items are left
    /// untouched so their statistics survive rescans. Returns
    /// `(added, seen)` counts.
    pub fn scan_directory(&mut self, root: &Path) -> Result<(usize, usize)> {
        let files = find_music_files(root)?;
        let seen = files.len();
        let mut added = 0;

        let tx = self.conn.transaction()?;
        for file in &files {
            let Some((artist, album, title)) = metadata_from_path(file) else {
                continue;
            };

            let directory = file
                .parent()
                .map(|p| p.to_string_lossy().to_string())
                .unwrap_or_default();

            tx.execute(
                "INSERT OR IGNORE INTO albums (artist, title, directory) VALUES (?1, ?2, ?3)",
                params![artist, album, directory],
            )?;
            let album_id: i64 = tx.query_row(
                "SELECT id FROM albums WHERE artist = ?1 AND title = ?2",
                params![artist, album],
                |row| row.get(0),
            )?;

            let path = file.to_string_lossy();
            let inserted = tx.execute(
                "INSERT OR IGNORE INTO items (path, album_id, artist, title) VALUES (?1, ?2, ?3, ?4)",
                params![path, album_id, artist, title],
            )?;
            added += inserted;
        }
        tx.commit()?;

        Ok((added, seen))
    }

    /// Delete items whose files no longer exist under `root`, plus albums
    /// left without members. Returns the number of removed items.
    pub fn remove_missing(&mut self, root: &Path) -> Result<usize> {
        let on_disk: HashSet<String> = find_music_files(root)?
            .into_iter()
            .map(|p| p.to_string_lossy().to_string())
            .collect();

        let stored: Vec<(i64, String)> = {
            let mut stmt = self.conn.prepare("SELECT id, path FROM items")?;
            let rows = stmt
                .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        };

        let tx = self.conn.transaction()?;
        let mut removed = 0;
        for (id, path) in stored {
            if !on_disk.contains(&path) {
                debug!("removing missing item: {path}");
                tx.execute("DELETE FROM items WHERE id = ?1", params![id])?;
                removed += 1;
            }
        }
        tx.execute(
            "DELETE FROM albums WHERE id NOT IN (SELECT DISTINCT album_id FROM items
             WHERE album_id IS NOT NULL)",
            [],
        )?;
        tx.commit()?;

        Ok(removed)
    }

    fn all_items(&self) -> Result<Vec<Item>> {
        let query = format!("SELECT {ITEM_COLUMNS} FROM items ORDER BY artist, title");
        let mut stmt = self.conn.prepare(&query)?;
        let items = stmt
            .query_map([], item_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }
}

/// Full scan for `hark init-db`.
pub fn init_database(root: &Path, force: bool) -> Result<()> {
    let start_time = Instant::now();
    let db_path = config::get_db_path()?;

    println!("🎵 Hark Library Initialization");
    println!("Music directory: {}", root.display());
    println!("Database: {}", db_path.display());

    if force && db_path.exists() {
        println!("🗑️  Removing existing database...");
        std::fs::remove_file(&db_path)?;
    }

    let mut library = Library::open(&db_path)?;
    let (added, seen) = library.scan_directory(root)?;

    let duration = start_time.elapsed();
    println!(
        "✅ Scanned {seen} files, added {added} items in {:.2}s",
        duration.as_secs_f64()
    );

    Ok(())
}

/// Incremental scan for `hark update`.
pub fn update_database(root: &Path, remove_missing: bool) -> Result<()> {
    let start_time = Instant::now();
    let mut library = Library::open_default()?;

    let (added, seen) = library.scan_directory(root)?;
    let removed = if remove_missing {
        library.remove_missing(root)?
    } else {
        0
    };

    let duration = start_time.elapsed();
    println!(
        "✅ Scanned {seen} files: {added} added, {removed} removed in {:.2}s",
        duration.as_secs_f64()
    );

    Ok(())
}

/// Dump items with their statistics for `hark list`.
pub fn list_items() -> Result<()> {
    let library = Library::open_default()?;
    let items = library.all_items()?;

    println!("📚 Items in library: {}", items.len());
    for item in items {
        println!(
            "{} - {} (plays: {}, skips: {})",
            item.artist, item.title, item.play_count, item.skip_count
        );
    }

    Ok(())
}

fn find_music_files(root: &Path) -> Result<Vec<PathBuf>> {
    let extensions = ["mp3", "flac", "ogg", "m4a", "wav", "opus"];
    let mut files = Vec::new();

    fn scan(dir: &Path, files: &mut Vec<PathBuf>, extensions: &[&str]) -> Result<()> {
        for entry in std::fs::read_dir(dir)
            .with_context(|| format!("failed to read directory {}", dir.display()))?
        {
            let path = entry?.path();
            if path.is_dir() {
                scan(&path, files, extensions)?;
            } else if let Some(ext) = path.extension() {
                let ext = ext.to_string_lossy().to_lowercase();
                if extensions.contains(&ext.as_str()) {
                    files.push(path);
                }
            }
        }
        Ok(())
    }

    scan(root, &mut files, &extensions)?;
    files.sort();
    Ok(files)
}

/// Derive (artist, album, title) from an `artist/album/title.ext` layout.
fn metadata_from_path(path: &Path) -> Option<(String, String, String)> {
    let title = path.file_stem()?.to_string_lossy().to_string();
    let album_dir = path.parent()?;
    let artist_dir = album_dir.parent()?;

    let album = album_dir.file_name()?.to_string_lossy().to_string();
    let artist = artist_dir.file_name()?.to_string_lossy().to_string();

    if album.is_empty() || artist.is_empty() {
        return Some(("Unknown".to_string(), "Unknown".to_string(), title));
    }

    Some((artist, album, title))
}
