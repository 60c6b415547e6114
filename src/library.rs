use crate::error::ScanError;
use crate::model::Catalog;
use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const AUDIO_EXTENSIONS: &[&str] = &["mp3", "flac", "wav", "ogg", "m4a", "aac"];
const LYRICS_EXTENSION: &str = "lrc";

/// Result of scanning every configured directory.
#[derive(Debug, Default)]
pub struct ScanReport {
    pub catalog: Catalog,
    pub skipped: Vec<ScanError>,
}

/// One entry of the recursive media listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaListing {
    pub name: String,
    pub path: PathBuf,
    pub lyrics: Option<PathBuf>,
}

/// Lists the audio files directly inside `dir`, sorted by file name.
pub fn scan_directory(dir: &Path) -> Result<Vec<(String, PathBuf)>, ScanError> {
    if !dir.is_dir() {
        return Err(ScanError::NotADirectory(dir.to_path_buf()));
    }

    let mut found = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) if err.depth() == 0 => return Err(walk_error(dir, err)),
            Err(err) => {
                tracing::warn!(dir = %dir.display(), "skipping unreadable entry: {err}");
                continue;
            }
        };
        if is_hidden(entry.file_name()) || !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if !is_audio(path) {
            continue;
        }
        found.push((track_name(path), path.to_path_buf()));
    }
    Ok(found)
}

/// Scans each directory in order. Directories that fail are skipped and
/// reported; the rest still contribute tracks.
pub fn scan_directories(dirs: &[PathBuf]) -> ScanReport {
    let mut entries = Vec::new();
    let mut skipped = Vec::new();

    for dir in dirs {
        match scan_directory(dir) {
            Ok(found) => {
                tracing::debug!(dir = %dir.display(), tracks = found.len(), "scanned directory");
                entries.extend(found);
            }
            Err(err) => {
                tracing::warn!("skipping directory: {err}");
                skipped.push(err);
            }
        }
    }

    ScanReport {
        catalog: Catalog::from_entries(entries),
        skipped,
    }
}

/// Recursively lists audio files under `root`, pairing each with a sibling
/// `.lrc` lyrics file when one exists.
pub fn list_media(root: &Path) -> Result<Vec<MediaListing>, ScanError> {
    if !root.is_dir() {
        return Err(ScanError::NotADirectory(root.to_path_buf()));
    }

    let mut listing = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                tracing::warn!("skipping entry: {err}");
                continue;
            }
        };
        let path = entry.path();
        if !entry.file_type().is_file() || !is_audio(path) {
            continue;
        }
        let lyrics = path.with_extension(LYRICS_EXTENSION);
        listing.push(MediaListing {
            name: track_name(path),
            path: path.to_path_buf(),
            lyrics: lyrics.is_file().then_some(lyrics),
        });
    }
    Ok(listing)
}

pub fn is_audio(path: &Path) -> bool {
    let ext = path.extension().and_then(OsStr::to_str).unwrap_or_default();
    AUDIO_EXTENSIONS
        .iter()
        .any(|supported| ext.eq_ignore_ascii_case(supported))
}

fn track_name(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| String::from("unknown"))
}

fn is_hidden(name: &OsStr) -> bool {
    name.to_str().is_some_and(|name| name.starts_with('.'))
}

fn walk_error(dir: &Path, err: walkdir::Error) -> ScanError {
    let path = err.path().unwrap_or(dir).to_path_buf();
    match err.into_io_error() {
        Some(source) if source.kind() == io::ErrorKind::PermissionDenied => {
            ScanError::PermissionDenied(path)
        }
        Some(source) => ScanError::Io { path, source },
        None => ScanError::Io {
            path,
            source: io::Error::other("filesystem loop"),
        },
    }
}
