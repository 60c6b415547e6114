use std::io;
use std::path::PathBuf;

/// Failure to open or decode an audio file.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("track not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("failed to open {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("unsupported audio in {}: {reason}", path.display())]
    Unsupported { path: PathBuf, reason: String },
    #[error("no playable audio track in {}", .0.display())]
    NoTrack(PathBuf),
    #[error("decode failed: {0}")]
    Stream(String),
    #[error("audio worker is not running")]
    WorkerGone,
}

#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("permission denied: {}", .0.display())]
    PermissionDenied(PathBuf),
    #[error("not a directory: {}", .0.display())]
    NotADirectory(PathBuf),
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("no configuration directory: set HOME or TUNEDECK_CONFIG_DIR")]
    NoConfigDir,
    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed settings in {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
