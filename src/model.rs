use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum PlayMode {
    #[default]
    Sequence,
    Loop,
    SingleLoop,
    Random,
}

impl PlayMode {
    pub fn next(self) -> Self {
        match self {
            Self::Sequence => Self::Loop,
            Self::Loop => Self::SingleLoop,
            Self::SingleLoop => Self::Random,
            Self::Random => Self::Sequence,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Sequence => "Sequence",
            Self::Loop => "Loop",
            Self::SingleLoop => "Single",
            Self::Random => "Random",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

/// A discovered audio file. Two tracks are equal when their catalog index is.
#[derive(Debug, Clone)]
pub struct Track {
    pub name: String,
    pub path: PathBuf,
    pub index: usize,
}

impl PartialEq for Track {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl Eq for Track {}

/// Ordered track list where `tracks[i].index == i` always holds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    tracks: Vec<Track>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a catalog from `(name, path)` pairs in discovery order.
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, PathBuf)>,
    {
        let tracks = entries
            .into_iter()
            .enumerate()
            .map(|(index, (name, path))| Track { name, path, index })
            .collect();
        Self { tracks }
    }

    /// Accepts tracks from an external source, renumbering any whose index
    /// disagrees with its position.
    pub fn from_tracks(tracks: Vec<Track>) -> Self {
        let mut renumbered = 0_usize;
        let tracks = tracks
            .into_iter()
            .enumerate()
            .map(|(position, mut track)| {
                if track.index != position {
                    renumbered += 1;
                    track.index = position;
                }
                track
            })
            .collect();
        if renumbered > 0 {
            tracing::warn!(renumbered, "catalog indices were not contiguous");
        }
        Self { tracks }
    }

    pub fn get(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Track> {
        self.tracks.iter()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Settings {
    #[serde(default = "default_directories", alias = "dirs")]
    pub directories: Vec<PathBuf>,
    #[serde(default)]
    pub mode: PlayMode,
}

fn default_directories() -> Vec<PathBuf> {
    vec![crate::config::default_music_dir()]
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            directories: default_directories(),
            mode: PlayMode::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(name: &str, index: usize) -> Track {
        Track {
            name: name.to_string(),
            path: PathBuf::from(format!("{name}.mp3")),
            index,
        }
    }

    #[test]
    fn four_cycles_return_to_sequence() {
        let mut mode = PlayMode::Sequence;
        let mut seen = Vec::new();
        for _ in 0..4 {
            mode = mode.next();
            seen.push(mode);
        }
        assert_eq!(
            seen,
            vec![
                PlayMode::Loop,
                PlayMode::SingleLoop,
                PlayMode::Random,
                PlayMode::Sequence
            ]
        );
    }

    #[test]
    fn track_identity_is_the_index() {
        let a = track("a", 3);
        let mut renamed = track("renamed", 3);
        renamed.path = PathBuf::from("elsewhere.flac");
        assert_eq!(a, renamed);
        assert_ne!(a, track("a", 4));
    }

    #[test]
    fn from_entries_assigns_contiguous_indices() {
        let catalog = Catalog::from_entries(vec![
            (String::from("a"), PathBuf::from("/m/a.mp3")),
            (String::from("b"), PathBuf::from("/m/b.mp3")),
            (String::from("c"), PathBuf::from("/n/c.mp3")),
        ]);
        assert_eq!(catalog.len(), 3);
        for (position, track) in catalog.iter().enumerate() {
            assert_eq!(track.index, position);
        }
        assert_eq!(catalog.get(2).map(|t| t.name.as_str()), Some("c"));
        assert!(catalog.get(3).is_none());
    }

    #[test]
    fn from_tracks_repairs_bad_indices() {
        let catalog = Catalog::from_tracks(vec![track("a", 5), track("b", 1), track("c", 0)]);
        let indices: Vec<usize> = catalog.iter().map(|t| t.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert_eq!(catalog.get(0).map(|t| t.name.as_str()), Some("a"));
    }

    #[test]
    fn settings_fill_missing_fields_with_defaults() {
        let settings: Settings = serde_json::from_str(r#"{"mode":"Random"}"#).expect("parse");
        assert_eq!(settings.mode, PlayMode::Random);
        assert_eq!(settings.directories, default_directories());

        let legacy: Settings = serde_json::from_str(r#"{"dirs":["/srv/music"]}"#).expect("parse");
        assert_eq!(legacy.directories, vec![PathBuf::from("/srv/music")]);
        assert_eq!(legacy.mode, PlayMode::Sequence);
    }
}
