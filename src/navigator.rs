use crate::audio::AudioEngine;
use crate::config::SettingsStore;
use crate::error::DecodeError;
use crate::events::{Notification, Observer};
use crate::library::{self, ScanReport};
use crate::model::{Catalog, PlayMode, PlaybackState, Track};
use crate::player::PlaybackController;
use crate::policy::{self, Direction, RandomHistory};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use std::path::PathBuf;
use std::rc::Rc;

const VOLUME_STEP: u8 = 5;
const MAX_VOLUME: u8 = 100;
const DEFAULT_VOLUME: u8 = 50;

/// Playlist navigation on top of the playback controller.
pub struct Navigator {
    catalog: Catalog,
    controller: PlaybackController,
    settings: Box<dyn SettingsStore>,
    history: RandomHistory,
    selected: Option<usize>,
    volume: u8,
    rng: SmallRng,
    observer: Option<Rc<dyn Observer>>,
}

impl Navigator {
    pub fn new(engine: Box<dyn AudioEngine>, settings: Box<dyn SettingsStore>) -> Self {
        Self::with_rng(engine, settings, SmallRng::from_os_rng())
    }

    pub fn with_rng(
        engine: Box<dyn AudioEngine>,
        settings: Box<dyn SettingsStore>,
        rng: SmallRng,
    ) -> Self {
        Self {
            catalog: Catalog::new(),
            controller: PlaybackController::new(engine),
            settings,
            history: RandomHistory::new(),
            selected: None,
            volume: DEFAULT_VOLUME,
            rng,
            observer: None,
        }
    }

    pub fn register_observer(&mut self, observer: Rc<dyn Observer>) {
        self.controller.set_observer(Rc::clone(&observer));
        self.observer = Some(observer);
    }

    /// Replaces the catalog wholesale. Playback stops and every per-catalog
    /// reference is dropped.
    pub fn load_catalog(&mut self, catalog: Catalog) {
        self.controller.reset();
        self.selected = None;
        self.history.clear();
        self.catalog = catalog;
        tracing::info!(tracks = self.catalog.len(), "catalog loaded");
        self.emit(Notification::DataChanged {
            catalog: self.catalog.clone(),
            mode: self.mode(),
        });
    }

    /// Rebuilds the catalog from the stored directories.
    pub fn rescan(&mut self) -> ScanReport {
        let mut report = library::scan_directories(self.settings.directories());
        self.load_catalog(std::mem::take(&mut report.catalog));
        report.catalog = self.catalog.clone();
        report
    }

    pub fn update_directories(&mut self, directories: Vec<PathBuf>) -> ScanReport {
        self.controller.stop();
        if self.settings.set_directories(directories) {
            tracing::info!("music directories changed");
        }
        self.rescan()
    }

    pub fn cycle_mode(&mut self) -> PlayMode {
        let previous = self.mode();
        let mode = previous.next();

        if previous == PlayMode::Random {
            self.history.clear();
        }
        if mode == PlayMode::Random {
            match self.controller.current() {
                Some(track) => self.history.seed(track.index),
                None => self.history.clear(),
            }
        }

        self.settings.set_mode(mode);
        tracing::info!(mode = mode.label(), "play mode changed");
        self.emit(Notification::ModeChanged(mode));
        mode
    }

    pub fn mode(&self) -> PlayMode {
        self.settings.mode()
    }

    /// Highlights a track without playing it.
    pub fn select(&mut self, index: usize) -> Option<&Track> {
        let track = self.catalog.get(index)?;
        self.selected = Some(index);
        Some(track)
    }

    /// Plays the track at `index`, as when the user picks a row.
    pub fn activate(&mut self, index: usize) -> Result<(), DecodeError> {
        let Some(track) = self.catalog.get(index).cloned() else {
            return Ok(());
        };
        self.selected = Some(index);
        self.controller.play(&track)?;
        self.remember(track.index);
        Ok(())
    }

    pub fn toggle_play(&mut self) -> Result<(), DecodeError> {
        let selected = self.selected.and_then(|index| self.catalog.get(index));
        if let Some(track) = self.controller.toggle_play(selected)? {
            self.remember(track.index);
        }
        Ok(())
    }

    pub fn pause(&mut self) {
        self.controller.pause();
    }

    pub fn stop(&mut self) {
        self.controller.stop();
    }

    pub fn next(&mut self) -> Result<(), DecodeError> {
        self.step(Direction::Next)
    }

    pub fn previous(&mut self) -> Result<(), DecodeError> {
        self.step(Direction::Previous)
    }

    /// Moves in `direction` according to the active mode.
    pub fn step(&mut self, direction: Direction) -> Result<(), DecodeError> {
        let current = self.controller.current().map(|track| track.index);
        let target = policy::target_index(
            self.mode(),
            current,
            self.catalog.len(),
            &mut self.history,
            direction,
            &mut self.rng,
        );

        match (target.and_then(|index| self.catalog.get(index)), direction) {
            (Some(track), _) => {
                let track = track.clone();
                self.controller.play(&track)
            }
            (None, Direction::Next) => {
                self.controller.hold_at_end();
                Ok(())
            }
            (None, Direction::Previous) => Ok(()),
        }
    }

    /// Drains worker completions and auto-advances after a natural end.
    /// Returns whether anything was processed.
    pub fn pump(&mut self) -> bool {
        let mut processed = false;
        while let Some(advance) = self.controller.pump() {
            processed = true;
            if advance && let Err(err) = self.step(Direction::Next) {
                tracing::warn!("auto-advance failed: {err}");
            }
        }
        processed
    }

    /// Volume is tracked for display only.
    pub fn adjust_volume(&mut self, up: bool) -> u8 {
        self.volume = if up {
            self.volume.saturating_add(VOLUME_STEP).min(MAX_VOLUME)
        } else {
            self.volume.saturating_sub(VOLUME_STEP)
        };
        self.emit(Notification::VolumeChanged(self.volume));
        self.volume
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn state(&self) -> PlaybackState {
        self.controller.state()
    }

    pub fn current(&self) -> Option<&Track> {
        self.controller.current()
    }

    pub fn selected(&self) -> Option<&Track> {
        self.selected.and_then(|index| self.catalog.get(index))
    }

    pub fn history(&self) -> &RandomHistory {
        &self.history
    }

    pub fn volume(&self) -> u8 {
        self.volume
    }

    pub fn directories(&self) -> &[PathBuf] {
        self.settings.directories()
    }

    fn remember(&mut self, index: usize) {
        if self.mode() == PlayMode::Random {
            self.history.push(index);
        }
    }

    fn emit(&self, notification: Notification) {
        if let Some(observer) = &self.observer {
            observer.notify(notification);
        }
    }
}
