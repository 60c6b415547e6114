use crate::audio::{AudioEngine, Completion};
use crate::error::DecodeError;
use crate::events::{Notification, Observer};
use crate::model::{PlaybackState, Track};
use std::rc::Rc;

/// Owns playback state and drives the audio engine on the control thread.
pub struct PlaybackController {
    engine: Box<dyn AudioEngine>,
    state: PlaybackState,
    current: Option<Track>,
    session: Option<u64>,
    observer: Option<Rc<dyn Observer>>,
}

impl PlaybackController {
    pub fn new(engine: Box<dyn AudioEngine>) -> Self {
        Self {
            engine,
            state: PlaybackState::Stopped,
            current: None,
            session: None,
            observer: None,
        }
    }

    pub fn set_observer(&mut self, observer: Rc<dyn Observer>) {
        self.observer = Some(observer);
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn current(&self) -> Option<&Track> {
        self.current.as_ref()
    }

    /// Whether the engine is holding a session for the current track.
    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    /// Starts `track` from the beginning, replacing whatever was playing.
    ///
    /// On failure the controller is Stopped and the current track is left
    /// as it was.
    pub fn play(&mut self, track: &Track) -> Result<(), DecodeError> {
        self.session = None;
        match self.engine.load(&track.path) {
            Ok(session) => {
                tracing::debug!(
                    track = %track.name,
                    generation = session.generation,
                    "playing"
                );
                self.session = Some(session.generation);
                self.current = Some(track.clone());
                self.engine.go();
                self.transition(PlaybackState::Playing);
                Ok(())
            }
            Err(err) => {
                tracing::warn!(track = %track.name, "cannot play: {err}");
                self.state = PlaybackState::Stopped;
                self.emit(Notification::PlaybackFailed {
                    path: track.path.clone(),
                    reason: err.to_string(),
                });
                self.emit_state();
                Err(err)
            }
        }
    }

    /// Toggles between Playing and Paused. Does nothing while Stopped.
    pub fn pause(&mut self) {
        match self.state {
            PlaybackState::Playing => {
                self.engine.hold();
                self.transition(PlaybackState::Paused);
            }
            PlaybackState::Paused => {
                if let Err(err) = self.resume() {
                    tracing::warn!("resume failed: {err}");
                }
            }
            PlaybackState::Stopped => {}
        }
    }

    /// Continues a paused track. A track held after its session ended is
    /// replayed from the start.
    pub fn resume(&mut self) -> Result<(), DecodeError> {
        if self.state != PlaybackState::Paused {
            return Ok(());
        }
        if self.session.is_some() {
            self.engine.go();
            self.transition(PlaybackState::Playing);
            return Ok(());
        }
        match self.current.clone() {
            Some(track) => self.play(&track),
            None => {
                self.transition(PlaybackState::Stopped);
                Ok(())
            }
        }
    }

    pub fn stop(&mut self) {
        if self.state == PlaybackState::Stopped {
            return;
        }
        self.engine.cancel();
        self.session = None;
        self.transition(PlaybackState::Stopped);
    }

    /// Stops playback and forgets the current track.
    pub fn reset(&mut self) {
        if self.state == PlaybackState::Stopped && self.current.is_none() {
            return;
        }
        self.engine.cancel();
        self.session = None;
        self.current = None;
        self.transition(PlaybackState::Stopped);
    }

    /// Parks the controller on the current track when there is nowhere
    /// further to go.
    pub fn hold_at_end(&mut self) {
        match self.state {
            PlaybackState::Playing => {
                self.engine.hold();
                self.transition(PlaybackState::Paused);
            }
            PlaybackState::Stopped if self.current.is_some() => {
                self.session = None;
                self.transition(PlaybackState::Paused);
            }
            _ => {}
        }
    }

    /// Pauses when playing; otherwise plays `selected`, falling back to the
    /// current track. Returns the track that started, if any.
    pub fn toggle_play(&mut self, selected: Option<&Track>) -> Result<Option<Track>, DecodeError> {
        if self.state == PlaybackState::Playing {
            self.pause();
            return Ok(None);
        }
        let Some(track) = selected.or(self.current.as_ref()).cloned() else {
            return Ok(None);
        };
        self.play(&track)?;
        Ok(Some(track))
    }

    /// Drains one completion from the engine. Returns `Some(true)` when the
    /// live session ended naturally and the caller should advance.
    pub fn pump(&mut self) -> Option<bool> {
        let completion = self.engine.poll_completion()?;
        Some(self.on_completion(completion))
    }

    pub fn on_completion(&mut self, completion: Completion) -> bool {
        if self.session != Some(completion.generation) {
            tracing::debug!(
                generation = completion.generation,
                live = ?self.session,
                "discarding stale completion"
            );
            return false;
        }

        self.session = None;
        let advance = completion.reached_natural_end && self.state == PlaybackState::Playing;
        if self.state != PlaybackState::Stopped {
            self.transition(PlaybackState::Stopped);
        }
        advance
    }

    fn transition(&mut self, state: PlaybackState) {
        self.state = state;
        self.emit_state();
    }

    fn emit_state(&self) {
        self.emit(Notification::StateChanged {
            state: self.state,
            track: self.current.clone(),
        });
    }

    fn emit(&self, notification: Notification) {
        if let Some(observer) = &self.observer {
            observer.notify(notification);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{SampleEncoding, Session, StreamInfo};
    use std::cell::RefCell;
    use std::path::{Path, PathBuf};

    #[derive(Default)]
    struct Calls {
        generation: u64,
        running: bool,
        broken: bool,
        log: Vec<String>,
    }

    /// Engine double: paths containing "missing" fail to load, as does
    /// everything once `broken` is set.
    struct FakeEngine {
        calls: Rc<RefCell<Calls>>,
        pending: Rc<RefCell<Vec<Completion>>>,
    }

    impl AudioEngine for FakeEngine {
        fn load(&mut self, path: &Path) -> Result<Session, DecodeError> {
            let mut calls = self.calls.borrow_mut();
            calls.generation += 1;
            calls.running = false;
            calls.log.push(format!("load {}", path.display()));
            if calls.broken || path.to_string_lossy().contains("missing") {
                return Err(DecodeError::NotFound(path.to_path_buf()));
            }
            Ok(Session {
                generation: calls.generation,
                info: StreamInfo {
                    sample_rate: 44_100,
                    channels: 2,
                    encoding: SampleEncoding::Signed(16),
                    total_frames: None,
                },
            })
        }

        fn go(&mut self) {
            let mut calls = self.calls.borrow_mut();
            calls.running = true;
            calls.log.push(String::from("go"));
        }

        fn hold(&mut self) {
            let mut calls = self.calls.borrow_mut();
            calls.running = false;
            calls.log.push(String::from("hold"));
        }

        fn cancel(&mut self) {
            let mut calls = self.calls.borrow_mut();
            calls.generation += 1;
            calls.running = false;
            calls.log.push(String::from("cancel"));
        }

        fn poll_completion(&mut self) -> Option<Completion> {
            let mut pending = self.pending.borrow_mut();
            (!pending.is_empty()).then(|| pending.remove(0))
        }
    }

    #[derive(Default)]
    struct Recorder(RefCell<Vec<Notification>>);

    impl Observer for Recorder {
        fn notify(&self, notification: Notification) {
            self.0.borrow_mut().push(notification);
        }
    }

    struct Harness {
        controller: PlaybackController,
        calls: Rc<RefCell<Calls>>,
        pending: Rc<RefCell<Vec<Completion>>>,
        recorder: Rc<Recorder>,
    }

    impl Harness {
        fn new() -> Self {
            let calls = Rc::new(RefCell::new(Calls::default()));
            let pending = Rc::new(RefCell::new(Vec::new()));
            let mut controller = PlaybackController::new(Box::new(FakeEngine {
                calls: Rc::clone(&calls),
                pending: Rc::clone(&pending),
            }));
            let recorder = Rc::new(Recorder::default());
            controller.set_observer(recorder.clone());
            Self {
                controller,
                calls,
                pending,
                recorder,
            }
        }

        fn complete(&self, natural: bool) {
            let generation = self.calls.borrow().generation;
            self.pending.borrow_mut().push(Completion {
                generation,
                reached_natural_end: natural,
            });
        }

        fn states(&self) -> Vec<PlaybackState> {
            self.recorder
                .0
                .borrow()
                .iter()
                .filter_map(|n| match n {
                    Notification::StateChanged { state, .. } => Some(*state),
                    _ => None,
                })
                .collect()
        }
    }

    fn track(name: &str, index: usize) -> Track {
        Track {
            name: name.to_string(),
            path: PathBuf::from(format!("/music/{name}.mp3")),
            index,
        }
    }

    #[test]
    fn play_pause_stop_cycle() {
        let mut h = Harness::new();
        let a = track("a", 0);

        h.controller.play(&a).expect("play");
        assert_eq!(h.controller.state(), PlaybackState::Playing);
        assert_eq!(h.controller.current(), Some(&a));
        assert!(h.calls.borrow().running);

        h.controller.pause();
        assert_eq!(h.controller.state(), PlaybackState::Paused);
        assert!(!h.calls.borrow().running);

        h.controller.pause();
        assert_eq!(h.controller.state(), PlaybackState::Playing);

        h.controller.stop();
        assert_eq!(h.controller.state(), PlaybackState::Stopped);
        assert!(!h.controller.has_session());
        assert_eq!(
            h.states(),
            vec![
                PlaybackState::Playing,
                PlaybackState::Paused,
                PlaybackState::Playing,
                PlaybackState::Stopped
            ]
        );
    }

    #[test]
    fn stop_while_paused_cancels_the_session() {
        let mut h = Harness::new();
        h.controller.play(&track("a", 0)).expect("play");
        h.controller.pause();
        assert!(h.controller.has_session());

        h.controller.stop();
        assert_eq!(h.controller.state(), PlaybackState::Stopped);
        assert!(!h.controller.has_session());
        let calls = h.calls.borrow();
        assert_eq!(calls.log.last().map(String::as_str), Some("cancel"));
        assert!(!calls.running);
    }

    #[test]
    fn failed_replay_on_unpause_stops_and_reports() {
        let mut h = Harness::new();
        h.controller.play(&track("a", 0)).expect("play");
        h.complete(true);
        h.controller.pump();
        h.controller.hold_at_end();
        assert_eq!(h.controller.state(), PlaybackState::Paused);

        h.calls.borrow_mut().broken = true;
        h.controller.pause();
        assert_eq!(h.controller.state(), PlaybackState::Stopped);
        assert!(
            h.recorder
                .0
                .borrow()
                .iter()
                .any(|n| matches!(n, Notification::PlaybackFailed { .. }))
        );
    }

    #[test]
    fn failed_play_keeps_previous_track() {
        let mut h = Harness::new();
        let a = track("a", 0);
        h.controller.play(&a).expect("play a");

        let err = h
            .controller
            .play(&track("missing", 1))
            .expect_err("missing should fail");
        assert!(matches!(err, DecodeError::NotFound(_)));
        assert_eq!(h.controller.state(), PlaybackState::Stopped);
        assert_eq!(h.controller.current(), Some(&a));
        assert!(
            h.recorder
                .0
                .borrow()
                .iter()
                .any(|n| matches!(n, Notification::PlaybackFailed { .. }))
        );
    }

    #[test]
    fn toggle_play_prefers_selection() {
        let mut h = Harness::new();
        let b = track("b", 1);
        let started = h.controller.toggle_play(Some(&b)).expect("toggle");
        assert_eq!(started, Some(b.clone()));
        assert_eq!(h.controller.state(), PlaybackState::Playing);
        assert_eq!(h.controller.current(), Some(&b));

        assert_eq!(h.controller.toggle_play(Some(&b)).expect("toggle"), None);
        assert_eq!(h.controller.state(), PlaybackState::Paused);
    }

    #[test]
    fn toggle_play_without_anything_is_a_no_op() {
        let mut h = Harness::new();
        assert_eq!(h.controller.toggle_play(None).expect("toggle"), None);
        assert_eq!(h.controller.state(), PlaybackState::Stopped);
        assert!(h.states().is_empty());
    }

    #[test]
    fn natural_completion_requests_advance() {
        let mut h = Harness::new();
        h.controller.play(&track("a", 0)).expect("play");
        h.complete(true);

        assert_eq!(h.controller.pump(), Some(true));
        assert_eq!(h.controller.state(), PlaybackState::Stopped);
        assert_eq!(h.controller.pump(), None);
    }

    #[test]
    fn stale_completion_is_discarded() {
        let mut h = Harness::new();
        h.controller.play(&track("a", 0)).expect("play");
        h.complete(true);
        h.controller.play(&track("b", 1)).expect("play");

        assert_eq!(h.controller.pump(), Some(false));
        assert_eq!(h.controller.state(), PlaybackState::Playing);
    }

    #[test]
    fn natural_end_while_paused_does_not_advance() {
        let mut h = Harness::new();
        h.controller.play(&track("a", 0)).expect("play");
        h.controller.pause();
        h.complete(true);

        assert_eq!(h.controller.pump(), Some(false));
        assert_eq!(h.controller.state(), PlaybackState::Stopped);
    }

    #[test]
    fn hold_at_end_after_completion_replays_on_resume() {
        let mut h = Harness::new();
        let c = track("c", 2);
        h.controller.play(&c).expect("play");
        h.complete(true);
        assert_eq!(h.controller.pump(), Some(true));

        h.controller.hold_at_end();
        assert_eq!(h.controller.state(), PlaybackState::Paused);
        assert_eq!(h.controller.current(), Some(&c));
        assert!(!h.controller.has_session());

        h.controller.pause();
        assert_eq!(h.controller.state(), PlaybackState::Playing);
        assert!(h.controller.has_session());
        let loads = h
            .calls
            .borrow()
            .log
            .iter()
            .filter(|entry| entry.starts_with("load"))
            .count();
        assert_eq!(loads, 2);
    }
}
