use super::decoder::{FrameSource, StreamInfo, open_symphonia};
use super::output::OutputSink;
use super::{AudioEngine, Completion, Session};
use crate::error::DecodeError;
use crossbeam_channel::{Receiver, Sender, TryRecvError, bounded, unbounded};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};

pub type SourceOpener =
    Box<dyn Fn(&Path) -> Result<Box<dyn FrameSource>, DecodeError> + Send + 'static>;

enum WorkerCommand {
    Load {
        path: PathBuf,
        generation: u64,
        reply: Sender<Result<StreamInfo, DecodeError>>,
    },
    Wake,
    Shutdown,
}

/// Flags shared between the control thread and the worker, checked at every
/// frame boundary.
#[derive(Debug, Default)]
struct SessionControl {
    generation: AtomicU64,
    running: AtomicBool,
}

impl SessionControl {
    fn supersede(&self) -> u64 {
        self.running.store(false, Ordering::Release);
        self.generation.fetch_add(1, Ordering::AcqRel) + 1
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::Acquire) == generation
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

/// Handle to the single long-lived decode/output thread.
pub struct DecodeWorker {
    commands: Sender<WorkerCommand>,
    completions: Receiver<Completion>,
    control: Arc<SessionControl>,
    handle: Option<JoinHandle<()>>,
}

impl DecodeWorker {
    /// Starts the worker with the symphonia decoder. `make_sink` runs on the
    /// worker thread, so the sink never has to cross threads.
    pub fn spawn<F>(make_sink: F) -> io::Result<Self>
    where
        F: FnOnce() -> Box<dyn OutputSink> + Send + 'static,
    {
        Self::spawn_with(make_sink, Box::new(open_symphonia))
    }

    pub fn spawn_with<F>(make_sink: F, opener: SourceOpener) -> io::Result<Self>
    where
        F: FnOnce() -> Box<dyn OutputSink> + Send + 'static,
    {
        let (commands, command_rx) = unbounded();
        let (completion_tx, completions) = unbounded();
        let control = Arc::new(SessionControl::default());

        let shared = Arc::clone(&control);
        let handle = thread::Builder::new()
            .name(String::from("decode-worker"))
            .spawn(move || {
                let sink = make_sink();
                WorkerLoop {
                    commands: command_rx,
                    completions: completion_tx,
                    control: shared,
                    opener,
                    sink,
                    active: None,
                    tail: None,
                }
                .run();
            })?;

        Ok(Self {
            commands,
            completions,
            control,
            handle: Some(handle),
        })
    }
}

impl AudioEngine for DecodeWorker {
    fn load(&mut self, path: &Path) -> Result<Session, DecodeError> {
        let generation = self.control.supersede();
        let (reply, response) = bounded(1);
        self.commands
            .send(WorkerCommand::Load {
                path: path.to_path_buf(),
                generation,
                reply,
            })
            .map_err(|_| DecodeError::WorkerGone)?;

        let info = response.recv().map_err(|_| DecodeError::WorkerGone)??;
        Ok(Session { generation, info })
    }

    fn go(&mut self) {
        self.control.running.store(true, Ordering::Release);
        let _ = self.commands.send(WorkerCommand::Wake);
    }

    fn hold(&mut self) {
        self.control.running.store(false, Ordering::Release);
    }

    fn cancel(&mut self) {
        self.control.supersede();
        let _ = self.commands.send(WorkerCommand::Wake);
    }

    fn poll_completion(&mut self) -> Option<Completion> {
        self.completions.try_recv().ok()
    }
}

impl Drop for DecodeWorker {
    fn drop(&mut self) {
        self.cancel();
        let _ = self.commands.send(WorkerCommand::Shutdown);
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            tracing::warn!("decode worker panicked");
        }
    }
}

struct ActiveSession {
    generation: u64,
    source: Box<dyn FrameSource>,
    held: bool,
}

struct WorkerLoop {
    commands: Receiver<WorkerCommand>,
    completions: Sender<Completion>,
    control: Arc<SessionControl>,
    opener: SourceOpener,
    sink: Box<dyn OutputSink>,
    active: Option<ActiveSession>,
    /// Generation of a session that ended naturally while its last frames
    /// are still queued in the sink.
    tail: Option<u64>,
}

impl WorkerLoop {
    fn run(mut self) {
        loop {
            self.check_boundary();

            let streaming = self.active.is_some() && self.control.is_running();
            let command = if streaming {
                match self.commands.try_recv() {
                    Ok(command) => Some(command),
                    Err(TryRecvError::Empty) => None,
                    Err(TryRecvError::Disconnected) => break,
                }
            } else {
                match self.commands.recv() {
                    Ok(command) => Some(command),
                    Err(_) => break,
                }
            };

            match command {
                Some(WorkerCommand::Load {
                    path,
                    generation,
                    reply,
                }) => self.load(&path, generation, &reply),
                Some(WorkerCommand::Wake) => self.drop_cancelled_tail(),
                Some(WorkerCommand::Shutdown) => break,
                None => self.produce_frame(),
            }
        }

        if let Some(active) = self.active.take() {
            self.sink.reset();
            self.finish(active.generation, false);
        }
        tracing::debug!("decode worker stopped");
    }

    /// Applies cancellation and pause requests to the live session.
    fn check_boundary(&mut self) {
        let Some(active) = self.active.as_mut() else {
            return;
        };

        if !self.control.is_current(active.generation) {
            let generation = active.generation;
            self.active = None;
            self.sink.reset();
            self.finish(generation, false);
            return;
        }

        let running = self.control.is_running();
        if !running && !active.held {
            self.sink.pause();
            active.held = true;
        } else if running && active.held {
            self.sink.resume();
            active.held = false;
        }
    }

    fn load(
        &mut self,
        path: &Path,
        generation: u64,
        reply: &Sender<Result<StreamInfo, DecodeError>>,
    ) {
        match self.active.take() {
            Some(previous) => {
                self.finish(previous.generation, false);
                self.sink.reset();
            }
            // The finished track's tail plays out ahead of the new one.
            None if self.tail.take().is_some() => {}
            None => self.sink.reset(),
        }

        let result = (self.opener)(path).map(|source| {
            let info = source.info().clone();
            self.sink.begin(&info);
            self.active = Some(ActiveSession {
                generation,
                source,
                held: true,
            });
            info
        });
        if let Err(err) = &result {
            tracing::debug!(generation, "load failed: {err}");
        }
        let _ = reply.send(result);
    }

    fn produce_frame(&mut self) {
        let Some(active) = self.active.as_mut() else {
            return;
        };

        match active.source.next_frame() {
            Ok(Some(frame)) => self.sink.write(&frame),
            Ok(None) => {
                let generation = active.generation;
                self.active = None;
                self.tail = Some(generation);
                self.finish(generation, true);
            }
            Err(err) => {
                let generation = active.generation;
                tracing::warn!(generation, "playback stopped mid-stream: {err}");
                self.active = None;
                self.sink.reset();
                self.finish(generation, false);
            }
        }
    }

    /// A stop after a natural end discards whatever is still queued.
    fn drop_cancelled_tail(&mut self) {
        if let Some(generation) = self.tail
            && self.active.is_none()
            && !self.control.is_current(generation)
        {
            self.tail = None;
            self.sink.reset();
        }
    }

    fn finish(&self, generation: u64, reached_natural_end: bool) {
        tracing::debug!(generation, reached_natural_end, "session finished");
        let _ = self.completions.send(Completion {
            generation,
            reached_natural_end,
        });
    }
}
