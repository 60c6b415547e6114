use super::decoder::StreamInfo;
use anyhow::{Context, Result};
use rodio::buffer::SamplesBuffer;
use rodio::{OutputStream, OutputStreamBuilder, Sink};
#[cfg(unix)]
use std::ffi::CString;
use std::thread;
use std::time::Duration;

/// Frames the device may hold before `write` starts blocking.
const QUEUED_FRAMES: usize = 4;
const BACKPRESSURE_POLL: Duration = Duration::from_millis(5);

/// Destination for decoded frames, owned by the worker thread.
pub trait OutputSink {
    fn begin(&mut self, info: &StreamInfo);
    /// Queues one frame of interleaved samples, blocking while the sink is full.
    fn write(&mut self, frame: &[f32]);
    fn pause(&mut self);
    fn resume(&mut self);
    /// Drops whatever is still queued.
    fn reset(&mut self);
}

pub struct RodioOutput {
    stream: OutputStream,
    sink: Sink,
    channels: rodio::ChannelCount,
    sample_rate: rodio::SampleRate,
}

impl RodioOutput {
    pub fn open_default() -> Result<Self> {
        let mut stream = with_silenced_stderr(|| {
            OutputStreamBuilder::from_default_device()
                .context("failed to open default system output stream")?
                .with_error_callback(|_| {})
                .open_stream_or_fallback()
                .context("failed to start default output stream")
        })?;
        stream.log_on_drop(false);
        let sink = Sink::connect_new(stream.mixer());

        Ok(Self {
            stream,
            sink,
            channels: channel_count(2).context("invalid default channel count")?,
            sample_rate: sample_rate(44_100).context("invalid default sample rate")?,
        })
    }
}

impl OutputSink for RodioOutput {
    fn begin(&mut self, info: &StreamInfo) {
        match (channel_count(info.channels), sample_rate(info.sample_rate)) {
            (Some(channels), Some(rate)) => {
                self.channels = channels;
                self.sample_rate = rate;
            }
            _ => tracing::warn!(
                channels = info.channels,
                rate = info.sample_rate,
                "stream layout rejected by output, keeping previous"
            ),
        }
        self.sink.play();
    }

    fn write(&mut self, frame: &[f32]) {
        while self.sink.len() >= QUEUED_FRAMES && !self.sink.is_paused() {
            thread::sleep(BACKPRESSURE_POLL);
        }
        self.sink.append(SamplesBuffer::new(
            self.channels,
            self.sample_rate,
            frame.to_vec(),
        ));
    }

    fn pause(&mut self) {
        self.sink.pause();
    }

    fn resume(&mut self) {
        self.sink.play();
    }

    fn reset(&mut self) {
        self.sink.stop();
        self.sink = Sink::connect_new(self.stream.mixer());
    }
}

fn channel_count(channels: u16) -> Option<rodio::ChannelCount> {
    rodio::ChannelCount::try_from(channels).ok()
}

fn sample_rate(rate: u32) -> Option<rodio::SampleRate> {
    rodio::SampleRate::try_from(rate).ok()
}

#[cfg(unix)]
fn with_silenced_stderr<T>(operation: impl FnOnce() -> T) -> T {
    let saved = unsafe { libc::dup(libc::STDERR_FILENO) };
    if saved < 0 {
        return operation();
    }

    let devnull = CString::new("/dev/null")
        .ok()
        .map(|path| unsafe { libc::open(path.as_ptr(), libc::O_WRONLY) })
        .unwrap_or(-1);

    if devnull >= 0 {
        unsafe {
            libc::dup2(devnull, libc::STDERR_FILENO);
            libc::close(devnull);
        }
    }

    let result = operation();

    unsafe {
        libc::dup2(saved, libc::STDERR_FILENO);
        libc::close(saved);
    }

    result
}

#[cfg(not(unix))]
fn with_silenced_stderr<T>(operation: impl FnOnce() -> T) -> T {
    operation()
}

/// Sink that discards audio. When paced, each write takes as long as the
/// frame would take to play.
#[derive(Debug, Default)]
pub struct NullOutput {
    paced: bool,
    channels: u16,
    sample_rate: u32,
    written: u64,
}

impl NullOutput {
    pub fn paced() -> Self {
        Self {
            paced: true,
            ..Self::default()
        }
    }

    pub fn unpaced() -> Self {
        Self::default()
    }

    /// Samples accepted since the last `begin`.
    pub fn written(&self) -> u64 {
        self.written
    }

    fn frame_duration(&self, samples: usize) -> Duration {
        if self.channels == 0 || self.sample_rate == 0 {
            return Duration::ZERO;
        }
        let frames = samples as f64 / f64::from(self.channels);
        Duration::from_secs_f64(frames / f64::from(self.sample_rate))
    }
}

impl OutputSink for NullOutput {
    fn begin(&mut self, info: &StreamInfo) {
        self.channels = info.channels;
        self.sample_rate = info.sample_rate;
        self.written = 0;
    }

    fn write(&mut self, frame: &[f32]) {
        self.written = self.written.saturating_add(frame.len() as u64);
        if self.paced {
            thread::sleep(self.frame_duration(frame.len()));
        }
    }

    fn pause(&mut self) {}

    fn resume(&mut self) {}

    fn reset(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::decoder::SampleEncoding;
    use std::time::Instant;

    fn info(rate: u32, channels: u16) -> StreamInfo {
        StreamInfo {
            sample_rate: rate,
            channels,
            encoding: SampleEncoding::Float(32),
            total_frames: None,
        }
    }

    #[test]
    fn null_output_counts_samples_per_stream() {
        let mut output = NullOutput::unpaced();
        output.begin(&info(48_000, 2));
        output.write(&[0.0; 64]);
        output.write(&[0.0; 32]);
        assert_eq!(output.written(), 96);

        output.begin(&info(48_000, 2));
        assert_eq!(output.written(), 0);
    }

    #[test]
    fn paced_null_output_takes_real_time() {
        let mut output = NullOutput::paced();
        output.begin(&info(1_000, 1));

        let started = Instant::now();
        output.write(&[0.0; 50]);
        assert!(started.elapsed() >= Duration::from_millis(45));
    }

    #[test]
    fn frame_duration_accounts_for_channels() {
        let mut output = NullOutput::paced();
        output.begin(&info(8_000, 2));
        assert_eq!(output.frame_duration(16_000), Duration::from_secs(1));
        assert_eq!(NullOutput::unpaced().frame_duration(10), Duration::ZERO);
    }
}
