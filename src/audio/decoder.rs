use crate::error::DecodeError;
use std::ffi::OsStr;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use symphonia::core::audio::{SampleBuffer, SignalSpec};
use symphonia::core::codecs::{CODEC_TYPE_NULL, Decoder, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::{MediaSourceStream, MediaSourceStreamOptions};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::sample::SampleFormat;
use symphonia::default::{get_codecs, get_probe};

/// Sample encoding of the source file, before conversion to `f32`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleEncoding {
    Signed(u32),
    Unsigned(u32),
    Float(u32),
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamInfo {
    pub sample_rate: u32,
    pub channels: u16,
    pub encoding: SampleEncoding,
    pub total_frames: Option<u64>,
}

impl StreamInfo {
    pub fn duration(&self) -> Option<Duration> {
        let frames = self.total_frames?;
        if self.sample_rate == 0 {
            return None;
        }
        Some(Duration::from_secs_f64(
            frames as f64 / f64::from(self.sample_rate),
        ))
    }
}

/// A pull-based stream of decoded audio.
///
/// Each call to `next_frame` yields one block of interleaved `f32` samples,
/// or `None` once the stream is exhausted.
pub trait FrameSource: Send {
    fn info(&self) -> &StreamInfo;
    fn next_frame(&mut self) -> Result<Option<Vec<f32>>, DecodeError>;
}

pub struct SymphoniaSource {
    format: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    info: StreamInfo,
    sample_buf: Option<SampleBuffer<f32>>,
}

impl SymphoniaSource {
    pub fn open(path: &Path) -> Result<Self, DecodeError> {
        let file = File::open(path).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => DecodeError::NotFound(path.to_path_buf()),
            _ => DecodeError::Io {
                path: path.to_path_buf(),
                source,
            },
        })?;
        let stream = MediaSourceStream::new(Box::new(file), MediaSourceStreamOptions::default());

        let mut hint = Hint::new();
        if let Some(extension) = path.extension().and_then(OsStr::to_str) {
            hint.with_extension(extension);
        }

        let probed = get_probe()
            .format(
                &hint,
                stream,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|err| open_error(path, err))?;
        let format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|track| track.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| DecodeError::NoTrack(path.to_path_buf()))?;
        let params = &track.codec_params;

        let decoder = get_codecs()
            .make(params, &DecoderOptions::default())
            .map_err(|err| open_error(path, err))?;

        let info = StreamInfo {
            sample_rate: params.sample_rate.unwrap_or(44_100),
            channels: params
                .channels
                .and_then(|channels| u16::try_from(channels.count()).ok())
                .unwrap_or(2),
            encoding: encoding_of(params.sample_format, params.bits_per_sample),
            total_frames: params.n_frames,
        };
        let track_id = track.id;

        tracing::debug!(
            path = %path.display(),
            rate = info.sample_rate,
            channels = info.channels,
            "opened audio stream"
        );

        Ok(Self {
            format,
            decoder,
            track_id,
            info,
            sample_buf: None,
        })
    }
}

impl FrameSource for SymphoniaSource {
    fn info(&self) -> &StreamInfo {
        &self.info
    }

    fn next_frame(&mut self) -> Result<Option<Vec<f32>>, DecodeError> {
        loop {
            let packet = match self.format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(err)) if err.kind() == io::ErrorKind::UnexpectedEof => {
                    return Ok(None);
                }
                Err(err) => return Err(DecodeError::Stream(err.to_string())),
            };

            if packet.track_id() != self.track_id {
                continue;
            }

            let decoded = match self.decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(SymphoniaError::DecodeError(reason)) => {
                    tracing::debug!("skipping undecodable packet: {reason}");
                    continue;
                }
                Err(err) => return Err(DecodeError::Stream(err.to_string())),
            };
            if decoded.frames() == 0 {
                continue;
            }

            let spec = *decoded.spec();
            let capacity = decoded.capacity();
            let buf = reusable_buffer(&mut self.sample_buf, capacity, spec);
            buf.copy_interleaved_ref(decoded);
            return Ok(Some(buf.samples().to_vec()));
        }
    }
}

fn reusable_buffer(
    slot: &mut Option<SampleBuffer<f32>>,
    capacity: usize,
    spec: SignalSpec,
) -> &mut SampleBuffer<f32> {
    let samples = capacity * spec.channels.count();
    if slot.as_ref().is_some_and(|buf| buf.capacity() < samples) {
        *slot = None;
    }
    slot.get_or_insert_with(|| SampleBuffer::new(capacity as u64, spec))
}

/// Opens `path` with the symphonia decoder, boxed for the worker.
pub fn open_symphonia(path: &Path) -> Result<Box<dyn FrameSource>, DecodeError> {
    Ok(Box::new(SymphoniaSource::open(path)?))
}

fn open_error(path: &Path, err: SymphoniaError) -> DecodeError {
    let path: PathBuf = path.to_path_buf();
    match err {
        SymphoniaError::IoError(source) => DecodeError::Io { path, source },
        other => DecodeError::Unsupported {
            path,
            reason: other.to_string(),
        },
    }
}

fn encoding_of(format: Option<SampleFormat>, bits: Option<u32>) -> SampleEncoding {
    match format {
        Some(SampleFormat::U8) => SampleEncoding::Unsigned(8),
        Some(SampleFormat::U16) => SampleEncoding::Unsigned(16),
        Some(SampleFormat::U24) => SampleEncoding::Unsigned(24),
        Some(SampleFormat::U32) => SampleEncoding::Unsigned(32),
        Some(SampleFormat::S8) => SampleEncoding::Signed(8),
        Some(SampleFormat::S16) => SampleEncoding::Signed(16),
        Some(SampleFormat::S24) => SampleEncoding::Signed(24),
        Some(SampleFormat::S32) => SampleEncoding::Signed(32),
        Some(SampleFormat::F32) => SampleEncoding::Float(32),
        Some(SampleFormat::F64) => SampleEncoding::Float(64),
        None => bits.map_or(SampleEncoding::Unknown, SampleEncoding::Signed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn write_test_wav(path: &Path, duration_ms: u32) {
        let sample_rate: u32 = 44_100;
        let channels: u16 = 1;
        let bits_per_sample: u16 = 16;
        let bytes_per_sample = u32::from(bits_per_sample / 8);
        let total_samples = (u64::from(sample_rate) * u64::from(duration_ms) / 1_000) as u32;
        let data_size = total_samples * u32::from(channels) * bytes_per_sample;
        let byte_rate = sample_rate * u32::from(channels) * bytes_per_sample;
        let block_align = channels * (bits_per_sample / 8);

        let mut bytes = Vec::with_capacity((44_u32 + data_size) as usize);
        bytes.extend_from_slice(b"RIFF");
        bytes.extend_from_slice(&(36_u32 + data_size).to_le_bytes());
        bytes.extend_from_slice(b"WAVE");
        bytes.extend_from_slice(b"fmt ");
        bytes.extend_from_slice(&16_u32.to_le_bytes());
        bytes.extend_from_slice(&1_u16.to_le_bytes());
        bytes.extend_from_slice(&channels.to_le_bytes());
        bytes.extend_from_slice(&sample_rate.to_le_bytes());
        bytes.extend_from_slice(&byte_rate.to_le_bytes());
        bytes.extend_from_slice(&block_align.to_le_bytes());
        bytes.extend_from_slice(&bits_per_sample.to_le_bytes());
        bytes.extend_from_slice(b"data");
        bytes.extend_from_slice(&data_size.to_le_bytes());
        bytes.resize((44_u32 + data_size) as usize, 0_u8);

        fs::write(path, bytes).expect("wav fixture should be written");
    }

    #[test]
    fn wav_fixture_reports_stream_info() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("tone.wav");
        write_test_wav(&path, 100);

        let source = SymphoniaSource::open(&path).expect("open wav");
        let info = source.info();
        assert_eq!(info.sample_rate, 44_100);
        assert_eq!(info.channels, 1);
        assert_eq!(info.encoding, SampleEncoding::Signed(16));
        assert_eq!(info.total_frames, Some(4_410));
        assert_eq!(info.duration().map(|d| d.as_millis()), Some(100));
    }

    #[test]
    fn wav_fixture_decodes_to_exhaustion() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("tone.wav");
        write_test_wav(&path, 100);

        let mut source = SymphoniaSource::open(&path).expect("open wav");
        let mut samples = 0_usize;
        while let Some(frame) = source.next_frame().expect("decode") {
            assert!(!frame.is_empty());
            samples += frame.len();
        }
        assert_eq!(samples, 4_410);
        assert!(source.next_frame().expect("exhausted").is_none());
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = SymphoniaSource::open(Path::new("no-such-track.mp3"))
            .err()
            .expect("missing file should fail");
        assert!(matches!(err, DecodeError::NotFound(_)), "got {err}");
    }

    #[test]
    fn garbage_bytes_are_unsupported() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("noise.mp3");
        fs::write(&path, b"definitely not audio").expect("write");

        let err = SymphoniaSource::open(&path)
            .err()
            .expect("garbage should fail");
        assert!(
            matches!(
                err,
                DecodeError::Unsupported { .. } | DecodeError::Io { .. }
            ),
            "got {err}"
        );
    }
}
