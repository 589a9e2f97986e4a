//! Narration probing and decoding using FFmpeg

use crate::{Error, Result};
use ffmpeg_next as ffmpeg;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use storyreel_core::AudioSource;

static FFMPEG_INIT: OnceLock<std::result::Result<(), ffmpeg::Error>> = OnceLock::new();

/// Initialize FFmpeg (once per process)
pub(crate) fn init_ffmpeg() -> Result<()> {
    (*FFMPEG_INIT.get_or_init(ffmpeg::init)).map_err(Error::from)
}

/// An opened narration file.
///
/// The container stays open until [`AudioSource::close`] so the stream can be
/// decoded during export.
pub struct AudioReader {
    path: PathBuf,
    input: Option<ffmpeg::format::context::Input>,
    stream_index: usize,
    duration_secs: f64,
}

impl AudioReader {
    /// Opens an audio file and probes its length
    pub fn open(path: &Path) -> Result<Self> {
        init_ffmpeg()?;

        let input = ffmpeg::format::input(&path)?;

        let stream = input
            .streams()
            .best(ffmpeg::media::Type::Audio)
            .ok_or(Error::NoAudioStream)?;
        let stream_index = stream.index();

        let duration = stream.duration();
        let duration_secs = if duration > 0 {
            duration as f64 * f64::from(stream.time_base())
        } else {
            // Fallback to container duration
            input.duration() as f64 / ffmpeg::ffi::AV_TIME_BASE as f64
        };

        Ok(Self {
            path: path.to_path_buf(),
            input: Some(input),
            stream_index,
            duration_secs,
        })
    }

    /// Path the reader was opened from
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Decodes the whole stream to interleaved stereo `f32` at `sample_rate`
    pub fn decode_stereo(&mut self, sample_rate: u32) -> Result<Vec<f32>> {
        let stream_index = self.stream_index;
        let input = self
            .input
            .as_mut()
            .ok_or_else(|| Error::Export(format!("{} is closed", self.path.display())))?;

        let parameters = input
            .stream(stream_index)
            .ok_or(Error::NoAudioStream)?
            .parameters();
        let context = ffmpeg::codec::context::Context::from_parameters(parameters)?;
        let mut decoder = context.decoder().audio()?;

        let mut resampler =
            decoder.resampler(STEREO_F32, ffmpeg::ChannelLayout::STEREO, sample_rate)?;

        let mut samples = Vec::new();
        let mut drain = |decoder: &mut ffmpeg::decoder::Audio| -> Result<()> {
            let mut decoded = ffmpeg::frame::Audio::empty();
            while decoder.receive_frame(&mut decoded).is_ok() {
                let input_rate = match decoded.rate() {
                    0 => decoder.rate(),
                    rate => rate,
                };
                let capacity = output_capacity(decoded.samples(), input_rate, sample_rate);
                let mut resampled =
                    ffmpeg::frame::Audio::new(STEREO_F32, capacity, ffmpeg::ChannelLayout::STEREO);
                resampler.run(&decoded, &mut resampled)?;
                append_stereo(&resampled, &mut samples);
            }
            Ok(())
        };

        for (stream, packet) in input.packets() {
            if stream.index() == stream_index {
                decoder.send_packet(&packet)?;
                drain(&mut decoder)?;
            }
        }

        decoder.send_eof()?;
        drain(&mut decoder)?;

        // swr keeps the filter tail buffered until flushed
        loop {
            let mut tail =
                ffmpeg::frame::Audio::new(STEREO_F32, FLUSH_CAPACITY, ffmpeg::ChannelLayout::STEREO);
            resampler.flush(&mut tail)?;
            if tail.samples() == 0 {
                break;
            }
            append_stereo(&tail, &mut samples);
        }

        Ok(samples)
    }
}

const STEREO_F32: ffmpeg::format::Sample =
    ffmpeg::format::Sample::F32(ffmpeg::format::sample::Type::Packed);

/// Output frame size used while draining the resampler
const FLUSH_CAPACITY: usize = 4096;

/// Headroom over the rate-converted length for samples swr still holds
const RESAMPLE_HEADROOM: usize = 256;

/// Samples an output frame needs so one input frame converts without
/// leaving data behind in the resampler
fn output_capacity(input_samples: usize, input_rate: u32, output_rate: u32) -> usize {
    let input_rate = u64::from(input_rate.max(1));
    let converted = (input_samples as u64 * u64::from(output_rate)).div_ceil(input_rate);
    converted as usize + RESAMPLE_HEADROOM
}

/// Appends a packed stereo frame to an interleaved buffer
fn append_stereo(frame: &ffmpeg::frame::Audio, out: &mut Vec<f32>) {
    if frame.samples() == 0 {
        return;
    }
    for &(left, right) in frame.plane::<(f32, f32)>(0).iter().take(frame.samples()) {
        out.push(left);
        out.push(right);
    }
}

impl AudioSource for AudioReader {
    fn duration_secs(&self) -> f64 {
        self.duration_secs
    }

    fn read_stereo(&mut self, sample_rate: u32) -> storyreel_core::Result<Vec<f32>> {
        self.decode_stereo(sample_rate).map_err(|e| {
            storyreel_core::Error::Decode(format!("{}: {e}", self.path.display()))
        })
    }

    fn close(&mut self) -> storyreel_core::Result<()> {
        match self.input.take() {
            Some(input) => {
                drop(input);
                Ok(())
            }
            None => Err(storyreel_core::Error::Decode(format!(
                "{} was already closed",
                self.path.display()
            ))),
        }
    }
}
