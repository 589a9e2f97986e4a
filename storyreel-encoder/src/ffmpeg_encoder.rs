//! FFmpeg-based MP4 export
//!
//! Renders a timeline in two passes:
//!   1. Narration of every unit is decoded, padded to the unit durations and
//!      encoded to an AAC side file next to the output.
//!   2. Each unit's frame is converted to YUV420P and repeated for its frame
//!      span through the H.264 encoder. AAC packets from the side file are
//!      remuxed alongside, each one written once the video clock reaches it.
//!
//! A timeline without any narration produces a video-only file and no side
//! file.

use crate::audio_reader::init_ffmpeg;
use crate::exporter::{frame_spans, mix_timeline_audio, ExportJob, Renderer};
use crate::progress_tracker::ProgressTracker;
use crate::{Error, Result};
use ffmpeg_next as ffmpeg;
use ffmpeg::{codec, encoder, format, media, software, ChannelLayout, Rational};
use image::RgbaImage;
use std::path::Path;
use storyreel_core::{ExportProfile, FrameSize, Timeline};
use tracing::{debug, info, warn};

/// One progress line per second of output at 30 fps
const DEFAULT_REPORT_INTERVAL: u64 = 30;

/// Renders timelines to H.264/AAC MP4 files with FFmpeg
#[derive(Debug, Clone)]
pub struct FfmpegExporter {
    report_interval: u64,
}

impl Default for FfmpegExporter {
    fn default() -> Self {
        Self {
            report_interval: DEFAULT_REPORT_INTERVAL,
        }
    }
}

impl FfmpegExporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Logs progress every `frames` encoded frames
    pub fn with_report_interval(mut self, frames: u64) -> Self {
        self.report_interval = frames.max(1);
        self
    }
}

impl Renderer for FfmpegExporter {
    fn render(&self, timeline: &mut Timeline, job: &ExportJob) -> Result<()> {
        init_ffmpeg()?;

        let audio_path = if timeline.has_audio() {
            let samples = mix_timeline_audio(timeline, job.profile.audio_sample_rate);
            info!(
                "Encoding narration ({:.2}s) to {}",
                samples.len() as f64 / 2.0 / f64::from(job.profile.audio_sample_rate),
                job.temp_audio_path.display()
            );
            if let Err(e) = encode_audio_file(&samples, &job.temp_audio_path, &job.profile) {
                remove_temp_audio(&job.temp_audio_path);
                return Err(e);
            }
            Some(job.temp_audio_path.as_path())
        } else {
            info!("No narration in timeline, exporting video only");
            None
        };

        let result = encode_video(timeline, job, audio_path, self.report_interval);

        if let Some(path) = audio_path {
            remove_temp_audio(path);
        }
        result
    }
}

fn remove_temp_audio(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => debug!("Removed {}", path.display()),
        Err(e) => warn!("Failed to remove {}: {e}", path.display()),
    }
}

fn global_header(output: &format::context::Output) -> bool {
    output
        .format()
        .flags()
        .contains(format::flag::Flags::GLOBAL_HEADER)
}

fn find_encoder(name: &str) -> Result<codec::Codec> {
    encoder::find_by_name(name).ok_or_else(|| Error::EncoderNotFound(name.to_string()))
}

fn stream_time_base(output: &format::context::Output, index: usize) -> Result<Rational> {
    output
        .stream(index)
        .map(|stream| stream.time_base())
        .ok_or_else(|| Error::Export(format!("output stream {index} missing")))
}

/// Encodes interleaved stereo samples to an AAC file
fn encode_audio_file(samples: &[f32], path: &Path, profile: &ExportProfile) -> Result<()> {
    let mut output = format::output(&path)?;
    let global_header = global_header(&output);

    let codec = find_encoder(&profile.audio_codec)?;
    let rate = profile.audio_sample_rate as i32;

    let mut audio = codec::context::Context::new_with_codec(codec)
        .encoder()
        .audio()?;
    audio.set_rate(rate);
    audio.set_channel_layout(ChannelLayout::STEREO);
    audio.set_format(format::Sample::F32(format::sample::Type::Planar));
    audio.set_time_base((1, rate));
    if global_header {
        audio.set_flags(codec::flag::Flags::GLOBAL_HEADER);
    }

    let mut encoder = audio.open_as(codec)?;
    let index = {
        let mut stream = output.add_stream(codec)?;
        stream.set_parameters(&encoder);
        stream.index()
    };

    output.write_header()?;
    let encoder_tb = encoder.time_base();
    let stream_tb = stream_time_base(&output, index)?;

    // AAC takes fixed-size frames; the tail is padded with silence
    let frame_size = (encoder.frame_size() as usize).max(1);
    let mut pts = 0i64;
    for chunk in samples.chunks(frame_size * 2) {
        let mut frame = ffmpeg::frame::Audio::new(
            format::Sample::F32(format::sample::Type::Planar),
            frame_size,
            ChannelLayout::STEREO,
        );
        frame.set_rate(profile.audio_sample_rate);

        let mut left = vec![0.0f32; frame_size];
        let mut right = vec![0.0f32; frame_size];
        for (i, pair) in chunk.chunks_exact(2).enumerate() {
            left[i] = pair[0];
            right[i] = pair[1];
        }
        frame.plane_mut(0).copy_from_slice(&left);
        frame.plane_mut(1).copy_from_slice(&right);
        frame.set_pts(Some(pts));
        pts += frame_size as i64;

        encoder.send_frame(&frame)?;
        write_packets(&mut encoder, &mut output, index, encoder_tb, stream_tb)?;
    }

    encoder.send_eof()?;
    write_packets(&mut encoder, &mut output, index, encoder_tb, stream_tb)?;
    output.write_trailer()?;

    debug!("Wrote {} audio frames to {}", pts, path.display());
    Ok(())
}

/// Drains every ready packet from `encoder` into `output`
fn write_packets(
    encoder: &mut encoder::Encoder,
    output: &mut format::context::Output,
    index: usize,
    encoder_tb: Rational,
    stream_tb: Rational,
) -> Result<()> {
    let mut packet = ffmpeg::Packet::empty();
    while encoder.receive_packet(&mut packet).is_ok() {
        packet.set_stream(index);
        packet.rescale_ts(encoder_tb, stream_tb);
        packet.write_interleaved(output)?;
    }
    Ok(())
}

/// Encodes the timeline frames and muxes the narration side file, if any
fn encode_video(
    timeline: &Timeline,
    job: &ExportJob,
    audio_path: Option<&Path>,
    report_interval: u64,
) -> Result<()> {
    let profile = &job.profile;
    let size = profile.frame_size;
    let fps = profile.fps.max(1) as i32;

    let mut output = format::output(&job.output_path)?;
    let global_header = global_header(&output);

    let codec = find_encoder(&profile.video_codec)?;
    let mut video = codec::context::Context::new_with_codec(codec)
        .encoder()
        .video()?;
    video.set_width(size.width);
    video.set_height(size.height);
    video.set_format(format::Pixel::YUV420P);
    video.set_time_base(Rational(1, fps));
    video.set_frame_rate(Some(Rational(fps, 1)));
    if global_header {
        video.set_flags(codec::flag::Flags::GLOBAL_HEADER);
    }

    let mut opts = ffmpeg::Dictionary::new();
    opts.set("preset", &profile.preset);
    opts.set("threads", &profile.threads.to_string());

    let mut encoder = video.open_as_with(codec, opts).map_err(|e| {
        Error::Export(format!(
            "FFmpeg encoder open failed for {} ({}x{} @ {fps} fps): {e}",
            profile.video_codec, size.width, size.height
        ))
    })?;

    let video_index = {
        let mut stream = output.add_stream(codec)?;
        stream.set_parameters(&encoder);
        stream.index()
    };

    // Narration is copied as-is from the side file
    let mut narration = audio_path
        .map(|path| NarrationRemux::open(path, &mut output))
        .transpose()?;

    output.write_header()?;
    let encoder_tb = encoder.time_base();
    let video_tb = stream_time_base(&output, video_index)?;
    if let Some(narration) = narration.as_mut() {
        narration.bind(&output)?;
    }

    let spans = frame_spans(timeline, profile.fps.max(1));
    let total_frames = spans.last().map_or(0, |span| span.end);
    let progress = ProgressTracker::new(total_frames, "Encoding frames");

    let mut rgba = ffmpeg::frame::Video::new(format::Pixel::RGBA, size.width, size.height);
    let mut scaler = software::scaling::Context::get(
        format::Pixel::RGBA,
        size.width,
        size.height,
        format::Pixel::YUV420P,
        size.width,
        size.height,
        software::scaling::Flags::BILINEAR,
    )?;

    for (unit, span) in timeline.units().iter().zip(spans) {
        let scene_number = unit.scene_number();
        debug!(
            "Encoding scene {scene_number} as frames {}..{}",
            span.start, span.end
        );

        copy_rgba(unit.visual().frame(), size, &mut rgba)?;
        let mut yuv = ffmpeg::frame::Video::empty();
        scaler.run(&rgba, &mut yuv)?;

        for index in span {
            if let Some(narration) = narration.as_mut() {
                narration.write_until(&mut output, Some(index as f64 / f64::from(fps)))?;
            }
            yuv.set_pts(Some(index as i64));
            encoder.send_frame(&yuv)?;
            write_packets(&mut encoder, &mut output, video_index, encoder_tb, video_tb)?;
            progress.increment_and_report(report_interval);
        }
    }

    encoder.send_eof()?;
    write_packets(&mut encoder, &mut output, video_index, encoder_tb, video_tb)?;

    if let Some(narration) = narration.as_mut() {
        narration.write_until(&mut output, None)?;
    }

    output.write_trailer()?;
    info!(
        "Encoded {total_frames} frames to {}",
        job.output_path.display()
    );
    Ok(())
}

/// Copies AAC packets from the narration side file into the output, in step
/// with the video frames
struct NarrationRemux {
    input: format::context::Input,
    source_index: usize,
    source_tb: Rational,
    output_index: usize,
    output_tb: Rational,
    pending: Option<ffmpeg::Packet>,
    exhausted: bool,
}

impl NarrationRemux {
    /// Opens the side file and adds a matching stream to `output`
    fn open(path: &Path, output: &mut format::context::Output) -> Result<Self> {
        let input = format::input(&path)?;
        let (source_index, source_tb, output_index) = {
            let source = input
                .streams()
                .best(media::Type::Audio)
                .ok_or(Error::NoAudioStream)?;
            let mut stream = output.add_stream(encoder::find(codec::Id::None))?;
            stream.set_parameters(source.parameters());
            // Let the muxer pick a tag valid for MP4
            unsafe {
                (*stream.parameters().as_mut_ptr()).codec_tag = 0;
            }
            (source.index(), source.time_base(), stream.index())
        };

        Ok(Self {
            input,
            source_index,
            source_tb,
            output_index,
            output_tb: source_tb,
            pending: None,
            exhausted: false,
        })
    }

    /// Picks up the output stream time base chosen by `write_header`
    fn bind(&mut self, output: &format::context::Output) -> Result<()> {
        self.output_tb = stream_time_base(output, self.output_index)?;
        Ok(())
    }

    /// Writes every packet stamped at or before `until` seconds, or all
    /// remaining packets when `until` is `None`
    fn write_until(
        &mut self,
        output: &mut format::context::Output,
        until: Option<f64>,
    ) -> Result<()> {
        loop {
            if self.pending.is_none() {
                self.pending = self.next_packet()?;
            }
            let Some(packet) = self.pending.as_ref() else {
                return Ok(());
            };
            if let Some(until) = until {
                let ts = packet.dts().or(packet.pts()).unwrap_or(0);
                if !is_due(ts, self.source_tb, until) {
                    return Ok(());
                }
            }

            if let Some(mut packet) = self.pending.take() {
                packet.rescale_ts(self.source_tb, self.output_tb);
                packet.set_position(-1);
                packet.set_stream(self.output_index);
                packet.write_interleaved(output)?;
            }
        }
    }

    fn next_packet(&mut self) -> Result<Option<ffmpeg::Packet>> {
        while !self.exhausted {
            let mut packet = ffmpeg::Packet::empty();
            match packet.read(&mut self.input) {
                Ok(()) if packet.stream() == self.source_index => return Ok(Some(packet)),
                Ok(()) => {}
                Err(ffmpeg::Error::Eof) => self.exhausted = true,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(None)
    }
}

/// Whether a packet stamped `ts` in `time_base` plays at or before `until` seconds
fn is_due(ts: i64, time_base: Rational, until: f64) -> bool {
    ts as f64 * f64::from(time_base) <= until
}

/// Copies a composed frame into an FFmpeg RGBA frame, respecting its stride
fn copy_rgba(image: &RgbaImage, size: FrameSize, frame: &mut ffmpeg::frame::Video) -> Result<()> {
    if image.dimensions() != (size.width, size.height) {
        return Err(Error::Export(format!(
            "frame is {}x{}, expected {}x{}",
            image.width(),
            image.height(),
            size.width,
            size.height
        )));
    }

    let stride = frame.stride(0);
    let row_bytes = size.width as usize * 4;
    let src = image.as_raw();
    let dst = frame.data_mut(0);
    for y in 0..size.height as usize {
        let src_off = y * row_bytes;
        let dst_off = y * stride;
        dst[dst_off..dst_off + row_bytes].copy_from_slice(&src[src_off..src_off + row_bytes]);
    }
    Ok(())
}
