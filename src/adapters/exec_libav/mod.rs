//! LibAV execution adapter
//!
//! Encodes segments in-process. The source stays open across all segments of
//! one file; each segment seeks to its start and writes H.264 video (converted
//! to YUV420P) with AAC stereo audio, whatever the source codecs were.

mod audio;
mod video;

use std::path::{Path, PathBuf};

use ffmpeg_next as ffmpeg;
use ffmpeg::{codec, encoder, format, media, Dictionary, Rational};
use tracing::{debug, info, warn};

use crate::domain::model::*;
use crate::error::{SplitXError, SplitXResult};
use crate::ports::SegmentEncoder;
use crate::utils::time::{seconds_to_ts, ts_to_seconds};
use crate::utils::truncate_chars;

use audio::{AudioTranscode, AudioWindow};
use video::{VideoTranscode, VideoWindow};

/// Maximum error characters kept in a failed outcome
const ERROR_SNIPPET_CHARS: usize = 100;

/// Source handle kept open between segments of the same file
struct OpenSource {
    path: PathBuf,
    input: format::context::Input,
}

// SAFETY: the input context is owned exclusively by this value and is only
// touched from whichever thread currently owns the encoder.
unsafe impl Send for OpenSource {}

/// First timestamp of a stream, zero when the container leaves it unset
fn stream_origin(start_time: i64) -> i64 {
    if start_time == ffmpeg::ffi::AV_NOPTS_VALUE {
        0
    } else {
        start_time
    }
}

fn pair(time_base: Rational) -> (i32, i32) {
    (time_base.numerator(), time_base.denominator())
}

/// `[start, end)` of an interval in stream timestamps, shifted by the stream origin
fn interval_window(interval: &Interval, time_base: (i32, i32), origin: i64) -> (i64, i64) {
    (
        seconds_to_ts(interval.start_seconds, time_base) + origin,
        seconds_to_ts(interval.end_seconds, time_base) + origin,
    )
}

/// Container seek position in `AV_TIME_BASE` units
fn seek_target(start_seconds: f64, origin_seconds: f64) -> i64 {
    ((start_seconds + origin_seconds) * f64::from(ffmpeg::ffi::AV_TIME_BASE)) as i64
}

/// Segment encoder backed by the linked libav libraries
pub struct ExecLibavAdapter {
    preset: String,
    open: Option<OpenSource>,
}

impl ExecLibavAdapter {
    /// Create new LibAV execution adapter
    pub fn new(preset: impl Into<String>) -> Self {
        Self {
            preset: preset.into(),
            open: None,
        }
    }

    /// True while a source handle is held open
    pub fn has_open_source(&self) -> bool {
        self.open.is_some()
    }

    fn input_for(&mut self, source: &Path) -> SplitXResult<&mut format::context::Input> {
        let reopen = self.open.as_ref().map_or(true, |open| open.path != source);
        if reopen {
            debug!("Opening {} for segment encoding", source.display());
            let input = format::input(&source)?;
            self.open = Some(OpenSource {
                path: source.to_path_buf(),
                input,
            });
        }

        match self.open.as_mut() {
            Some(open) => Ok(&mut open.input),
            None => Err(SplitXError::InputFileNotFound {
                path: source.display().to_string(),
            }),
        }
    }

    fn encode_segment(&mut self, request: &EncodeRequest) -> SplitXResult<()> {
        let index = request.interval.index;
        let crf = request.quality.crf().to_string();
        let preset = self.preset.clone();
        let ictx = self.input_for(&request.source)?;

        let video_stream = ictx
            .streams()
            .best(media::Type::Video)
            .ok_or_else(|| SplitXError::EncodeError {
                index,
                message: "source has no video stream".to_string(),
            })?;
        let audio_stream = ictx.streams().best(media::Type::Audio);

        let mut octx = format::output(&request.output)?;
        let global_header = octx.format().flags().contains(format::Flags::GLOBAL_HEADER);

        let video_tb = pair(video_stream.time_base());
        let video_origin = stream_origin(video_stream.start_time());
        let (start_ts, end_ts) = interval_window(&request.interval, video_tb, video_origin);
        let mut video = VideoTranscode::new(
            &video_stream,
            VideoWindow { start_ts, end_ts },
            &mut octx,
            global_header,
            &crf,
            &preset,
        )?;
        let mut origin_seconds = ts_to_seconds(video_origin, video_tb);

        let mut audio = match audio_stream {
            Some(stream) => {
                let audio_tb = pair(stream.time_base());
                let audio_origin = stream_origin(stream.start_time());
                origin_seconds = origin_seconds.min(ts_to_seconds(audio_origin, audio_tb));
                let (start_ts, end_ts) = interval_window(&request.interval, audio_tb, audio_origin);
                let window = AudioWindow {
                    start_ts,
                    end_ts,
                    seconds: request.interval.duration_seconds(),
                };
                Some(AudioTranscode::new(&stream, window, &mut octx, global_header)?)
            }
            None => None,
        };

        let mut header_options = Dictionary::new();
        header_options.set("movflags", "+faststart");
        octx.write_header_with(header_options)?;

        // The muxer may replace the requested time bases while writing the header.
        if let Some(stream) = octx.stream(video.output_index()) {
            video.set_output_time_base(stream.time_base());
        }
        if let Some(audio) = audio.as_mut() {
            if let Some(stream) = octx.stream(audio.output_index()) {
                audio.set_output_time_base(stream.time_base());
            }
        }

        let seek_ts = seek_target(request.interval.start_seconds, origin_seconds);
        ictx.seek(seek_ts, ..seek_ts)?;

        // Audio is interleaved behind video, so reading continues until both
        // streams have passed the window end.
        for (stream, packet) in ictx.packets() {
            let stream_index = stream.index();
            if stream_index == video.input_index {
                if video.far_past_end(&packet) {
                    break;
                }
                video.push_packet(&packet, &mut octx)?;
            } else if let Some(audio) = audio.as_mut().filter(|a| a.input_index == stream_index) {
                audio.push_packet(&packet, &mut octx)?;
            }

            if video.done && audio.as_ref().map_or(true, |a| a.done) {
                break;
            }
        }

        video.finish(&mut octx)?;
        if let Some(audio) = audio.as_mut() {
            audio.finish(&mut octx)?;
        }
        octx.write_trailer()?;

        Ok(())
    }
}

impl SegmentEncoder for ExecLibavAdapter {
    fn name(&self) -> &'static str {
        "libav"
    }

    fn preflight(&mut self) -> SplitXResult<()> {
        ffmpeg::init().map_err(|e| SplitXError::FFmpegInitError {
            message: e.to_string(),
        })?;

        let h264 = encoder::find(codec::Id::H264).ok_or_else(|| SplitXError::DependencyMissing {
            tool: "libx264".to_string(),
            hint: "The linked FFmpeg libraries were built without an H.264 encoder.".to_string(),
        })?;
        let aac = encoder::find(codec::Id::AAC).ok_or_else(|| SplitXError::DependencyMissing {
            tool: "aac".to_string(),
            hint: "The linked FFmpeg libraries were built without an AAC encoder.".to_string(),
        })?;
        info!("Using libav encoders: {} + {}", h264.name(), aac.name());
        Ok(())
    }

    fn encode(&mut self, request: EncodeRequest) -> EncodeOutcome {
        let index = request.interval.index;
        match self.encode_segment(&request) {
            Ok(()) => EncodeOutcome::succeeded(index),
            Err(e) => {
                warn!(
                    "libav failed on segment {} of {}: {}",
                    index,
                    request.source.display(),
                    e
                );
                EncodeOutcome::failed(index, truncate_chars(&e.to_string(), ERROR_SNIPPET_CHARS))
            }
        }
    }

    fn finish_source(&mut self, source: &Path) {
        if self.open.as_ref().map_or(false, |open| open.path == source) {
            debug!("Closing {}", source.display());
            self.open = None;
        }
    }
}
