//! Video half of a libav segment: decode, convert to YUV420P, re-encode H.264.

use ffmpeg_next as ffmpeg;
use ffmpeg::format::Pixel;
use ffmpeg::software::scaling::{Context as Scaler, Flags as ScaleFlags};
use ffmpeg::{codec, encoder, format, frame, picture, Dictionary, Packet, Rational};

use crate::error::{SplitXError, SplitXResult};
use crate::utils::time::seconds_to_ts;

/// How far demuxed video may run ahead of audio in a typical interleave
const INTERLEAVE_SLACK_SECONDS: f64 = 2.0;

/// 4:2:0 chroma needs even frame dimensions
pub(crate) fn even_dimension(value: u32) -> u32 {
    value & !1
}

/// Timestamp window of the video stream, in its own time base
pub(crate) struct VideoWindow {
    pub start_ts: i64,
    pub end_ts: i64,
}

/// Video stream of one segment being transcoded to H.264
pub(crate) struct VideoTranscode {
    pub input_index: usize,
    output_index: usize,
    decoder: codec::decoder::Video,
    scaler: Option<Scaler>,
    scaler_checked: bool,
    encoder: codec::encoder::Video,
    width: u32,
    height: u32,
    window: VideoWindow,
    slack_ts: i64,
    input_time_base: Rational,
    output_time_base: Rational,
    /// Set once a frame at or past the window end has been decoded
    pub done: bool,
}

impl VideoTranscode {
    /// Add an H.264 stream to `octx` fed from the input stream `source`
    pub fn new(
        source: &format::stream::Stream,
        window: VideoWindow,
        octx: &mut format::context::Output,
        global_header: bool,
        crf: &str,
        preset: &str,
    ) -> SplitXResult<Self> {
        let input_index = source.index();
        let input_time_base = source.time_base();
        let decoder = codec::context::Context::from_parameters(source.parameters())?
            .decoder()
            .video()?;

        let h264 = encoder::find(codec::Id::H264).ok_or_else(|| SplitXError::DependencyMissing {
            tool: "libx264".to_string(),
            hint: "The linked FFmpeg libraries were built without an H.264 encoder.".to_string(),
        })?;

        let width = even_dimension(decoder.width());
        let height = even_dimension(decoder.height());
        if width == 0 || height == 0 {
            return Err(SplitXError::OutputError {
                message: format!(
                    "video stream has unusable dimensions {}x{}",
                    decoder.width(),
                    decoder.height()
                ),
            });
        }

        let (encoder, output_index) = {
            let mut ost = octx.add_stream(h264)?;
            let mut enc = codec::context::Context::new_with_codec(h264)
                .encoder()
                .video()?;
            enc.set_width(width);
            enc.set_height(height);
            enc.set_aspect_ratio(decoder.aspect_ratio());
            enc.set_format(Pixel::YUV420P);
            enc.set_frame_rate(decoder.frame_rate());
            enc.set_time_base(input_time_base);
            if global_header {
                enc.set_flags(codec::Flags::GLOBAL_HEADER);
            }

            let mut options = Dictionary::new();
            options.set("crf", crf);
            options.set("preset", preset);
            let opened = enc.open_with(options)?;
            ost.set_parameters(&opened);
            (opened, ost.index())
        };

        Ok(Self {
            input_index,
            output_index,
            decoder,
            scaler: None,
            scaler_checked: false,
            encoder,
            width,
            height,
            window,
            slack_ts: seconds_to_ts(
                INTERLEAVE_SLACK_SECONDS,
                (input_time_base.numerator(), input_time_base.denominator()),
            ),
            input_time_base,
            output_time_base: input_time_base,
            done: false,
        })
    }

    pub fn output_index(&self) -> usize {
        self.output_index
    }

    /// Record the time base the muxer settled on after writing the header
    pub fn set_output_time_base(&mut self, time_base: Rational) {
        self.output_time_base = time_base;
    }

    /// True for a video packet so far past the window that no audio still
    /// owed to this segment can follow it
    pub fn far_past_end(&self, packet: &Packet) -> bool {
        self.done
            && packet
                .dts()
                .map_or(false, |dts| dts >= self.window.end_ts + self.slack_ts)
    }

    pub fn push_packet(&mut self, packet: &Packet, octx: &mut format::context::Output) -> SplitXResult<()> {
        if self.done {
            return Ok(());
        }
        self.decoder.send_packet(packet)?;
        self.receive_frames(octx)
    }

    /// Drain the decoder if the window end was never reached, then flush the encoder
    pub fn finish(&mut self, octx: &mut format::context::Output) -> SplitXResult<()> {
        if !self.done {
            self.decoder.send_eof()?;
            self.receive_frames(octx)?;
        }
        self.encoder.send_eof()?;
        self.drain_encoder(octx)
    }

    fn receive_frames(&mut self, octx: &mut format::context::Output) -> SplitXResult<()> {
        let mut decoded = frame::Video::empty();
        while self.decoder.receive_frame(&mut decoded).is_ok() {
            let Some(ts) = decoded.timestamp() else {
                continue;
            };
            if ts < self.window.start_ts {
                continue;
            }
            if ts >= self.window.end_ts {
                self.done = true;
                continue;
            }
            self.encode_frame(&mut decoded, ts - self.window.start_ts, octx)?;
        }
        Ok(())
    }

    fn encode_frame(
        &mut self,
        decoded: &mut frame::Video,
        pts: i64,
        octx: &mut format::context::Output,
    ) -> SplitXResult<()> {
        if !self.scaler_checked {
            self.scaler_checked = true;
            let needs_conversion = decoded.format() != Pixel::YUV420P
                || decoded.width() != self.width
                || decoded.height() != self.height;
            if needs_conversion {
                self.scaler = Some(Scaler::get(
                    decoded.format(),
                    decoded.width(),
                    decoded.height(),
                    Pixel::YUV420P,
                    self.width,
                    self.height,
                    ScaleFlags::BILINEAR,
                )?);
            }
        }

        match self.scaler.as_mut() {
            Some(scaler) => {
                let mut converted = frame::Video::empty();
                scaler.run(decoded, &mut converted)?;
                converted.set_pts(Some(pts));
                converted.set_kind(picture::Type::None);
                self.encoder.send_frame(&converted)?;
            }
            None => {
                decoded.set_pts(Some(pts));
                decoded.set_kind(picture::Type::None);
                self.encoder.send_frame(decoded)?;
            }
        }
        self.drain_encoder(octx)
    }

    fn drain_encoder(&mut self, octx: &mut format::context::Output) -> SplitXResult<()> {
        let mut encoded = Packet::empty();
        while self.encoder.receive_packet(&mut encoded).is_ok() {
            encoded.set_stream(self.output_index);
            encoded.rescale_ts(self.input_time_base, self.output_time_base);
            encoded.write_interleaved(octx)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_even_dimension() {
        assert_eq!(even_dimension(1920), 1920);
        assert_eq!(even_dimension(639), 638);
        assert_eq!(even_dimension(1), 0);
    }
}
