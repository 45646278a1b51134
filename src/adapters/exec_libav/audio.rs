//! Audio half of a libav segment: decode, resample to stereo float planar,
//! re-encode to AAC.

use ffmpeg_next as ffmpeg;
use ffmpeg::software::resampling::Context as Resampler;
use ffmpeg::{codec, encoder, format, frame, ChannelLayout, Packet, Rational};

use crate::error::{SplitXError, SplitXResult};

/// Output sample rate of every segment's audio track
pub const AUDIO_SAMPLE_RATE: u32 = 48_000;

const AUDIO_BIT_RATE: usize = 128_000;

const AUDIO_FORMAT: format::Sample = format::Sample::F32(format::sample::Type::Planar);

/// Frame size used when the encoder does not report one
const DEFAULT_FRAME_SIZE: usize = 1024;

/// Where a decoded frame lands relative to the start of the segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Placement {
    /// Ends before the segment starts
    Skip,
    /// Straddles the start; drop this many leading samples
    Trim(usize),
    /// Starts after the segment start; emit this much silence first
    Pad(usize),
}

/// Place the first overlapping frame of a segment
///
/// `offset_seconds` is the frame start relative to the segment start.
pub(crate) fn place_first_frame(offset_seconds: f64, frame_seconds: f64, rate: u32) -> Placement {
    if offset_seconds + frame_seconds <= 0.0 {
        Placement::Skip
    } else if offset_seconds < 0.0 {
        Placement::Trim((-offset_seconds * f64::from(rate)).round() as usize)
    } else {
        Placement::Pad((offset_seconds * f64::from(rate)).round() as usize)
    }
}

/// Number of output samples owed to a segment of `seconds`
pub(crate) fn sample_budget(seconds: f64, rate: u32) -> usize {
    (seconds.max(0.0) * f64::from(rate)).round() as usize
}

/// Stereo sample queue feeding fixed-size encoder frames
#[derive(Debug, Default)]
pub(crate) struct SampleFifo {
    left: Vec<f32>,
    right: Vec<f32>,
}

impl SampleFifo {
    pub fn len(&self) -> usize {
        self.left.len()
    }

    pub fn push(&mut self, left: &[f32], right: &[f32]) {
        let n = left.len().min(right.len());
        self.left.extend_from_slice(&left[..n]);
        self.right.extend_from_slice(&right[..n]);
    }

    pub fn push_silence(&mut self, samples: usize) {
        self.left.resize(self.left.len() + samples, 0.0);
        self.right.resize(self.right.len() + samples, 0.0);
    }

    /// Remove up to `samples` from the front
    pub fn take(&mut self, samples: usize) -> (Vec<f32>, Vec<f32>) {
        let n = samples.min(self.len());
        (
            self.left.drain(..n).collect(),
            self.right.drain(..n).collect(),
        )
    }
}

/// Timestamp window of the audio stream, in its own time base
pub(crate) struct AudioWindow {
    pub start_ts: i64,
    pub end_ts: i64,
    pub seconds: f64,
}

/// Audio stream of one segment being transcoded to AAC
pub(crate) struct AudioTranscode {
    pub input_index: usize,
    output_index: usize,
    decoder: codec::decoder::Audio,
    resampler: Option<Resampler>,
    encoder: codec::encoder::Audio,
    frame_size: usize,
    fifo: SampleFifo,
    window: AudioWindow,
    input_time_base: Rational,
    encoder_time_base: Rational,
    output_time_base: Rational,
    remaining: usize,
    started: bool,
    next_pts: i64,
    /// Set once the window end has been demuxed or the sample budget is spent
    pub done: bool,
}

impl AudioTranscode {
    /// Add an AAC stream to `octx` fed from the input stream `source`
    pub fn new(
        source: &format::stream::Stream,
        window: AudioWindow,
        octx: &mut format::context::Output,
        global_header: bool,
    ) -> SplitXResult<Self> {
        let input_index = source.index();
        let input_time_base = source.time_base();
        let decoder = codec::context::Context::from_parameters(source.parameters())?
            .decoder()
            .audio()?;

        let aac = encoder::find(codec::Id::AAC).ok_or_else(|| SplitXError::DependencyMissing {
            tool: "aac".to_string(),
            hint: "The linked FFmpeg libraries were built without an AAC encoder.".to_string(),
        })?;

        let encoder_time_base = Rational::new(1, AUDIO_SAMPLE_RATE as i32);
        let (encoder, output_index) = {
            let mut ost = octx.add_stream(aac)?;
            let mut enc = codec::context::Context::new_with_codec(aac)
                .encoder()
                .audio()?;
            enc.set_rate(AUDIO_SAMPLE_RATE as i32);
            enc.set_channel_layout(ChannelLayout::STEREO);
            enc.set_format(AUDIO_FORMAT);
            enc.set_bit_rate(AUDIO_BIT_RATE);
            enc.set_time_base(encoder_time_base);
            if global_header {
                enc.set_flags(codec::Flags::GLOBAL_HEADER);
            }
            let opened = enc.open()?;
            ost.set_parameters(&opened);
            (opened, ost.index())
        };

        let frame_size = match encoder.frame_size() as usize {
            0 => DEFAULT_FRAME_SIZE,
            n => n,
        };
        let remaining = sample_budget(window.seconds, AUDIO_SAMPLE_RATE);

        Ok(Self {
            input_index,
            output_index,
            decoder,
            resampler: None,
            encoder,
            frame_size,
            fifo: SampleFifo::default(),
            window,
            input_time_base,
            encoder_time_base,
            output_time_base: encoder_time_base,
            remaining,
            started: false,
            next_pts: 0,
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

    pub fn push_packet(&mut self, packet: &Packet, octx: &mut format::context::Output) -> SplitXResult<()> {
        if self.done {
            return Ok(());
        }
        if packet.pts().map_or(false, |pts| pts >= self.window.end_ts) {
            self.done = true;
            return Ok(());
        }

        self.decoder.send_packet(packet)?;
        self.receive_frames(octx)
    }

    /// Drain the decoder and resampler, then flush the encoder
    pub fn finish(&mut self, octx: &mut format::context::Output) -> SplitXResult<()> {
        self.decoder.send_eof()?;
        self.receive_frames(octx)?;

        if let Some(resampler) = self.resampler.as_mut() {
            while self.remaining > 0 {
                let mut tail = frame::Audio::new(AUDIO_FORMAT, self.frame_size, ChannelLayout::STEREO);
                resampler.flush(&mut tail)?;
                if tail.samples() == 0 {
                    break;
                }
                let take = tail.samples().min(self.remaining);
                self.fifo.push(&tail.plane::<f32>(0)[..take], &tail.plane::<f32>(1)[..take]);
                self.remaining -= take;
            }
        }

        self.drain_fifo(octx, true)?;
        self.encoder.send_eof()?;
        self.drain_encoder(octx)
    }

    fn receive_frames(&mut self, octx: &mut format::context::Output) -> SplitXResult<()> {
        let mut decoded = frame::Audio::empty();
        while self.decoder.receive_frame(&mut decoded).is_ok() {
            self.accept_frame(&mut decoded)?;
            self.drain_fifo(octx, false)?;
        }
        Ok(())
    }

    fn accept_frame(&mut self, decoded: &mut frame::Audio) -> SplitXResult<()> {
        if self.remaining == 0 {
            self.done = true;
            return Ok(());
        }
        if decoded.samples() == 0 {
            return Ok(());
        }

        let mut skip = 0;
        if !self.started {
            let offset_seconds = decoded
                .pts()
                .map(|pts| (pts - self.window.start_ts) as f64 * f64::from(self.input_time_base))
                .unwrap_or(0.0);
            let frame_seconds = decoded.samples() as f64 / f64::from(decoded.rate().max(1));
            match place_first_frame(offset_seconds, frame_seconds, AUDIO_SAMPLE_RATE) {
                Placement::Skip => return Ok(()),
                Placement::Trim(n) => skip = n,
                Placement::Pad(n) => {
                    let n = n.min(self.remaining);
                    self.fifo.push_silence(n);
                    self.remaining -= n;
                }
            }
            self.started = true;
        }

        let converted = self.resample(decoded)?;
        let available = converted.samples().saturating_sub(skip);
        let take = available.min(self.remaining);
        if take > 0 {
            let range = skip..skip + take;
            self.fifo.push(
                &converted.plane::<f32>(0)[range.clone()],
                &converted.plane::<f32>(1)[range],
            );
            self.remaining -= take;
        }
        Ok(())
    }

    fn resample(&mut self, decoded: &mut frame::Audio) -> SplitXResult<frame::Audio> {
        // Sources that leave the layout unset only report a channel count.
        if decoded.channel_layout().is_empty() {
            decoded.set_channel_layout(ChannelLayout::default(i32::from(decoded.channels())));
        }

        let mut resampler = match self.resampler.take() {
            Some(resampler) => resampler,
            None => Resampler::get(
                decoded.format(),
                decoded.channel_layout(),
                decoded.rate(),
                AUDIO_FORMAT,
                ChannelLayout::STEREO,
                AUDIO_SAMPLE_RATE,
            )?,
        };

        // Room for the rate change plus whatever the resampler still buffers.
        let capacity = decoded.samples() * AUDIO_SAMPLE_RATE as usize / decoded.rate().max(1) as usize
            + self.frame_size;
        let mut converted = frame::Audio::new(AUDIO_FORMAT, capacity, ChannelLayout::STEREO);
        resampler.run(decoded, &mut converted)?;
        self.resampler = Some(resampler);
        Ok(converted)
    }

    fn drain_fifo(&mut self, octx: &mut format::context::Output, flush: bool) -> SplitXResult<()> {
        while self.fifo.len() >= self.frame_size || (flush && self.fifo.len() > 0) {
            let (left, right) = self.fifo.take(self.frame_size);
            let mut chunk = frame::Audio::new(AUDIO_FORMAT, left.len(), ChannelLayout::STEREO);
            chunk.set_rate(AUDIO_SAMPLE_RATE);
            chunk.set_pts(Some(self.next_pts));
            chunk.plane_mut::<f32>(0).copy_from_slice(&left);
            chunk.plane_mut::<f32>(1).copy_from_slice(&right);
            self.next_pts += left.len() as i64;

            self.encoder.send_frame(&chunk)?;
            self.drain_encoder(octx)?;
        }
        Ok(())
    }

    fn drain_encoder(&mut self, octx: &mut format::context::Output) -> SplitXResult<()> {
        let mut encoded = Packet::empty();
        while self.encoder.receive_packet(&mut encoded).is_ok() {
            encoded.set_stream(self.output_index);
            encoded.rescale_ts(self.encoder_time_base, self.output_time_base);
            encoded.write_interleaved(octx)?;
        }
        Ok(())
    }
}
