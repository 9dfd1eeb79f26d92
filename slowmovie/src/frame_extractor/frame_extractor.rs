extern crate ffmpeg_next as ffmpeg;

use std::path::Path;
use std::sync::OnceLock;

use color_eyre::eyre::{self, Context};
use ffmpeg::codec::Context as CodecContext;
use ffmpeg::decoder::Video as DecoderVideo;
use ffmpeg::format::context::Input as FormatContext;
use ffmpeg::format::{input, Pixel};
use ffmpeg::frame::Video as FrameVideo;
use ffmpeg::media::Type;
use ffmpeg::software::scaling::context::Context as ScalingContext;
use ffmpeg::util::log as ffmpeglog;
use ffmpeg::{Packet as CodecPacket, Rational, Rescale};
use ffmpeg_sys_next::AV_NOPTS_VALUE;
use image::RgbImage;

use super::timecode::Timecode;

pub type Result<T> = eyre::Result<T>;

static FFMPEG_INITIALIZED: OnceLock<std::result::Result<(), ffmpeg::Error>> =
    OnceLock::new();

/// Decodes single frames out of a video file, addressed by frame index.
pub struct FrameExtractor {
    ictx: FormatContext,
    decoder: DecoderVideo,
    converter: ScalingContext,

    video_stream_index: usize,
    timebase: Rational,
    first_timestamp: i64,
    frame_rate: Rational,
    frame_count: u64,

    // output dimensions, sample aspect ratio already applied
    out_width: u32,
    out_height: u32,
}

impl FrameExtractor {
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        if let Err(e) = FFMPEG_INITIALIZED.get_or_init(|| {
            ffmpeg::init()?;
            ffmpeglog::set_level(ffmpeglog::Level::Warning);
            Ok(())
        }) {
            return Err(*e).wrap_err("Failed to initialize ffmpeg");
        }

        let mut ictx = input(&path).wrap_err("Failed to open the file")?;

        let video = ictx
            .streams()
            .best(Type::Video)
            .ok_or(eyre::eyre!("No video stream"))?;

        let video_stream_index = video.index();
        let timebase = video.time_base();
        let first_timestamp = match video.start_time() {
            AV_NOPTS_VALUE => 0,
            ts => ts,
        };

        let frame_rate = pick_frame_rate(&video)?;

        let duration = video.duration();
        eyre::ensure!(duration != AV_NOPTS_VALUE, "Does not have a duration");

        let frame_count = match video.frames() {
            n if n > 0 => n as u64,
            // not all containers store nb_frames, estimate it instead
            _ => duration.rescale(timebase, frame_rate.invert()) as u64,
        };
        eyre::ensure!(frame_count > 0, "The video does not contain any frames");

        let decoder = CodecContext::from_parameters(video.parameters())
            .wrap_err("No codec found")?
            .decoder()
            .video()
            .wrap_err("No codec found, of type video (?)")?;

        eyre::ensure!(decoder.format() != Pixel::None, "No pixel format");
        let (out_width, out_height) = apply_sample_aspect_ratio(&decoder);
        let converter = ScalingContext::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            Pixel::RGB24,
            out_width,
            out_height,
            ffmpeg::software::scaling::Flags::FAST_BILINEAR,
        )?;

        ictx.streams_mut()
            .filter(|stream| stream.index() != video_stream_index)
            .for_each(|mut stream| stream_set_discard_all(&mut stream));

        Ok(Self {
            ictx,
            decoder,
            converter,
            video_stream_index,
            timebase,
            first_timestamp,
            frame_rate,
            frame_count,
            out_width,
            out_height,
        })
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn frame_rate(&self) -> Rational {
        self.frame_rate
    }

    pub fn width(&self) -> u32 {
        self.out_width
    }

    pub fn height(&self) -> u32 {
        self.out_height
    }

    pub fn timecode(&self, index: u64) -> Timecode {
        Timecode::new(index, self.frame_rate)
    }

    /// Seek to the given frame and decode it. Indices past the last keyframe
    /// still work, the decoder just rolls forward from there. If the stream
    /// runs out early the last decodable frame is returned instead.
    pub fn frame_at(&mut self, index: u64) -> Result<RgbImage> {
        eyre::ensure!(
            index < self.frame_count,
            "Frame {} is out of range, the video only has {} frames",
            index,
            self.frame_count,
        );

        let target = self.timestamp_of(index);
        self.seek_to_keyframe(target)
            .wrap_err_with(|| format!("Failed to seek to frame {index}"))?;

        let mut last = None;
        while let Some(frame) = self.next_frame()? {
            let reached = frame.timestamp().map(|ts| ts >= target).unwrap_or(false);
            last = Some(frame);
            if reached {
                break;
            }
        }

        match last {
            Some(frame) => self.convert(&frame),
            None => eyre::bail!("No frame could be decoded near index {index}"),
        }
    }

    /// The timestamp of a frame index in the units of the stream's timebase.
    fn timestamp_of(&self, index: u64) -> i64 {
        let seconds_per_frame = self.frame_rate.invert();
        let index: i64 = index.try_into().expect("fit in an i64 or frame_at errors");
        self.first_timestamp + index.rescale(seconds_per_frame, self.timebase)
    }

    /// Jump to the latest keyframe at or before `target` and reset the
    /// decoder, so that decoding forward from here eventually reaches it.
    fn seek_to_keyframe(&mut self, target: i64) -> Result<()> {
        // FormatContext::seek always seeks on the default stream, this needs
        // the video stream specifically
        let ret = unsafe {
            ffmpeg_sys_next::avformat_seek_file(
                self.ictx.as_mut_ptr(),
                self.video_stream_index
                    .try_into()
                    .expect("will probably not be that big"),
                i64::MIN,
                target,
                target,
                0,
            )
        };
        if ret < 0 {
            return Err(ffmpeg::Error::from(ret)).wrap_err("avformat_seek_file failed");
        }

        self.decoder.flush();
        Ok(())
    }

    /// Pump the demuxer and decoder for one more frame. `Ok(None)` on EOF.
    fn next_frame(&mut self) -> Result<Option<FrameVideo>> {
        loop {
            let mut decoded = FrameVideo::empty();
            match self.decoder.receive_frame(&mut decoded) {
                Ok(()) => return Ok(Some(decoded)),
                Err(ffmpeg::Error::Other {
                    errno: libc::EAGAIN,
                }) => (),
                Err(ffmpeg::Error::Eof) => return Ok(None),
                Err(e) => {
                    return Err(e).wrap_err("Decoder error when receiving a frame")
                }
            }

            loop {
                let mut packet = CodecPacket::empty();
                match packet.read(&mut self.ictx) {
                    Ok(()) if packet.stream() == self.video_stream_index => {
                        match self.decoder.send_packet(&packet) {
                            Ok(()) => break,
                            Err(e) => {
                                log::warn!("Skipping a broken packet: {e}");
                                continue;
                            }
                        }
                    }
                    Ok(()) => continue,
                    Err(ffmpeg::Error::Eof) => {
                        self.decoder
                            .send_eof()
                            .wrap_err("Failed to send EOF to the decoder")?;
                        break;
                    }
                    Err(e) => {
                        eyre::bail!("Failed to read a packet from the stream: {e}");
                    }
                }
            }
        }
    }

    fn convert(&mut self, frame: &FrameVideo) -> Result<RgbImage> {
        let mut converted = FrameVideo::empty();
        self.converter
            .run(frame, &mut converted)
            .wrap_err("Failed to convert the decoded frame")?;
        Ok(create_rust_image(converted))
    }
}

fn pick_frame_rate(video: &ffmpeg::Stream<'_>) -> Result<Rational> {
    let avg = video.avg_frame_rate();
    if avg.numerator() > 0 && avg.denominator() > 0 {
        return Ok(avg);
    }
    // screen recordings and other VFR files sometimes lack an average
    let real = video.rate();
    eyre::ensure!(
        real.numerator() > 0 && real.denominator() > 0,
        "The video stream does not declare a frame rate"
    );
    Ok(real)
}

/// Anamorphic video stores non-square pixels, widen the output to compensate.
fn apply_sample_aspect_ratio(decoder: &DecoderVideo) -> (u32, u32) {
    let sar = decoder.aspect_ratio();
    let width = decoder.width();
    let height = decoder.height();
    if sar.numerator() <= 0 || sar.denominator() <= 0 || sar == Rational::new(1, 1) {
        return (width, height);
    }

    let scaled =
        (width as i64 * sar.numerator() as i64) / sar.denominator() as i64;
    (scaled.clamp(1, u32::MAX.into()) as u32, height)
}

fn create_rust_image(converted: FrameVideo) -> RgbImage {
    assert_eq!(Pixel::RGB24, converted.format());
    assert_eq!(1, converted.planes());

    let width = converted.width();
    let height = converted.height();
    let src_linesize = converted.stride(0);
    let row_len = 3 * width as usize;
    let data = converted.data(0);

    // ffmpeg pads its rows, the image crate wants them packed
    let packed = if src_linesize == row_len {
        data.to_vec()
    } else {
        assert!(src_linesize > row_len);
        let mut packed = Vec::with_capacity(row_len * height as usize);
        for row in data.chunks_exact(src_linesize).take(height as usize) {
            packed.extend_from_slice(&row[..row_len]);
        }
        packed
    };

    RgbImage::from_vec(width, height, packed).expect("the buffer is big enough")
}

fn stream_set_discard_all(stream: &mut ffmpeg::StreamMut<'_>) {
    unsafe {
        let ptr = stream.as_mut_ptr();
        if !ptr.is_null() {
            (*ptr).discard = ffmpeg_sys_next::AVDiscard::AVDISCARD_ALL;
        }
    }
}
