//! The core of one playback update: pick a frame, render it for the panel,
//! push it, advance and persist the position. The binary wraps this in the
//! delay/sleep/signal loop.

use std::path::Path;

use color_eyre::eyre::{self, Context};
use image::GrayImage;
use rand::Rng;
use slowmovie_common::utils::imgutils;
use slowmovie_common::utils::overlay::{self, Anchor};

use crate::display::DisplayDevice;
use crate::frame_extractor::{FrameExtractor, Timecode};
use crate::progress::ProgressDir;
use crate::subtitles::Subtitles;

/// Playback knobs, lifted straight from the CLI flags.
#[derive(Debug, Clone)]
pub struct Options {
    pub increment: u64,
    pub contrast: f32,
    pub random_frames: bool,
    pub loop_video: bool,
    pub fullscreen: bool,
    pub show_timecode: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            increment: 4,
            contrast: 1.0,
            random_frames: false,
            loop_video: false,
            fullscreen: false,
            show_timecode: false,
        }
    }
}

/// What one update did to the playback position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// More of this video is left, continue from this frame next update.
    Advanced { next_frame: u64 },
    /// The position wrapped past the last frame, move on to the next video.
    VideoFinished,
}

/// Display the frame at `position` and advance. Advancing past the end
/// wraps to frame 0: with `loop_video` the same video continues from the
/// top, otherwise it is finished. The new position is persisted either way,
/// so a restart resumes where a fresh update would have continued.
#[allow(clippy::too_many_arguments)]
pub fn play_step(
    opts: &Options,
    display: &mut dyn DisplayDevice,
    extractor: &mut FrameExtractor,
    subtitles: Option<&Subtitles>,
    progress: &ProgressDir,
    video: &Path,
    position: u64,
    rng: &mut impl Rng,
) -> eyre::Result<StepOutcome> {
    let frame_count = extractor.frame_count();

    let frame_index = if opts.random_frames {
        rng.gen_range(0..frame_count)
    } else {
        position.min(frame_count - 1)
    };
    let timecode = extractor.timecode(frame_index);

    let frame = extractor
        .frame_at(frame_index)
        .wrap_err_with(|| format!("failed to extract frame {frame_index}"))?;
    let frame = render_frame(
        opts,
        display.width(),
        display.height(),
        frame,
        &timecode,
        subtitles,
    );
    display
        .display(&frame)
        .wrap_err("failed to write to the display")?;
    log::info!(
        "Displayed frame {}/{} ({}) of {} ({:.1}%)",
        frame_index,
        frame_count,
        timecode,
        video.display(),
        100.0 * frame_index as f64 / frame_count as f64,
    );

    let outcome = if opts.random_frames {
        StepOutcome::Advanced {
            next_frame: position,
        }
    } else {
        match position + opts.increment {
            past if past >= frame_count && !opts.loop_video => StepOutcome::VideoFinished,
            past if past >= frame_count => StepOutcome::Advanced { next_frame: 0 },
            next => StepOutcome::Advanced { next_frame: next },
        }
    };

    let persisted = match outcome {
        StepOutcome::Advanced { next_frame } => next_frame,
        StepOutcome::VideoFinished => 0,
    };
    progress.save(video, persisted)?;

    Ok(outcome)
}

/// Scale, dither and caption a decoded frame into what the panel gets.
fn render_frame(
    opts: &Options,
    width: u32,
    height: u32,
    frame: image::RgbImage,
    timecode: &Timecode,
    subtitles: Option<&Subtitles>,
) -> GrayImage {
    let fitted = if opts.fullscreen {
        imgutils::fill_crop(&frame, width, height)
    } else {
        imgutils::letterbox(&frame, width, height)
    };

    let gray = imgutils::grayscale(&fitted);
    let mut gray = imgutils::adjust_contrast(gray, opts.contrast);

    if let Some(subtitles) = subtitles {
        if let Some(text) = subtitles.cue_at(timecode.to_duration()) {
            overlay::draw_caption(&mut gray, text, Anchor::BottomCenter);
        }
    }
    if opts.show_timecode {
        overlay::draw_caption(&mut gray, &timecode.to_string(), Anchor::BottomRight);
    }

    imgutils::dither_1bit(&mut gray);
    gray
}
