mod common;

use color_eyre::eyre::Result;
use common::create_test_video;
use slowmovie::display::MockDisplay;
use slowmovie::frame_extractor::FrameExtractor;
use slowmovie::player::{self, Options, StepOutcome};
use slowmovie::progress::ProgressDir;

const TEST_VIDEO_FRAMES: u64 = 250;

#[test]
fn test_advancing_persists_the_position() -> Result<()> {
    let video = create_test_video();
    let tmp = tempfile::tempdir()?;
    let progress = ProgressDir::new(tmp.path())?;
    let mut extractor = FrameExtractor::new(&video)?;
    let mut mock = MockDisplay::new();
    let opts = Options::default();

    let outcome = player::play_step(
        &opts,
        &mut mock,
        &mut extractor,
        None,
        &progress,
        &video,
        0,
        &mut rand::thread_rng(),
    )?;

    assert_eq!(StepOutcome::Advanced { next_frame: 4 }, outcome);
    assert_eq!(4, progress.load(&video)?);
    assert_eq!(1, mock.frames_shown());
    Ok(())
}

#[test]
fn test_wrapping_finishes_the_video_and_resets_progress() -> Result<()> {
    let video = create_test_video();
    let tmp = tempfile::tempdir()?;
    let progress = ProgressDir::new(tmp.path())?;
    let mut extractor = FrameExtractor::new(&video)?;
    let mut mock = MockDisplay::new();
    let opts = Options {
        increment: 100,
        ..Options::default()
    };

    progress.save(&video, 200)?;
    let outcome = player::play_step(
        &opts,
        &mut mock,
        &mut extractor,
        None,
        &progress,
        &video,
        200,
        &mut rand::thread_rng(),
    )?;

    // 200 + 100 runs past the last of the 250 frames
    assert_eq!(StepOutcome::VideoFinished, outcome);
    assert_eq!(0, progress.load(&video)?);
    Ok(())
}

#[test]
fn test_looping_wraps_to_the_start_of_the_same_video() -> Result<()> {
    let video = create_test_video();
    let tmp = tempfile::tempdir()?;
    let progress = ProgressDir::new(tmp.path())?;
    let mut extractor = FrameExtractor::new(&video)?;
    let mut mock = MockDisplay::new();
    let opts = Options {
        increment: 100,
        loop_video: true,
        ..Options::default()
    };

    let outcome = player::play_step(
        &opts,
        &mut mock,
        &mut extractor,
        None,
        &progress,
        &video,
        200,
        &mut rand::thread_rng(),
    )?;

    assert_eq!(StepOutcome::Advanced { next_frame: 0 }, outcome);
    assert_eq!(0, progress.load(&video)?);
    Ok(())
}

#[test]
fn test_positions_past_the_end_still_display() -> Result<()> {
    let video = create_test_video();
    let tmp = tempfile::tempdir()?;
    let progress = ProgressDir::new(tmp.path())?;
    let mut extractor = FrameExtractor::new(&video)?;
    let mut mock = MockDisplay::new();
    let opts = Options::default();

    // a stale progress file can point past the end, the last frame is shown
    // and the position wraps
    let outcome = player::play_step(
        &opts,
        &mut mock,
        &mut extractor,
        None,
        &progress,
        &video,
        TEST_VIDEO_FRAMES + 10,
        &mut rand::thread_rng(),
    )?;

    assert_eq!(StepOutcome::VideoFinished, outcome);
    assert_eq!(1, mock.frames_shown());
    Ok(())
}
