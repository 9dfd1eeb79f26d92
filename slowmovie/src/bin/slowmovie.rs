use std::ffi::OsString;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::Parser;
use color_eyre::eyre::{self, Context};
use rand::rngs::ThreadRng;
use slowmovie::display::{self, DisplayDevice};
use slowmovie::frame_extractor::FrameExtractor;
use slowmovie::player::{self, StepOutcome};
use slowmovie::playlist::{self, Playlist};
use slowmovie::progress::ProgressDir;
use slowmovie::subtitles::Subtitles;
use slowmovie_common::bin_common::{
    init::{init_eyre, init_logger},
    termination,
};

#[derive(Parser, Debug)]
#[command()]
/// Plays a movie on an e-paper display, a handful of frames per hour.
struct Cli {
    /// Play this video instead of resuming whatever was playing
    #[arg(long, short = 'f')]
    file: Option<PathBuf>,

    /// The directory with the videos
    #[arg(long, short = 'D', default_value = "Videos")]
    directory: PathBuf,

    /// Pick the next video at random instead of in directory order
    #[arg(long, short = 'R')]
    random_file: bool,

    /// Show a random frame of the current video on every update
    #[arg(long, short = 'r')]
    random_frames: bool,

    /// Time between screen updates
    #[arg(long, short = 'd', default_value = "2m")]
    delay: humantime::Duration,

    /// Number of frames to advance per update
    #[arg(long, short = 'i', default_value_t = 4)]
    increment: u64,

    /// Start at this frame, overriding the saved progress
    #[arg(long, short = 's')]
    start: Option<u64>,

    /// Contrast adjustment before dithering, 1.0 leaves the image alone
    #[arg(long, short = 'c', default_value_t = 1.0)]
    contrast: f32,

    /// Stay on the current video instead of moving on when it ends
    #[arg(long = "loop", short = 'l')]
    loop_video: bool,

    /// The display driver to use, see --list-displays
    #[arg(long, short = 'e', default_value = display::EPD7IN5_V2_NAME)]
    epd: String,

    /// How much to log (off, error, warn, info, debug, trace)
    #[arg(long, short = 'o', default_value_t = log::LevelFilter::Info)]
    loglevel: log::LevelFilter,

    /// Burn subtitles from a .srt sidecar file into the frames
    #[arg(long, short = 'S')]
    subtitles: bool,

    /// Draw the timecode of the current frame in the corner
    #[arg(long, short = 't')]
    timecode: bool,

    /// Crop to fill the whole screen instead of letterboxing
    #[arg(long, short = 'F')]
    fullscreen: bool,

    /// Wipe the screen to white before starting
    #[arg(long, short = 'C')]
    clear: bool,

    /// List the supported display drivers and exit
    #[arg(long)]
    list_displays: bool,

    /// A file to additionally write the logs to
    #[arg(long)]
    logfile: Option<PathBuf>,

    /// Where the nowPlaying file and the progress files are kept
    #[arg(long, default_value = ".")]
    state_dir: PathBuf,
}

fn cli_arguments() -> eyre::Result<Cli> {
    const ARGS_FILE: &str = ".slowmovierc";
    let mut args: Vec<OsString> = std::env::args_os().collect();

    if args.len() == 1 {
        if let Some(flags) =
            slowmovie_common::utils::fsutils::read_optional_file(ARGS_FILE)
                .wrap_err_with(|| format!("Could not read config file at: {ARGS_FILE}"))?
        {
            args.extend(
                flags
                    .split_whitespace()
                    .map(|s| std::ffi::OsStr::new(s).to_owned()),
            );
        }
    }

    Ok(Cli::parse_from(args))
}

fn main() -> eyre::Result<()> {
    init_eyre()?;
    let cli = cli_arguments()?;

    if cli.list_displays {
        for name in display::list_supported_displays() {
            println!("{name}");
        }
        return Ok(());
    }

    init_logger(cli.loglevel, cli.logfile.as_deref())?;
    log::debug!("CLI arguments: {cli:#?}");

    let term_cookie = termination::Cookie::new()
        .wrap_err("failed to install the signal handlers")?;

    let mut display = display::load_display_driver(&cli.epd)
        .wrap_err("failed to load the display driver")?;
    log::info!(
        "Using display '{}' at {}x{}",
        display.name(),
        display.width(),
        display.height()
    );

    display
        .prepare()
        .wrap_err("failed to initialize the display, is a screen attached?")?;
    if cli.clear {
        log::info!("Clearing the screen");
        display.clear().wrap_err("failed to clear the display")?;
    }

    let result = play(&cli, display.as_mut(), &term_cookie);

    // put the panel away even if playback blew up, floating e-paper drivers
    // can damage the screen
    log::info!("Shutting the display down");
    if let Err(e) = display.close() {
        log::error!("Failed to close the display: {e}");
    }

    result
}

enum Outcome {
    VideoFinished,
    Terminated,
}

fn player_options(cli: &Cli) -> player::Options {
    player::Options {
        increment: cli.increment,
        contrast: cli.contrast,
        random_frames: cli.random_frames,
        loop_video: cli.loop_video,
        fullscreen: cli.fullscreen,
        show_timecode: cli.timecode,
    }
}

fn play(
    cli: &Cli,
    display: &mut dyn DisplayDevice,
    term_cookie: &termination::Cookie,
) -> eyre::Result<()> {
    let progress = ProgressDir::new(cli.state_dir.join("progress"))?;
    let opts = player_options(cli);
    let mut rng = rand::thread_rng();
    let mut start_override = cli.start;

    let mut current = choose_first_video(cli, &mut rng)?;

    loop {
        log::info!("Now playing: {}", current.display());
        playlist::write_now_playing(&cli.state_dir, &current)?;

        let mut extractor = FrameExtractor::new(&current)
            .wrap_err_with(|| format!("failed to open: {}", current.display()))?;
        log::info!(
            "{} frames at {}/{} fps",
            extractor.frame_count(),
            extractor.frame_rate().numerator(),
            extractor.frame_rate().denominator(),
        );

        let subtitles = load_subtitles(cli, &current);

        let start = match start_override.take() {
            Some(frame) => frame.min(extractor.frame_count()),
            None => progress.load_clamped(&current, extractor.frame_count())?,
        };

        match play_one_video(
            cli,
            &opts,
            display,
            &mut extractor,
            subtitles.as_ref(),
            &progress,
            &current,
            start,
            term_cookie,
            &mut rng,
        )? {
            Outcome::Terminated => {
                log::warn!("Termination signal received");
                return Ok(());
            }
            Outcome::VideoFinished => {
                current = choose_next_video(cli, &current, &mut rng)?;
            }
        }
    }
}

/// Advance through one video, one update per delay, until it wraps around.
#[allow(clippy::too_many_arguments)]
fn play_one_video(
    cli: &Cli,
    opts: &player::Options,
    display: &mut dyn DisplayDevice,
    extractor: &mut FrameExtractor,
    subtitles: Option<&Subtitles>,
    progress: &ProgressDir,
    video: &std::path::Path,
    start: u64,
    term_cookie: &termination::Cookie,
    rng: &mut ThreadRng,
) -> eyre::Result<Outcome> {
    let mut position = start;

    loop {
        if term_cookie.is_terminating() {
            return Ok(Outcome::Terminated);
        }

        let before = Instant::now();
        let outcome = player::play_step(
            opts, display, extractor, subtitles, progress, video, position, rng,
        )?;

        display.sleep().wrap_err("failed to put the display to sleep")?;
        wait_out_delay(cli.delay.into(), before.elapsed(), term_cookie);
        if term_cookie.is_terminating() {
            return Ok(Outcome::Terminated);
        }
        display
            .prepare()
            .wrap_err("failed to wake the display up")?;

        match outcome {
            StepOutcome::Advanced { next_frame } => position = next_frame,
            StepOutcome::VideoFinished => return Ok(Outcome::VideoFinished),
        }
    }
}

fn load_subtitles(cli: &Cli, video: &std::path::Path) -> Option<Subtitles> {
    if !cli.subtitles {
        return None;
    }

    let sidecar = Subtitles::sidecar_of(video);
    if !sidecar.is_file() {
        log::warn!("No subtitles found at: {}", sidecar.display());
        return None;
    }

    match Subtitles::load(&sidecar) {
        Ok(subtitles) => {
            log::info!("Loaded {} subtitle cues", subtitles.len());
            Some(subtitles)
        }
        Err(e) => {
            log::error!("Failed to load subtitles, continuing without: {e:?}");
            None
        }
    }
}

fn choose_first_video(cli: &Cli, rng: &mut ThreadRng) -> eyre::Result<PathBuf> {
    let playlist = Playlist::scan(&cli.directory)?;

    if let Some(file) = &cli.file {
        eyre::ensure!(
            playlist::is_video(file),
            "{} should be a file with one of the following extensions: {}",
            file.display(),
            playlist::VIDEO_EXTENSIONS.join(", "),
        );
        // bare filenames refer to the video directory
        let path = if file.parent() == Some(std::path::Path::new("")) {
            cli.directory.join(file)
        } else {
            file.clone()
        };
        eyre::ensure!(path.is_file(), "{} not found", path.display());
        return Ok(path);
    }

    if let Some(resumed) = playlist::read_now_playing(&cli.state_dir)? {
        return Ok(resumed);
    }

    let chosen = if cli.random_file {
        playlist.random(rng)
    } else {
        playlist.first()
    };
    chosen.map(PathBuf::from).ok_or_else(|| {
        eyre::eyre!("no videos found in: {}", cli.directory.display())
    })
}

fn choose_next_video(
    cli: &Cli,
    current: &std::path::Path,
    rng: &mut ThreadRng,
) -> eyre::Result<PathBuf> {
    // rescan so videos dropped into the directory while playing are found
    let playlist = Playlist::scan(&cli.directory)?;

    let next = if cli.random_file {
        playlist.random(rng).map(PathBuf::from)
    } else {
        playlist.next_after(current).map(PathBuf::from)
    };

    next.ok_or_else(|| eyre::eyre!("no videos found in: {}", cli.directory.display()))
}

/// Sleep away whatever is left of the update delay, extraction time already
/// counts towards it. Wakes up shortly after a termination signal.
fn wait_out_delay(
    delay: Duration,
    already_spent: Duration,
    term_cookie: &termination::Cookie,
) {
    let mut left = delay.saturating_sub(already_spent);
    while !left.is_zero() && !term_cookie.is_terminating() {
        let nap = left.min(Duration::from_millis(500));
        std::thread::sleep(nap);
        left -= nap;
    }
}
