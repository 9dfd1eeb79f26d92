use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::{self, Context};
use slowmovie::frame_extractor::{FrameExtractor, Timecode};
use slowmovie_common::bin_common::init::{init_eyre, init_logger};
use slowmovie_common::utils::imgutils;

#[derive(Parser)]
#[command()]
/// Extract frames from a video file, optionally processed the same way the
/// player would before handing them to the panel.
struct Cli {
    /// The first frame to extract
    #[arg(long, short = 'n', default_value_t = 0)]
    frame: u64,

    /// How many frames to extract in total
    #[arg(long, default_value_t = 1)]
    num: u64,

    /// Frames to skip between extractions
    #[arg(long, default_value_t = 1)]
    step: u64,

    /// Letterbox, grayscale and dither the frames instead of saving them raw
    #[arg(long)]
    preview: bool,

    /// Contrast adjustment when previewing
    #[arg(long, default_value_t = 1.0)]
    contrast: f32,

    /// Panel dimensions when previewing
    #[arg(long, default_value = "800")]
    width: u32,

    /// Panel dimensions when previewing
    #[arg(long, default_value = "480")]
    height: u32,

    /// Where to place the frames as images
    #[arg(long)]
    outdir: PathBuf,

    /// The video file to extract from
    videofile: PathBuf,
}

fn main() -> eyre::Result<()> {
    init_eyre()?;
    init_logger(log::LevelFilter::Info, None)?;
    let cli = Cli::parse();

    if !cli.outdir.is_dir() {
        std::fs::create_dir(&cli.outdir)?;
    }

    let mut extractor = FrameExtractor::new(&cli.videofile)
        .wrap_err_with(|| format!("failed to open: {}", cli.videofile.display()))?;

    let mut index = cli.frame;
    for _ in 0..cli.num {
        if index >= extractor.frame_count() {
            break;
        }

        let timecode = extractor.timecode(index);
        let frame = extractor.frame_at(index)?;
        let frame_filename = frame_filename(index, &timecode);
        println!("Writing {frame_filename:?}");

        if cli.preview {
            let boxed = imgutils::letterbox(&frame, cli.width, cli.height);
            let gray = imgutils::grayscale(&boxed);
            let mut gray = imgutils::adjust_contrast(gray, cli.contrast);
            imgutils::dither_1bit(&mut gray);
            gray.save(cli.outdir.join(frame_filename))?;
        } else {
            frame.save(cli.outdir.join(frame_filename))?;
        }

        index += cli.step.max(1);
    }

    Ok(())
}

/// `:` is not a legal filename character on FAT, which is what the SD cards
/// these frames usually land on are formatted with.
fn frame_filename(index: u64, timecode: &Timecode) -> String {
    format!("frame_{index}_{}.png", timecode.to_string().replace(':', "-"))
}

#[cfg(test)]
mod test {
    use super::*;
    use ffmpeg_next::Rational;

    #[test]
    fn filenames_avoid_colons() {
        let timecode = Timecode::new(25, Rational::new(25, 1));
        let name = frame_filename(25, &timecode);
        assert_eq!("frame_25_00-00-01.000.png", name);
        assert!(!name.contains(':'));
    }
}
