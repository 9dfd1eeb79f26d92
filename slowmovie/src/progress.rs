use std::path::{Path, PathBuf};

use color_eyre::eyre::{self, Context};
use slowmovie_common::utils::fsutils::{ensure_dir, read_optional_file};

/// Per-video playback positions as plain text files, one
/// `<video filename>.progress` per video, holding a decimal frame index.
/// Plain overwrites, no locking, the player is single-instance by design.
pub struct ProgressDir {
    dir: PathBuf,
}

impl ProgressDir {
    pub fn new(dir: impl Into<PathBuf>) -> eyre::Result<Self> {
        let dir = dir.into();
        ensure_dir(&dir).wrap_err_with(|| {
            format!(
                "failed to create the progress directory at: {}",
                dir.display()
            )
        })?;
        Ok(Self { dir })
    }

    fn file_for(&self, video: &Path) -> eyre::Result<PathBuf> {
        let name = video
            .file_name()
            .ok_or_else(|| eyre::eyre!("not a video file: {}", video.display()))?;
        let mut name = name.to_owned();
        name.push(".progress");
        Ok(self.dir.join(name))
    }

    /// The stored frame index, or 0 when there is no readable one. A
    /// scribbled over file is worth a warning but never stops playback.
    pub fn load(&self, video: &Path) -> eyre::Result<u64> {
        let path = self.file_for(video)?;
        let contents = read_optional_file(&path)
            .wrap_err_with(|| format!("failed to read: {}", path.display()))?;

        Ok(match contents {
            None => 0,
            Some(contents) => match contents.trim().parse() {
                Ok(frame) => frame,
                Err(_) => {
                    log::warn!(
                        "The progress file {} does not contain a frame index, starting over",
                        path.display()
                    );
                    0
                }
            },
        })
    }

    /// Like [`load`](Self::load) but clamped to `[0, frame_count]`, for when
    /// the video was swapped for a shorter cut between runs.
    pub fn load_clamped(&self, video: &Path, frame_count: u64) -> eyre::Result<u64> {
        Ok(self.load(video)?.min(frame_count))
    }

    pub fn save(&self, video: &Path, frame: u64) -> eyre::Result<()> {
        let path = self.file_for(video)?;
        std::fs::write(&path, frame.to_string())
            .wrap_err_with(|| format!("failed to write: {}", path.display()))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn missing_progress_defaults_to_zero() {
        let tmp = tempfile::tempdir().unwrap();
        let progress = ProgressDir::new(tmp.path().join("logs")).unwrap();
        assert_eq!(0, progress.load(Path::new("movie.mp4")).unwrap());
    }

    #[test]
    fn save_then_load() {
        let tmp = tempfile::tempdir().unwrap();
        let progress = ProgressDir::new(tmp.path()).unwrap();
        let video = Path::new("/somewhere/movie.mp4");

        progress.save(video, 1234).unwrap();
        assert_eq!(1234, progress.load(video).unwrap());
        assert!(tmp.path().join("movie.mp4.progress").is_file());
    }

    #[test]
    fn garbage_defaults_to_zero() {
        let tmp = tempfile::tempdir().unwrap();
        let progress = ProgressDir::new(tmp.path()).unwrap();
        std::fs::write(tmp.path().join("movie.mp4.progress"), "over 9000").unwrap();
        assert_eq!(0, progress.load(Path::new("movie.mp4")).unwrap());
    }

    #[test]
    fn clamped_to_the_frame_count() {
        let tmp = tempfile::tempdir().unwrap();
        let progress = ProgressDir::new(tmp.path()).unwrap();
        let video = Path::new("movie.mp4");

        progress.save(video, 5000).unwrap();
        assert_eq!(100, progress.load_clamped(video, 100).unwrap());
        assert_eq!(5000, progress.load_clamped(video, 100_000).unwrap());
    }

    #[test]
    fn progress_files_are_per_video() {
        let tmp = tempfile::tempdir().unwrap();
        let progress = ProgressDir::new(tmp.path()).unwrap();

        progress.save(Path::new("a.mp4"), 1).unwrap();
        progress.save(Path::new("b.mp4"), 2).unwrap();
        assert_eq!(1, progress.load(Path::new("a.mp4")).unwrap());
        assert_eq!(2, progress.load(Path::new("b.mp4")).unwrap());
    }
}
