use std::path::{Path, PathBuf};

use color_eyre::eyre::{self, Context};
use rand::seq::SliceRandom;
use slowmovie_common::utils::fsutils::{all_files, ensure_dir, is_hidden, read_optional_file};

pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mkv", "avi", "mov"];

/// The file remembering which video is being played, its contents is the
/// absolute path of that video.
pub const NOW_PLAYING: &str = "nowPlaying";

pub fn is_video(path: impl AsRef<Path>) -> bool {
    let path = path.as_ref();
    !is_hidden(path)
        && path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                VIDEO_EXTENSIONS
                    .iter()
                    .any(|wanted| ext.eq_ignore_ascii_case(wanted))
            })
            .unwrap_or(false)
}

/// All playable files of one video directory in a stable order.
pub struct Playlist {
    videos: Vec<PathBuf>,
}

impl Playlist {
    /// Scan the directory for videos, creating it first if it is missing.
    pub fn scan(dir: impl AsRef<Path>) -> eyre::Result<Self> {
        let dir = dir.as_ref();
        ensure_dir(dir).wrap_err_with(|| {
            format!("failed to create the video directory at: {}", dir.display())
        })?;

        let mut videos: Vec<PathBuf> = all_files(dir)
            .wrap_err_with(|| format!("failed to list videos in: {}", dir.display()))?;
        videos.retain(|path| is_video(path));
        videos.sort();

        Ok(Self { videos })
    }

    pub fn is_empty(&self) -> bool {
        self.videos.is_empty()
    }

    pub fn len(&self) -> usize {
        self.videos.len()
    }

    pub fn videos(&self) -> &[PathBuf] {
        &self.videos
    }

    pub fn first(&self) -> Option<&Path> {
        self.videos.first().map(PathBuf::as_path)
    }

    /// The video after `current` in directory order, wrapping to the first.
    /// Falls back to the first video when `current` is not in the list
    /// anymore, e.g. because it was deleted while playing.
    pub fn next_after(&self, current: impl AsRef<Path>) -> Option<&Path> {
        let current = current.as_ref();
        match self.videos.iter().position(|v| v == current) {
            Some(i) => self
                .videos
                .get((i + 1) % self.videos.len())
                .map(PathBuf::as_path),
            None => self.first(),
        }
    }

    pub fn random(&self, rng: &mut impl rand::Rng) -> Option<&Path> {
        self.videos.choose(rng).map(PathBuf::as_path)
    }
}

/// What the nowPlaying file says, if it exists and points at a playable file.
pub fn read_now_playing(state_dir: impl AsRef<Path>) -> eyre::Result<Option<PathBuf>> {
    let path = state_dir.as_ref().join(NOW_PLAYING);
    let contents = read_optional_file(&path)
        .wrap_err_with(|| format!("failed to read: {}", path.display()))?;

    Ok(contents.and_then(|contents| {
        let video = PathBuf::from(contents.trim());
        if is_video(&video) && video.is_file() {
            Some(video)
        } else {
            log::warn!("Ignoring a stale {} file", NOW_PLAYING);
            None
        }
    }))
}

pub fn write_now_playing(
    state_dir: impl AsRef<Path>,
    video: impl AsRef<Path>,
) -> eyre::Result<()> {
    let path = state_dir.as_ref().join(NOW_PLAYING);
    let video = video
        .as_ref()
        .canonicalize()
        .wrap_err("failed to resolve the video path")?;
    std::fs::write(&path, video.as_os_str().as_encoded_bytes())
        .wrap_err_with(|| format!("failed to write: {}", path.display()))
}
