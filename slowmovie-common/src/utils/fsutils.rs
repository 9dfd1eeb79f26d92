use std::{
    fs, io,
    path::{Path, PathBuf},
};

/// Collects all files in the given directory, does not walk it recursively.
pub fn all_files<R>(folder: impl AsRef<Path>) -> io::Result<R>
where
    R: FromIterator<PathBuf>,
{
    fs::read_dir(folder)?
        .map(|entry| entry.map(|entry| entry.path()))
        .collect()
}

/// Try to read the file, return None if it doesn't exist
pub fn read_optional_file(path: impl AsRef<Path>) -> io::Result<Option<String>> {
    match fs::read_to_string(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
        Ok(s) => Ok(Some(s)),
    }
}

/// Make sure the directory exists, creating it and its parents if needed. The
/// path must not refer to something that is not a directory.
pub fn ensure_dir(dir: impl AsRef<Path>) -> io::Result<()> {
    let dir = dir.as_ref();
    match fs::symlink_metadata(dir) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "dir is not a dir",
        )),
        Err(e) if e.kind() == io::ErrorKind::NotFound => fs::create_dir_all(dir),
        Err(e) => Err(e),
    }
}

/// Whether the file is hidden, i.e., its name starts with a dot. Weird mac
/// metadata files look like this and should never be treated as videos.
pub fn is_hidden(path: impl AsRef<Path>) -> bool {
    path.as_ref()
        .file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn hidden_files() {
        assert!(is_hidden("/videos/.DS_Store"));
        assert!(is_hidden(".hidden.mp4"));
        assert!(!is_hidden("/videos/movie.mp4"));
        assert!(!is_hidden("movie.with.dots.mkv"));
    }

    #[test]
    fn ensure_dir_creates_and_accepts() -> io::Result<()> {
        let tmp = tempfile::tempdir()?;
        let dir = tmp.path().join("a/b");
        ensure_dir(&dir)?;
        assert!(dir.is_dir());
        ensure_dir(&dir)?;

        let file = tmp.path().join("file");
        fs::write(&file, "hello")?;
        assert!(ensure_dir(&file).is_err());
        Ok(())
    }

    #[test]
    fn optional_file() -> io::Result<()> {
        let tmp = tempfile::tempdir()?;
        let path = tmp.path().join("maybe");
        assert_eq!(None, read_optional_file(&path)?);
        fs::write(&path, "yes")?;
        assert_eq!(Some("yes".to_string()), read_optional_file(&path)?);
        Ok(())
    }
}
