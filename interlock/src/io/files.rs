//! File read/write primitive for the write interlock.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use anyhow::{Context, Result};

/// Read the current content of `path`, or `None` if it does not exist.
///
/// Non-UTF-8 bytes are replaced rather than rejected; the content is only
/// used for impact measurement.
pub fn read_existing(path: &Path) -> Result<Option<String>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err).with_context(|| format!("read {}", path.display())),
    }
}

/// Write `contents` to `path`, creating parent directories first.
pub fn write_with_parents(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    fs::write(path, contents).with_context(|| format!("write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_reads_as_none() {
        let temp = tempfile::tempdir().expect("tempdir");
        assert_eq!(read_existing(&temp.path().join("nope.txt")).expect("read"), None);
    }

    #[test]
    fn write_creates_parents_and_reads_back() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("a/b/c.txt");
        write_with_parents(&path, "hello\n").expect("write");
        assert_eq!(
            read_existing(&path).expect("read"),
            Some("hello\n".to_string())
        );
    }

    #[test]
    fn reading_a_directory_is_an_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        assert!(read_existing(temp.path()).is_err());
    }
}
