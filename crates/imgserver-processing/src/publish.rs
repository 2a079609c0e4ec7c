//! Atomic file publication
//!
//! Files are written to a temporary file in the destination directory and renamed into
//! place, so a reader that sees the destination path always sees complete content.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use tempfile::NamedTempFile;

use crate::error::{CodecError, CodecResult};

fn temp_file_for(dest: &Path) -> CodecResult<NamedTempFile> {
    let dir = dest
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    tempfile::Builder::new()
        .prefix(".publish-")
        .suffix(".part")
        .tempfile_in(dir)
        .map_err(|e| CodecError::io(dir, e))
}

fn persist(temp: NamedTempFile, dest: &Path) -> CodecResult<()> {
    temp.as_file()
        .sync_all()
        .map_err(|e| CodecError::io(temp.path(), e))?;
    temp.persist(dest)
        .map_err(|e| CodecError::io(dest, e.error))?;
    Ok(())
}

/// Atomically write `data` to `dest`.
pub fn write_atomic(dest: &Path, data: &[u8]) -> CodecResult<()> {
    let mut temp = temp_file_for(dest)?;
    temp.write_all(data)
        .map_err(|e| CodecError::io(temp.path(), e))?;
    persist(temp, dest)
}

/// Atomically copy `src` to `dest` byte for byte. Returns the number of bytes copied.
pub fn copy_atomic(src: &Path, dest: &Path) -> CodecResult<u64> {
    let mut source = File::open(src).map_err(|e| CodecError::io(src, e))?;
    let mut temp = temp_file_for(dest)?;
    let copied = io::copy(&mut source, &mut temp).map_err(|e| CodecError::io(src, e))?;
    persist(temp, dest)?;
    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_atomic_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out.bin");

        write_atomic(&dest, b"hello").unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"hello");

        write_atomic(&dest, b"replaced").unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"replaced");
    }

    #[test]
    fn test_no_temp_files_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        write_atomic(&dir.path().join("a.bin"), b"a").unwrap();
        copy_atomic(&dir.path().join("a.bin"), &dir.path().join("b.bin")).unwrap();

        let mut names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec!["a.bin", "b.bin"]);
    }

    #[test]
    fn test_copy_atomic_is_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src.bin");
        let data: Vec<u8> = (0..=255u8).cycle().take(10_000).collect();
        std::fs::write(&src, &data).unwrap();

        let dest = dir.path().join("dest.bin");
        assert_eq!(copy_atomic(&src, &dest).unwrap(), data.len() as u64);
        assert_eq!(std::fs::read(&dest).unwrap(), data);
    }

    #[test]
    fn test_copy_missing_source_fails_without_dest() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("dest.bin");
        let err = copy_atomic(&dir.path().join("missing.bin"), &dest).unwrap_err();
        assert!(matches!(err, CodecError::Io { .. }));
        assert!(!dest.exists());
    }
}
