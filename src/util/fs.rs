use std::fs;
use std::io::{self, Write};
use std::path::Path;

/// Permission bits for files the engine creates.
pub const DEFAULT_FILE_MODE: u32 = 0o644;

/// Ensure a file exists by creating parent directories as needed.
pub fn ensure_file_exists(p: &Path) -> io::Result<()> {
    if !p.exists() {
        if let Some(parent) = p.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::File::create(p)?;
    }
    Ok(())
}

/// Current permission bits of `p`, if it exists.
#[cfg(unix)]
pub fn file_mode(p: &Path) -> Option<u32> {
    use std::os::unix::fs::PermissionsExt;
    fs::metadata(p).ok().map(|m| m.permissions().mode() & 0o7777)
}

#[cfg(not(unix))]
pub fn file_mode(_p: &Path) -> Option<u32> {
    None
}

#[cfg(unix)]
pub fn set_file_mode(p: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(p, fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
pub fn set_file_mode(_p: &Path, _mode: u32) -> io::Result<()> {
    Ok(())
}

/// Replace `path` with `contents` via a sibling temp file, fsync and rename.
///
/// Readers observe either the old or the new file, never a partial write. The
/// previous permission bits are kept; new files get `DEFAULT_FILE_MODE`.
pub fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    let dir = match path.parent() {
        Some(d) if !d.as_os_str().is_empty() => d,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;
    let mode = file_mode(path).unwrap_or(DEFAULT_FILE_MODE);

    let mut tmp = tempfile::Builder::new()
        .prefix(".arbor-tmp-")
        .tempfile_in(dir)?;
    tmp.write_all(contents)?;
    tmp.as_file().sync_all()?;
    set_file_mode(tmp.path(), mode)?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_file_exists_creates_parents() {
        let td = tempfile::tempdir().expect("tmpdir");
        let p = td.path().join("database").join("nested").join("db.sqlite");
        ensure_file_exists(&p).expect("create");
        assert!(p.is_file());
        assert_eq!(fs::metadata(&p).expect("meta").len(), 0);
    }

    #[test]
    fn test_write_atomic_replaces_and_leaves_no_temp_files() {
        let td = tempfile::tempdir().expect("tmpdir");
        let p = td.path().join(".env");
        write_atomic(&p, b"A=1\n").expect("first");
        write_atomic(&p, b"A=2\n").expect("second");
        assert_eq!(fs::read_to_string(&p).expect("read"), "A=2\n");
        let leftovers: Vec<_> = fs::read_dir(td.path())
            .expect("readdir")
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().starts_with(".arbor-tmp-"))
            .collect();
        assert!(leftovers.is_empty(), "temp files left behind: {leftovers:?}");
    }

    #[cfg(unix)]
    #[test]
    fn test_write_atomic_preserves_mode() {
        let td = tempfile::tempdir().expect("tmpdir");
        let p = td.path().join(".env");
        fs::write(&p, "A=1\n").expect("seed");
        set_file_mode(&p, 0o600).expect("chmod");
        write_atomic(&p, b"A=2\n").expect("write");
        assert_eq!(file_mode(&p), Some(0o600));

        let fresh = td.path().join("new.env");
        write_atomic(&fresh, b"B=1\n").expect("write new");
        assert_eq!(file_mode(&fresh), Some(DEFAULT_FILE_MODE));
    }
}
