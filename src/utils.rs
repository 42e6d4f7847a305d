use std::{
    fs, io,
    os::unix::fs as unix_fs,
    path::{Path, PathBuf},
};

/// Resolve `path` against an explicit `base` instead of the ambient current
/// directory. Does not touch the filesystem, missing paths are fine.
pub fn absolutize(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// Replace `link` with a fresh symlink to `target`. Remove-then-recreate is
/// enough here, everything runs single-threaded at startup.
pub fn symlink_force(target: &Path, link: &Path) -> io::Result<()> {
    match unix_fs::symlink(target, link) {
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
            fs::remove_file(link)?;
            unix_fs::symlink(target, link)
        }
        other => other,
    }
}
