use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Filesystem operations the relocation sequence depends on.
///
/// The production implementation is [`RealFs`]; tests substitute recording
/// fakes to drive the sequence without touching the disk.
pub trait FsOps {
    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf>;

    /// Whether anything (file, directory, or dangling symlink) occupies `path`.
    fn exists(&self, path: &Path) -> bool;

    /// Recursively copy `src` to `dst`, preserving directory structure,
    /// file permissions, and symlinks.
    fn copy_tree(&self, src: &Path, dst: &Path) -> io::Result<()>;

    /// Remove `path` if possible. Failures are logged, never reported:
    /// this only runs on error paths that are already being abandoned.
    fn remove_best_effort(&self, path: &Path);
}

pub struct RealFs;

impl FsOps for RealFs {
    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        fs::canonicalize(path)
    }

    fn exists(&self, path: &Path) -> bool {
        // symlink_metadata so a dangling symlink still counts as occupied
        fs::symlink_metadata(path).is_ok()
    }

    fn copy_tree(&self, src: &Path, dst: &Path) -> io::Result<()> {
        let meta = fs::symlink_metadata(src)?;
        if !meta.is_dir() {
            if let Some(parent) = dst.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(src, dst)?;
            return Ok(());
        }

        for entry in WalkDir::new(src).follow_links(false) {
            let entry = entry.map_err(io::Error::from)?;
            let rel = entry
                .path()
                .strip_prefix(src)
                .map_err(io::Error::other)?;
            let target = dst.join(rel);

            let file_type = entry.file_type();
            if file_type.is_dir() {
                fs::create_dir_all(&target)?;
                let perms = fs::metadata(entry.path())?.permissions();
                fs::set_permissions(&target, perms)?;
            } else if file_type.is_symlink() {
                copy_symlink(entry.path(), &target)?;
            } else {
                // fs::copy carries the mode bits over, executables stay executable
                fs::copy(entry.path(), &target)?;
            }
        }

        Ok(())
    }

    fn remove_best_effort(&self, path: &Path) {
        let result = match fs::symlink_metadata(path) {
            Ok(meta) if meta.is_dir() => fs::remove_dir_all(path),
            Ok(_) => fs::remove_file(path),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return,
            Err(e) => Err(e),
        };

        if let Err(e) = result {
            tracing::warn!("Failed to remove {}: {}", path.display(), e);
        }
    }
}

#[cfg(unix)]
fn copy_symlink(src: &Path, dst: &Path) -> io::Result<()> {
    let link = fs::read_link(src)?;
    std::os::unix::fs::symlink(link, dst)
}

#[cfg(not(unix))]
fn copy_symlink(src: &Path, dst: &Path) -> io::Result<()> {
    // Creating symlinks needs elevated rights on Windows; copy the target
    // contents instead so the tree stays usable.
    fs::copy(src, dst).map(|_| ())
}
