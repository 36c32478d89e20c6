use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

#[cfg(unix)]
use directories::BaseDirs;

/// Reversible deletion. A failure here is never fatal to the relocation
/// sequence; the caller downgrades it to a warning.
pub trait TrashOps {
    /// Discard `path` recoverably. Returns where the item came to rest.
    fn move_to_trash(&self, path: &Path) -> io::Result<PathBuf>;
}

/// Where discarded items go on this platform.
#[allow(dead_code)] // not every variant is constructed on every platform
enum TrashLayout {
    /// macOS: the flat per-user `~/.Trash` directory.
    Finder(PathBuf),
    /// freedesktop: `Trash/files` plus one `.trashinfo` record per item.
    Freedesktop(PathBuf),
    /// No usable trash location: rename aside next to the original.
    RenameAside,
}

impl TrashLayout {
    fn detect() -> Self {
        #[cfg(target_os = "macos")]
        {
            if let Some(dirs) = BaseDirs::new() {
                return Self::Finder(dirs.home_dir().join(".Trash"));
            }
        }
        #[cfg(all(unix, not(target_os = "macos")))]
        {
            if let Some(dirs) = BaseDirs::new() {
                return Self::Freedesktop(dirs.data_local_dir().join("Trash"));
            }
        }
        Self::RenameAside
    }
}

pub struct SystemTrash {
    layout: TrashLayout,
}

impl SystemTrash {
    pub fn new() -> Self {
        Self {
            layout: TrashLayout::detect(),
        }
    }
}

impl Default for SystemTrash {
    fn default() -> Self {
        Self::new()
    }
}

impl TrashOps for SystemTrash {
    fn move_to_trash(&self, path: &Path) -> io::Result<PathBuf> {
        let name = path
            .file_name()
            .ok_or_else(|| io::Error::other("path has no file name"))?;

        match &self.layout {
            TrashLayout::Finder(trash) => {
                fs::create_dir_all(trash)?;
                let resting = unique_destination(trash, name);
                fs::rename(path, &resting)?;
                Ok(resting)
            }
            TrashLayout::Freedesktop(trash) => {
                let files = trash.join("files");
                let info = trash.join("info");
                fs::create_dir_all(&files)?;
                fs::create_dir_all(&info)?;

                let resting = unique_destination(&files, name);
                let resting_name = resting
                    .file_name()
                    .ok_or_else(|| io::Error::other("trash destination has no file name"))?
                    .to_string_lossy()
                    .into_owned();

                // Info record goes first so the entry is never orphaned.
                let record = format!(
                    "[Trash Info]\nPath={}\nDeletionDate={}\n",
                    path.display(),
                    chrono::Local::now().format("%Y-%m-%dT%H:%M:%S"),
                );
                fs::write(info.join(format!("{resting_name}.trashinfo")), record)?;
                fs::rename(path, &resting)?;
                Ok(resting)
            }
            TrashLayout::RenameAside => {
                let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
                let resting = path.with_file_name(format!(
                    "{}.trashed-{stamp}",
                    name.to_string_lossy()
                ));
                fs::rename(path, &resting)?;
                tracing::info!(
                    "No trash location on this platform, renamed aside to {}",
                    resting.display()
                );
                Ok(resting)
            }
        }
    }
}

/// First free name in `dir` for `name`, appending " 2", " 3", ... on collision.
fn unique_destination(dir: &Path, name: &OsStr) -> PathBuf {
    let first = dir.join(name);
    if fs::symlink_metadata(&first).is_err() {
        return first;
    }

    let display = name.to_string_lossy();
    let mut n = 2u32;
    loop {
        let candidate = dir.join(format!("{display} {n}"));
        if fs::symlink_metadata(&candidate).is_err() {
            return candidate;
        }
        n += 1;
    }
}
