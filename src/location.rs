use std::path::{Component, Path, PathBuf};

use crate::fsops::FsOps;

/// Canonical directories recognized as acceptable installation parents:
/// the system-wide applications directory plus the per-user one, resolved
/// once per run.
#[derive(Debug, Clone)]
pub struct ApplicationsRoots {
    pub system: PathBuf,
    pub user: Option<PathBuf>,
}

impl ApplicationsRoots {
    #[cfg(target_os = "macos")]
    pub fn discover() -> Self {
        let user = directories::BaseDirs::new().map(|d| d.home_dir().join("Applications"));
        Self {
            system: PathBuf::from("/Applications"),
            user,
        }
    }

    #[cfg(target_os = "windows")]
    pub fn discover() -> Self {
        let system = std::env::var_os("ProgramFiles")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(r"C:\Program Files"));
        let user = directories::BaseDirs::new().map(|d| d.data_local_dir().join("Programs"));
        Self { system, user }
    }

    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    pub fn discover() -> Self {
        let user = directories::BaseDirs::new().map(|d| d.home_dir().join("Applications"));
        Self {
            system: PathBuf::from("/opt"),
            user,
        }
    }

    pub fn with_overrides(mut self, system: Option<PathBuf>, user: Option<PathBuf>) -> Self {
        if let Some(system) = system {
            self.system = system;
        }
        if let Some(user) = user {
            self.user = Some(user);
        }
        self
    }

    fn all(&self) -> impl Iterator<Item = &Path> {
        std::iter::once(self.system.as_path()).chain(self.user.as_deref())
    }
}

/// Decides whether `bundle` already sits in an acceptable location.
///
/// Accepts a bundle whose containing directory equals or nests under one
/// of `roots`, or whose canonical path has any ancestor directory named
/// exactly `Applications` (a portable drive's `Applications` folder counts
/// just as much as the real one). Read-only; identical input and
/// filesystem state give identical answers. A path that cannot be
/// canonicalized classifies as not acceptable.
pub fn is_in_applications_folder(
    bundle: &Path,
    roots: &ApplicationsRoots,
    fs: &dyn FsOps,
) -> bool {
    let canonical = match fs.canonicalize(bundle) {
        Ok(path) => path,
        Err(e) => {
            tracing::debug!("Could not canonicalize {}: {}", bundle.display(), e);
            return false;
        }
    };

    let Some(parent) = canonical.parent() else {
        return false;
    };

    if roots.all().any(|root| parent.starts_with(root)) {
        tracing::debug!("{} is under an applications root", canonical.display());
        return true;
    }

    // Whole-component match only: "MyApplications" must not pass, and the
    // bundle's own name does not count, only directories above it.
    parent
        .components()
        .any(|c| matches!(c, Component::Normal(name) if name == "Applications"))
}
