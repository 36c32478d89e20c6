use std::path::{Path, PathBuf};

/// Returns the directory where the executable is located.
pub fn exe_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|p| p.to_path_buf()))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Resolves the on-disk bundle for a running executable.
///
/// On macOS the executable sits inside `Name.app/Contents/MacOS/`, so the
/// nearest ancestor with an `.app` extension is the artifact to relocate.
/// Everywhere else the executable itself is the bundle.
pub fn bundle_path_from_exe(exe: &Path) -> PathBuf {
    exe.ancestors()
        .find(|p| p.extension().is_some_and(|ext| ext == "app"))
        .map(Path::to_path_buf)
        .unwrap_or_else(|| exe.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundle_is_app_ancestor() {
        let exe = Path::new("/Users/x/Downloads/Demo.app/Contents/MacOS/demo");
        assert_eq!(
            bundle_path_from_exe(exe),
            PathBuf::from("/Users/x/Downloads/Demo.app")
        );
    }

    #[test]
    fn test_bare_executable_is_its_own_bundle() {
        let exe = Path::new("/home/x/bin/demo");
        assert_eq!(bundle_path_from_exe(exe), PathBuf::from("/home/x/bin/demo"));
    }

    #[test]
    fn test_app_suffix_in_name_is_not_a_bundle() {
        let exe = Path::new("/home/x/myapp/demo");
        assert_eq!(bundle_path_from_exe(exe), PathBuf::from("/home/x/myapp/demo"));
    }
}
