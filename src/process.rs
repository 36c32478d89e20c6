use std::io;
use std::path::Path;
use std::process::Command;

/// Process control the relocation sequence depends on.
pub trait ProcessOps {
    /// Start the bundle at `path` detached from the current process, so it
    /// survives the caller terminating right afterwards.
    fn launch_independent(&self, path: &Path) -> io::Result<()>;

    /// End the current process. Only ever called after a confirmed launch;
    /// the production implementation does not return.
    fn terminate(&self);
}

pub struct SystemProcess;

impl ProcessOps for SystemProcess {
    #[cfg(target_os = "macos")]
    fn launch_independent(&self, path: &Path) -> io::Result<()> {
        // `open -n` hands the launch to launchd; the new instance is never
        // a child of this process.
        let status = Command::new("open").arg("-n").arg(path).status()?;
        if status.success() {
            Ok(())
        } else {
            Err(io::Error::other(format!("open exited with {status}")))
        }
    }

    #[cfg(not(target_os = "macos"))]
    fn launch_independent(&self, path: &Path) -> io::Result<()> {
        use std::process::Stdio;

        let mut cmd = Command::new(path);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }
        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            const DETACHED_PROCESS: u32 = 0x0000_0008;
            const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;
            cmd.creation_flags(DETACHED_PROCESS | CREATE_NEW_PROCESS_GROUP);
        }

        cmd.spawn()?;
        Ok(())
    }

    fn terminate(&self) {
        tracing::info!("Relocated copy is running, exiting this instance");
        std::process::exit(0);
    }
}
