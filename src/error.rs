use std::path::PathBuf;
use thiserror::Error;

/// Terminal failures of the relocation sequence.
///
/// A trash failure is deliberately absent here: it never aborts the
/// sequence and is reported as a note on [`MoveOutcome::Relocated`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoveError {
    #[error("an item already exists at {}", path.display())]
    DestinationOccupied { path: PathBuf },

    #[error("copying the bundle failed: {message}")]
    CopyFailed { message: String },

    #[error("launching the relocated copy failed: {message}")]
    LaunchFailed { message: String },
}

/// What a relocation check settled on. Produced once per process lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    /// The bundle already sits in an acceptable location, or the user was
    /// asked on an earlier launch.
    NotNeeded,
    /// The user turned the offer down. They will not be asked again.
    Declined,
    /// The bundle was copied and the new copy launched. `trash_failed`
    /// records that the original could not be discarded and two copies
    /// remain on disk.
    Relocated { trash_failed: bool },
    Failed(MoveError),
}
