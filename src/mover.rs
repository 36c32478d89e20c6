use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::config::MoverConfig;
use crate::error::{MoveError, MoveOutcome};
use crate::fsops::{FsOps, RealFs};
use crate::location::{self, ApplicationsRoots};
use crate::prefs::{JsonPreferenceStore, PreferenceStore};
use crate::process::{ProcessOps, SystemProcess};
use crate::prompt::{ConfirmationPrompt, ConsolePrompt, PromptChoice, PromptRequest};
use crate::trash::{SystemTrash, TrashOps};
use crate::utils;

/// External collaborators of the relocation sequence, injectable in tests.
pub struct Capabilities {
    pub prefs: Box<dyn PreferenceStore>,
    pub prompt: Box<dyn ConfirmationPrompt>,
    pub fs: Box<dyn FsOps>,
    pub trash: Box<dyn TrashOps>,
    pub process: Box<dyn ProcessOps>,
}

impl Capabilities {
    /// Production wiring.
    pub fn system(app_name: &str) -> Result<Self> {
        Ok(Self {
            prefs: Box::new(JsonPreferenceStore::for_app(app_name)?),
            prompt: Box::new(ConsolePrompt),
            fs: Box::new(RealFs),
            trash: Box::new(SystemTrash::new()),
            process: Box::new(SystemProcess),
        })
    }
}

enum State {
    Idle,
    Done(MoveOutcome),
}

/// One-shot coordinator for the relocation offer.
///
/// Construct exactly one instance near startup and call
/// [`check_application_folder`](Self::check_application_folder) once. The
/// sequence runs at most once per process lifetime; any further call
/// returns the settled outcome without touching anything.
pub struct MoveManager {
    app_name: String,
    bundle_path: PathBuf,
    roots: ApplicationsRoots,
    custom_message: Option<String>,
    prefs: Box<dyn PreferenceStore>,
    prompt: Box<dyn ConfirmationPrompt>,
    fs: Box<dyn FsOps>,
    trash: Box<dyn TrashOps>,
    process: Box<dyn ProcessOps>,
    state: State,
}

impl MoveManager {
    pub fn new(
        app_name: &str,
        bundle_path: PathBuf,
        roots: ApplicationsRoots,
        capabilities: Capabilities,
    ) -> Self {
        Self {
            app_name: app_name.to_string(),
            bundle_path,
            roots,
            custom_message: None,
            prefs: capabilities.prefs,
            prompt: capabilities.prompt,
            fs: capabilities.fs,
            trash: capabilities.trash,
            process: capabilities.process,
            state: State::Idle,
        }
    }

    /// Production construction: resolve the running bundle, discover the
    /// platform's applications directories, apply config overrides.
    pub fn with_defaults(app_name: &str, config: &MoverConfig) -> Result<Self> {
        let exe = std::env::current_exe().context("Failed to get executable path")?;
        let bundle_path = utils::bundle_path_from_exe(&exe);

        let roots = ApplicationsRoots::discover().with_overrides(
            config.paths.system_dir.clone(),
            config.paths.user_dir.clone(),
        );

        let mut manager = Self::new(app_name, bundle_path, roots, Capabilities::system(app_name)?);
        manager.custom_message = config.dialog.message.clone();
        Ok(manager)
    }

    pub fn with_custom_message(mut self, message: Option<String>) -> Self {
        self.custom_message = message;
        self
    }

    /// Run the relocation check. Intended to be invoked once near startup.
    ///
    /// Blocks through the confirmation prompt and the copy. When the user
    /// accepts and the relocated copy launches, this terminates the current
    /// process and does not return; in every other case it returns the
    /// outcome for diagnostics.
    pub fn check_application_folder(&mut self) -> MoveOutcome {
        if let State::Done(outcome) = &self.state {
            tracing::debug!("Relocation check already settled: {:?}", outcome);
            return outcome.clone();
        }

        let outcome = self.run_check();
        self.state = State::Done(outcome.clone());
        outcome
    }

    fn run_check(&mut self) -> MoveOutcome {
        if self.prefs.asked() {
            tracing::debug!("User was already offered the move, nothing to do");
            return MoveOutcome::NotNeeded;
        }

        if location::is_in_applications_folder(&self.bundle_path, &self.roots, self.fs.as_ref()) {
            tracing::info!(
                "{} already sits in an acceptable location",
                self.bundle_path.display()
            );
            // The question is settled even though nothing was asked; the
            // offer is made once ever, not once per unacceptable launch.
            self.mark_asked();
            return MoveOutcome::NotNeeded;
        }

        let request = PromptRequest {
            app_name: self.app_name.clone(),
            destination: self.roots.system.clone(),
            custom_message: self.custom_message.clone(),
        };
        let choice = self.prompt.ask(&request);
        self.mark_asked();

        match choice {
            PromptChoice::Declined => {
                tracing::info!("User declined the move, never asking again");
                MoveOutcome::Declined
            }
            PromptChoice::Accepted => self.relocate(),
        }
    }

    fn mark_asked(&self) {
        if let Err(e) = self.prefs.set_asked() {
            // Worst case the user is asked once more on a later launch.
            tracing::warn!("Failed to persist the asked flag: {e:#}");
        }
    }

    /// The mutating sequence: copy, trash the original, launch the copy,
    /// terminate. Trashing never precedes a complete copy; terminating
    /// never precedes a confirmed launch.
    fn relocate(&mut self) -> MoveOutcome {
        let Some(name) = self.bundle_path.file_name().map(ToOwned::to_owned) else {
            return MoveOutcome::Failed(MoveError::CopyFailed {
                message: format!("bundle path {} has no file name", self.bundle_path.display()),
            });
        };
        let destination = self.roots.system.join(name);

        if self.fs.exists(&destination) {
            tracing::warn!(
                "Destination {} is already occupied, aborting",
                destination.display()
            );
            return MoveOutcome::Failed(MoveError::DestinationOccupied { path: destination });
        }

        tracing::info!(
            "Copying {} to {}",
            self.bundle_path.display(),
            destination.display()
        );
        if let Err(e) = self.fs.copy_tree(&self.bundle_path, &destination) {
            tracing::warn!("Copy failed: {}", e);
            self.fs.remove_best_effort(&destination);
            return MoveOutcome::Failed(MoveError::CopyFailed {
                message: e.to_string(),
            });
        }

        let trash_failed = match self.trash.move_to_trash(&self.bundle_path) {
            Ok(resting) => {
                tracing::info!("Original moved to trash: {}", resting.display());
                false
            }
            Err(e) => {
                tracing::warn!(
                    "Could not trash the original ({}); two copies remain on disk",
                    e
                );
                true
            }
        };

        if let Err(e) = self.process.launch_independent(&destination) {
            tracing::warn!("Failed to launch the relocated copy: {}", e);
            return MoveOutcome::Failed(MoveError::LaunchFailed {
                message: e.to_string(),
            });
        }

        tracing::info!("Relocated copy launched from {}", destination.display());
        self.process.terminate();
        MoveOutcome::Relocated { trash_failed }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::io;
    use std::path::Path;
    use std::rc::Rc;

    /// Shared call journal so tests can assert ordering across capabilities.
    type Journal = Rc<RefCell<Vec<&'static str>>>;

    #[derive(Default)]
    struct MemoryPrefs {
        asked: Cell<bool>,
        writes: Cell<u32>,
        fail_writes: bool,
    }

    impl PreferenceStore for Rc<MemoryPrefs> {
        fn asked(&self) -> bool {
            self.asked.get()
        }

        fn set_asked(&self) -> Result<()> {
            self.writes.set(self.writes.get() + 1);
            if self.fail_writes {
                anyhow::bail!("disk full");
            }
            self.asked.set(true);
            Ok(())
        }
    }

    struct ScriptedPrompt {
        choice: PromptChoice,
        asks: Cell<u32>,
        last_text: RefCell<Option<String>>,
    }

    impl ScriptedPrompt {
        fn new(choice: PromptChoice) -> Self {
            Self {
                choice,
                asks: Cell::new(0),
                last_text: RefCell::new(None),
            }
        }
    }

    impl ConfirmationPrompt for Rc<ScriptedPrompt> {
        fn ask(&self, request: &PromptRequest) -> PromptChoice {
            self.asks.set(self.asks.get() + 1);
            *self.last_text.borrow_mut() = Some(request.text());
            self.choice
        }
    }

    #[derive(Default)]
    struct MockFs {
        canonicalize_calls: Cell<u32>,
        destination_occupied: bool,
        copy_error: Option<String>,
        copies: RefCell<Vec<(PathBuf, PathBuf)>>,
        removed: RefCell<Vec<PathBuf>>,
        journal: Journal,
    }

    impl FsOps for Rc<MockFs> {
        fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
            self.canonicalize_calls.set(self.canonicalize_calls.get() + 1);
            Ok(path.to_path_buf())
        }

        fn exists(&self, _path: &Path) -> bool {
            self.destination_occupied
        }

        fn copy_tree(&self, src: &Path, dst: &Path) -> io::Result<()> {
            self.journal.borrow_mut().push("copy");
            self.copies
                .borrow_mut()
                .push((src.to_path_buf(), dst.to_path_buf()));
            match &self.copy_error {
                Some(message) => Err(io::Error::other(message.clone())),
                None => Ok(()),
            }
        }

        fn remove_best_effort(&self, path: &Path) {
            self.removed.borrow_mut().push(path.to_path_buf());
        }
    }

    #[derive(Default)]
    struct MockTrash {
        error: Option<String>,
        trashed: RefCell<Vec<PathBuf>>,
        journal: Journal,
    }

    impl TrashOps for Rc<MockTrash> {
        fn move_to_trash(&self, path: &Path) -> io::Result<PathBuf> {
            self.journal.borrow_mut().push("trash");
            self.trashed.borrow_mut().push(path.to_path_buf());
            match &self.error {
                Some(message) => Err(io::Error::other(message.clone())),
                None => Ok(PathBuf::from("/trash").join(path.file_name().unwrap())),
            }
        }
    }

    #[derive(Default)]
    struct MockProcess {
        launch_error: Option<String>,
        launched: RefCell<Vec<PathBuf>>,
        terminated: Cell<bool>,
        journal: Journal,
    }

    impl ProcessOps for Rc<MockProcess> {
        fn launch_independent(&self, path: &Path) -> io::Result<()> {
            self.journal.borrow_mut().push("launch");
            self.launched.borrow_mut().push(path.to_path_buf());
            match &self.launch_error {
                Some(message) => Err(io::Error::other(message.clone())),
                None => Ok(()),
            }
        }

        fn terminate(&self) {
            self.journal.borrow_mut().push("terminate");
            self.terminated.set(true);
        }
    }

    struct Fixture {
        prefs: Rc<MemoryPrefs>,
        prompt: Rc<ScriptedPrompt>,
        fs: Rc<MockFs>,
        trash: Rc<MockTrash>,
        process: Rc<MockProcess>,
        journal: Journal,
        manager: MoveManager,
    }

    fn fixture(bundle: &str, choice: PromptChoice) -> Fixture {
        fixture_with(bundle, choice, MemoryPrefs::default(), MockFs::default(), MockTrash::default(), MockProcess::default())
    }

    fn fixture_with(
        bundle: &str,
        choice: PromptChoice,
        prefs: MemoryPrefs,
        mut fs: MockFs,
        mut trash: MockTrash,
        mut process: MockProcess,
    ) -> Fixture {
        let journal: Journal = Rc::new(RefCell::new(Vec::new()));
        fs.journal = journal.clone();
        trash.journal = journal.clone();
        process.journal = journal.clone();

        let prefs = Rc::new(prefs);
        let prompt = Rc::new(ScriptedPrompt::new(choice));
        let fs = Rc::new(fs);
        let trash = Rc::new(trash);
        let process = Rc::new(process);

        let roots = ApplicationsRoots {
            system: PathBuf::from("/Applications"),
            user: Some(PathBuf::from("/Users/x/Applications")),
        };

        let manager = MoveManager::new(
            "Demo",
            PathBuf::from(bundle),
            roots,
            Capabilities {
                prefs: Box::new(prefs.clone()),
                prompt: Box::new(prompt.clone()),
                fs: Box::new(fs.clone()),
                trash: Box::new(trash.clone()),
                process: Box::new(process.clone()),
            },
        );

        Fixture {
            prefs,
            prompt,
            fs,
            trash,
            process,
            journal,
            manager,
        }
    }

    #[test]
    fn test_acceptable_location_settles_without_prompting() {
        let mut f = fixture("/Applications/Demo.app", PromptChoice::Accepted);

        let outcome = f.manager.check_application_folder();

        assert_eq!(outcome, MoveOutcome::NotNeeded);
        assert_eq!(f.prompt.asks.get(), 0);
        // settled for good, not re-evaluated on every launch
        assert!(f.prefs.asked.get());
        assert_eq!(f.prefs.writes.get(), 1);
        assert!(f.journal.borrow().is_empty());
    }

    #[test]
    fn test_second_call_is_a_no_op() {
        let mut f = fixture("/Applications/Demo.app", PromptChoice::Accepted);

        let first = f.manager.check_application_folder();
        let classifier_queries = f.fs.canonicalize_calls.get();
        let writes = f.prefs.writes.get();

        let second = f.manager.check_application_folder();

        assert_eq!(first, second);
        assert_eq!(f.fs.canonicalize_calls.get(), classifier_queries);
        assert_eq!(f.prefs.writes.get(), writes);
    }

    #[test]
    fn test_already_asked_skips_everything() {
        let prefs = MemoryPrefs {
            asked: Cell::new(true),
            ..Default::default()
        };
        let mut f = fixture_with(
            "/Users/x/Downloads/Demo.app",
            PromptChoice::Accepted,
            prefs,
            MockFs::default(),
            MockTrash::default(),
            MockProcess::default(),
        );

        let outcome = f.manager.check_application_folder();

        assert_eq!(outcome, MoveOutcome::NotNeeded);
        assert_eq!(f.fs.canonicalize_calls.get(), 0);
        assert_eq!(f.prompt.asks.get(), 0);
        assert!(f.journal.borrow().is_empty());
    }

    #[test]
    fn test_decline_settles_without_touching_disk() {
        let mut f = fixture("/Users/x/Downloads/Demo.app", PromptChoice::Declined);

        let outcome = f.manager.check_application_folder();

        assert_eq!(outcome, MoveOutcome::Declined);
        assert_eq!(f.prompt.asks.get(), 1);
        assert!(f.prefs.asked.get());
        assert!(f.fs.copies.borrow().is_empty());
        assert!(f.trash.trashed.borrow().is_empty());
        assert!(!f.process.terminated.get());
    }

    #[test]
    fn test_prompt_names_app_and_destination() {
        let mut f = fixture("/Users/x/Downloads/Demo.app", PromptChoice::Declined);

        f.manager.check_application_folder();

        let text = f.prompt.last_text.borrow().clone().unwrap();
        assert!(text.contains("Demo"));
        assert!(text.contains("/Applications"));
    }

    #[test]
    fn test_occupied_destination_aborts_before_any_mutation() {
        let fs = MockFs {
            destination_occupied: true,
            ..Default::default()
        };
        let mut f = fixture_with(
            "/Users/x/Downloads/Demo.app",
            PromptChoice::Accepted,
            MemoryPrefs::default(),
            fs,
            MockTrash::default(),
            MockProcess::default(),
        );

        let outcome = f.manager.check_application_folder();

        assert_eq!(
            outcome,
            MoveOutcome::Failed(MoveError::DestinationOccupied {
                path: PathBuf::from("/Applications/Demo.app"),
            })
        );
        assert!(f.fs.copies.borrow().is_empty());
        assert!(f.trash.trashed.borrow().is_empty());
        assert!(!f.process.terminated.get());
    }

    #[test]
    fn test_copy_failure_cleans_up_partial_destination() {
        let fs = MockFs {
            copy_error: Some("disk full".to_string()),
            ..Default::default()
        };
        let mut f = fixture_with(
            "/Users/x/Downloads/Demo.app",
            PromptChoice::Accepted,
            MemoryPrefs::default(),
            fs,
            MockTrash::default(),
            MockProcess::default(),
        );

        let outcome = f.manager.check_application_folder();

        assert_eq!(
            outcome,
            MoveOutcome::Failed(MoveError::CopyFailed {
                message: "disk full".to_string(),
            })
        );
        assert_eq!(
            f.fs.removed.borrow().as_slice(),
            &[PathBuf::from("/Applications/Demo.app")]
        );
        // the original is never discarded after a failed copy
        assert!(f.trash.trashed.borrow().is_empty());
        assert!(!f.process.terminated.get());
    }

    #[test]
    fn test_trash_failure_is_non_fatal() {
        let trash = MockTrash {
            error: Some("trash unavailable".to_string()),
            ..Default::default()
        };
        let mut f = fixture_with(
            "/Users/x/Downloads/Demo.app",
            PromptChoice::Accepted,
            MemoryPrefs::default(),
            MockFs::default(),
            trash,
            MockProcess::default(),
        );

        let outcome = f.manager.check_application_folder();

        assert_eq!(outcome, MoveOutcome::Relocated { trash_failed: true });
        // launch and terminate still happen, two copies remain on disk
        assert!(f.process.terminated.get());
        assert_eq!(
            f.process.launched.borrow().as_slice(),
            &[PathBuf::from("/Applications/Demo.app")]
        );
    }

    #[test]
    fn test_launch_failure_keeps_current_process_alive() {
        let process = MockProcess {
            launch_error: Some("exec format error".to_string()),
            ..Default::default()
        };
        let mut f = fixture_with(
            "/Users/x/Downloads/Demo.app",
            PromptChoice::Accepted,
            MemoryPrefs::default(),
            MockFs::default(),
            MockTrash::default(),
            process,
        );

        let outcome = f.manager.check_application_folder();

        assert_eq!(
            outcome,
            MoveOutcome::Failed(MoveError::LaunchFailed {
                message: "exec format error".to_string(),
            })
        );
        assert!(!f.process.terminated.get());
        // destination copy was written and stays on disk
        assert!(!f.fs.copies.borrow().is_empty());
        assert!(f.fs.removed.borrow().is_empty());
    }

    #[test]
    fn test_successful_relocation_runs_in_strict_order() {
        let mut f = fixture("/Users/x/Downloads/Demo.app", PromptChoice::Accepted);

        let outcome = f.manager.check_application_folder();

        assert_eq!(outcome, MoveOutcome::Relocated { trash_failed: false });
        assert_eq!(
            f.journal.borrow().as_slice(),
            &["copy", "trash", "launch", "terminate"]
        );
        assert_eq!(
            f.fs.copies.borrow().as_slice(),
            &[(
                PathBuf::from("/Users/x/Downloads/Demo.app"),
                PathBuf::from("/Applications/Demo.app"),
            )]
        );
        assert_eq!(
            f.trash.trashed.borrow().as_slice(),
            &[PathBuf::from("/Users/x/Downloads/Demo.app")]
        );
    }

    #[test]
    fn test_asked_flag_write_failure_does_not_abort() {
        let prefs = MemoryPrefs {
            fail_writes: true,
            ..Default::default()
        };
        let mut f = fixture_with(
            "/Users/x/Downloads/Demo.app",
            PromptChoice::Accepted,
            prefs,
            MockFs::default(),
            MockTrash::default(),
            MockProcess::default(),
        );

        let outcome = f.manager.check_application_folder();

        assert_eq!(outcome, MoveOutcome::Relocated { trash_failed: false });
        assert_eq!(f.prefs.writes.get(), 1);
    }
}
