use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// The one persisted fact this crate owns: whether the user has already
/// been offered the move. Read once and written at most once per check.
pub trait PreferenceStore {
    fn asked(&self) -> bool;
    fn set_asked(&self) -> Result<()>;
}

#[derive(Debug, Default, Serialize, Deserialize, Clone)]
struct PromptRecord {
    asked: bool,
    #[serde(default)]
    asked_at: Option<DateTime<Utc>>,
}

/// File-backed store holding a single small JSON document.
pub struct JsonPreferenceStore {
    inner: Mutex<StoreInner>,
}

struct StoreInner {
    record: PromptRecord,
    file_path: PathBuf,
}

impl JsonPreferenceStore {
    pub fn new(file_path: impl AsRef<Path>) -> Result<Self> {
        let file_path = file_path.as_ref().to_path_buf();
        let mut inner = StoreInner {
            record: PromptRecord::default(),
            file_path,
        };
        inner.load_from_disk()?;
        Ok(Self {
            inner: Mutex::new(inner),
        })
    }

    /// Store under the app's per-user data directory. Deliberately not next
    /// to the executable: the executable is the thing being moved.
    pub fn for_app(app_name: &str) -> Result<Self> {
        let dirs = directories::ProjectDirs::from("", "", app_name)
            .ok_or_else(|| anyhow::anyhow!("No home directory available"))?;
        Self::new(dirs.data_local_dir().join("relocation.json"))
    }
}

impl PreferenceStore for JsonPreferenceStore {
    fn asked(&self) -> bool {
        self.inner
            .lock()
            .map(|inner| inner.record.asked)
            .unwrap_or(false)
    }

    fn set_asked(&self) -> Result<()> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| anyhow::anyhow!("Lock error"))?;
        inner.record.asked = true;
        inner.record.asked_at = Some(Utc::now());
        inner.save_to_disk()
    }
}

impl StoreInner {
    fn load_from_disk(&mut self) -> Result<()> {
        if !self.file_path.exists() {
            return Ok(());
        }

        let content = fs::read_to_string(&self.file_path)?;
        if content.is_empty() {
            return Ok(());
        }

        match serde_json::from_str::<PromptRecord>(&content) {
            Ok(record) => {
                self.record = record;
            }
            Err(_) => {
                // Corrupt record: treat the user as not yet asked rather
                // than failing startup over a diagnostics file.
                self.record = PromptRecord::default();
            }
        }

        Ok(())
    }

    fn save_to_disk(&self) -> Result<()> {
        if let Some(parent) = self.file_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.record)?;
        fs::write(&self.file_path, json)?;
        Ok(())
    }
}
