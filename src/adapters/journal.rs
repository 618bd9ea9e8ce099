use crate::domain::model::CallId;
use crate::domain::ports::{Journal, JournalEntry};
use crate::utils::error::{RegistryError, Result};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

/// 日誌檔名，放在部署目錄下
pub const JOURNAL_FILE: &str = "journal.jsonl";

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// 記憶體內日誌，供測試與 dry run 使用
#[derive(Debug, Clone, Default)]
pub struct MemoryJournal {
    entries: Arc<Mutex<Vec<JournalEntry>>>,
}

impl MemoryJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn entries(&self) -> Vec<JournalEntry> {
        lock(&self.entries).clone()
    }
}

impl Journal for MemoryJournal {
    async fn lookup(&self, call_id: &CallId) -> Result<Option<JournalEntry>> {
        Ok(lock(&self.entries)
            .iter()
            .find(|entry| &entry.call_id == call_id)
            .cloned())
    }

    async fn record(&self, entry: JournalEntry) -> Result<()> {
        lock(&self.entries).push(entry);
        Ok(())
    }
}

/// JSON Lines 檔案日誌：每完成一筆呼叫就追加一行
#[derive(Debug)]
pub struct FileJournal {
    path: PathBuf,
    entries: Mutex<Vec<JournalEntry>>,
}

impl FileJournal {
    /// 開啟日誌；檔案不存在時視為空白
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut entries = Vec::new();

        if path.exists() {
            let content = fs::read_to_string(&path)?;
            for (index, line) in content.lines().enumerate() {
                if line.trim().is_empty() {
                    continue;
                }
                let entry: JournalEntry =
                    serde_json::from_str(line).map_err(|e| RegistryError::JournalCorrupted {
                        line: index + 1,
                        message: e.to_string(),
                    })?;
                entries.push(entry);
            }
            tracing::debug!("📒 Loaded {} journal entries from {}", entries.len(), path.display());
        }

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn entries(&self) -> Vec<JournalEntry> {
        lock(&self.entries).clone()
    }
}

impl Journal for FileJournal {
    async fn lookup(&self, call_id: &CallId) -> Result<Option<JournalEntry>> {
        Ok(lock(&self.entries)
            .iter()
            .find(|entry| &entry.call_id == call_id)
            .cloned())
    }

    async fn record(&self, entry: JournalEntry) -> Result<()> {
        let line = serde_json::to_string(&entry)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", line)?;
        file.sync_data()?;

        lock(&self.entries).push(entry);
        Ok(())
    }
}
