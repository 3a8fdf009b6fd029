use std::fs;
use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use log::warn;
use serde::{Serialize, de::DeserializeOwned};

use crate::model::TestResult;
use crate::store::schema::SessionSnapshot;

/// Per-user on-disk state: the in-progress snapshot, best-effort
/// completion markers per schedule, and the completions counter that
/// feeds the first-test achievement. One directory per user.
pub struct SessionStore {
    base_dir: PathBuf,
}

#[derive(Default, serde::Serialize, serde::Deserialize)]
struct CompletionCountData {
    count: u32,
}

impl SessionStore {
    pub fn new() -> Result<Self> {
        let base_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("weeklab");
        fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir })
    }

    pub fn with_base_dir(base_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir })
    }

    fn user_file(&self, user_id: &str, name: &str) -> PathBuf {
        self.base_dir.join(Self::sanitize(user_id)).join(name)
    }

    fn sanitize(key: &str) -> String {
        key.chars()
            .map(|c| {
                if c.is_alphanumeric() || c == '-' || c == '_' || c == '.' {
                    c
                } else {
                    '_'
                }
            })
            .collect()
    }

    /// Atomic write: tmp file, fsync, rename over the final path.
    fn save_json<T: Serialize>(&self, path: &PathBuf, data: &T) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp_path = path.with_extension("tmp");
        let json = serde_json::to_string_pretty(data)?;
        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;
        fs::rename(&tmp_path, path)?;
        Ok(())
    }

    /// Load and parse, deleting the file if it cannot be parsed. A corrupt
    /// file is indistinguishable from an absent one to callers.
    fn load_json<T: DeserializeOwned>(&self, path: &PathBuf) -> Option<T> {
        if !path.exists() {
            return None;
        }
        let content = fs::read_to_string(path).ok()?;
        match serde_json::from_str(&content) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("discarding corrupt state file {}: {e}", path.display());
                let _ = fs::remove_file(path);
                None
            }
        }
    }

    // --- in-progress snapshot ---

    pub fn save_snapshot(&self, user_id: &str, snapshot: &SessionSnapshot) -> Result<()> {
        self.save_json(&self.user_file(user_id, "session.json"), snapshot)
    }

    pub fn load_snapshot(&self, user_id: &str) -> Option<SessionSnapshot> {
        self.load_json(&self.user_file(user_id, "session.json"))
    }

    pub fn clear_snapshot(&self, user_id: &str) {
        let _ = fs::remove_file(self.user_file(user_id, "session.json"));
    }

    // --- best-effort completion markers, keyed by schedule ---

    fn completion_file(&self, user_id: &str, schedule_id: &str) -> PathBuf {
        self.user_file(
            user_id,
            &format!("completed_{}.json", Self::sanitize(schedule_id)),
        )
    }

    pub fn save_completion(
        &self,
        user_id: &str,
        schedule_id: &str,
        result: &TestResult,
    ) -> Result<()> {
        self.save_json(&self.completion_file(user_id, schedule_id), result)
    }

    pub fn load_completion(&self, user_id: &str, schedule_id: &str) -> Option<TestResult> {
        self.load_json(&self.completion_file(user_id, schedule_id))
    }

    pub fn clear_completion(&self, user_id: &str, schedule_id: &str) {
        let _ = fs::remove_file(self.completion_file(user_id, schedule_id));
    }

    // --- durable completions counter ---

    pub fn completion_count(&self, user_id: &str) -> u32 {
        self.load_json::<CompletionCountData>(&self.user_file(user_id, "completions.json"))
            .unwrap_or_default()
            .count
    }

    /// Increment the counter, returning the count before the bump.
    pub fn bump_completion_count(&self, user_id: &str) -> Result<u32> {
        let previous = self.completion_count(user_id);
        self.save_json(
            &self.user_file(user_id, "completions.json"),
            &CompletionCountData { count: previous + 1 },
        )?;
        Ok(previous)
    }
}
