// src/storage/mod.rs
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::extractors::profile::ProfileRecord;
use crate::utils::error::StorageError;

/// Outcome reported by the persistence sink. A failure here never invalidates
/// the already-extracted record.
#[derive(Debug, Serialize)]
pub struct SinkOutcome {
    pub success: bool,
    pub error: Option<String>,
}

pub struct StorageManager {
    base_dir: PathBuf,
}

impl StorageManager {
    /// Creates a new StorageManager with the specified base directory
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self, StorageError> {
        let base_path = base_dir.as_ref().to_path_buf();

        if !base_path.exists() {
            std::fs::create_dir_all(&base_path).map_err(StorageError::IoError)?;
        }

        Ok(Self { base_dir: base_path })
    }

    /// Saves the profile record as pretty-printed JSON, one file per pass.
    pub async fn save_profile(&self, record: &ProfileRecord) -> Result<PathBuf, StorageError> {
        let filename = format!("profile_{}.json", record.metadata.id);
        let file_path = self.base_dir.join(filename);

        let json = serde_json::to_string_pretty(record)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;

        tokio::fs::write(&file_path, json)
            .await
            .map_err(StorageError::IoError)?;

        tracing::info!("Saved profile to {}", file_path.display());

        Ok(file_path)
    }

    /// Sink adapter: converts the save result into a reported outcome.
    pub async fn persist(&self, record: &ProfileRecord) -> SinkOutcome {
        match self.save_profile(record).await {
            Ok(_) => SinkOutcome { success: true, error: None },
            Err(e) => {
                tracing::error!("Persistence failed (record retained): {}", e);
                SinkOutcome { success: false, error: Some(e.to_string()) }
            }
        }
    }
}

// --- Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::profile::ExtractionMetadata;

    fn sample_record() -> ProfileRecord {
        ProfileRecord {
            name: Some("Ada Lovelace".to_string()),
            role: None,
            follower_count_text: None,
            connection_count_text: None,
            experiences: vec![],
            education_and_certifications: vec![],
            skill_count: 0,
            skills: vec![],
            metadata: ExtractionMetadata {
                id: 4242,
                timestamp_iso8601: "2026-08-25T00:00:00+00:00".to_string(),
                source_url: "https://example.com/in/ada".to_string(),
                elapsed_ms: 1,
                cache_hits: 0,
            },
        }
    }

    #[test]
    fn test_persist_reports_success() {
        let dir = std::env::temp_dir().join("profile_extractor_storage_test");
        let storage = StorageManager::new(&dir).expect("storage dir");

        let outcome = tokio_test::block_on(storage.persist(&sample_record()));
        assert!(outcome.success);
        assert!(outcome.error.is_none());
        assert!(dir.join("profile_4242.json").exists());
    }

    #[test]
    fn test_persist_failure_is_reported_not_raised() {
        // A base dir that is actually a file makes the write fail.
        let bogus_file = std::env::temp_dir().join("profile_extractor_bogus_dir");
        std::fs::write(&bogus_file, b"not a dir").unwrap();

        let storage = StorageManager { base_dir: bogus_file.clone() };
        let outcome = tokio_test::block_on(storage.persist(&sample_record()));
        assert!(!outcome.success);
        assert!(outcome.error.is_some());
    }
}
