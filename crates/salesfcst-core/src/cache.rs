//! Memoized dataset loading.

use crate::error::Result;
use crate::records::SalesDataset;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::debug;

#[derive(Debug)]
struct Entry {
    modified: SystemTime,
    dataset: Arc<SalesDataset>,
}

/// Parsed datasets keyed by canonical path. An entry is reused only while
/// the file's modification time is unchanged.
#[derive(Debug, Default)]
pub struct DatasetCache {
    entries: HashMap<PathBuf, Entry>,
}

impl DatasetCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<Arc<SalesDataset>> {
        let path = fs::canonicalize(path.as_ref())?;
        let modified = fs::metadata(&path)?.modified()?;

        if let Some(entry) = self.entries.get(&path) {
            if entry.modified == modified {
                debug!(path = %path.display(), "Dataset cache hit");
                return Ok(Arc::clone(&entry.dataset));
            }
        }

        let dataset = Arc::new(SalesDataset::from_path(&path)?);
        self.entries.insert(
            path,
            Entry {
                modified,
                dataset: Arc::clone(&dataset),
            },
        );
        Ok(dataset)
    }

    pub fn invalidate(&mut self, path: impl AsRef<Path>) {
        if let Ok(path) = fs::canonicalize(path.as_ref()) {
            self.entries.remove(&path);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ForecastError;
    use std::fs::File;
    use std::time::Duration;

    const CSV_A: &str = "Date,Product ID,Units Sold,Units Ordered\n2024-01-01,P1,1,2\n";
    const CSV_B: &str = "Date,Product ID,Units Sold,Units Ordered\n2024-01-01,P1,1,2\n2024-01-02,P1,3,4\n";

    fn set_mtime(path: &Path, time: SystemTime) {
        File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_modified(time)
            .unwrap();
    }

    #[test]
    fn test_reuses_until_modified() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sales.csv");
        fs::write(&path, CSV_A).unwrap();
        let t0 = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        set_mtime(&path, t0);

        let mut cache = DatasetCache::new();
        let first = cache.load(&path).unwrap();
        let second = cache.load(&path).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.len(), 1);

        fs::write(&path, CSV_B).unwrap();
        set_mtime(&path, t0 + Duration::from_secs(60));
        let third = cache.load(&path).unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
        assert_eq!(third.len(), 2);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_invalidate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sales.csv");
        fs::write(&path, CSV_A).unwrap();
        let mut cache = DatasetCache::new();
        let first = cache.load(&path).unwrap();
        cache.invalidate(&path);
        assert!(cache.is_empty());
        assert!(!Arc::ptr_eq(&first, &cache.load(&path).unwrap()));
    }

    #[test]
    fn test_missing_file() {
        let mut cache = DatasetCache::new();
        assert!(matches!(
            cache.load("/nonexistent/sales.csv"),
            Err(ForecastError::Io(_))
        ));
    }
}
