use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};

use super::loader::{load_file, LoadError};
use super::model::SalesDataset;

/// Process-wide table of datasets that have already been read, keyed by
/// canonical path.
fn loaded() -> &'static Mutex<HashMap<PathBuf, Arc<SalesDataset>>> {
    static LOADED: OnceLock<Mutex<HashMap<PathBuf, Arc<SalesDataset>>>> = OnceLock::new();
    LOADED.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Load `path` once for the lifetime of the process.
///
/// Later calls for the same file hand back the same `Arc` without touching
/// the file system again. Failed loads are not remembered. Changes to the
/// file after the first successful load are not picked up.
pub fn load_cached(path: &Path) -> Result<Arc<SalesDataset>, LoadError> {
    let key = path.canonicalize().map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut loaded = loaded().lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    if let Some(dataset) = loaded.get(&key) {
        log::debug!("Reusing cached dataset for {}", key.display());
        return Ok(Arc::clone(dataset));
    }

    let dataset = Arc::new(load_file(&key)?);
    log::info!(
        "Loaded {} records from {} ({} branches, {} product lines)",
        dataset.len(),
        key.display(),
        dataset.branches.len(),
        dataset.product_lines.len()
    );
    loaded.insert(key, Arc::clone(&dataset));
    Ok(dataset)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "Branch,Product line,Date,Customer type,Payment,Unit price,Quantity,Tax 5%,Total,cogs,gross income,Rating\n\
                       A,Health,2024-01-01,Member,Cash,10,1,0.5,10.5,10,0.5,7\n";

    #[test]
    fn second_load_returns_the_same_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sales.csv");
        std::fs::write(&path, CSV).unwrap();

        let first = load_cached(&path).unwrap();
        // A corrupted file would fail to load, so the second call must not read it.
        std::fs::write(&path, "garbage").unwrap();
        let second = load_cached(&path).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.len(), 1);
    }

    #[test]
    fn failed_loads_are_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("later.csv");
        std::fs::write(&path, "Branch\nA\n").unwrap();
        assert!(load_cached(&path).is_err());

        std::fs::write(&path, CSV).unwrap();
        assert_eq!(load_cached(&path).unwrap().len(), 1);
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_cached(&dir.path().join("nope.csv")).unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }
}
