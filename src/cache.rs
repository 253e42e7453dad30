use crate::error::LoadError;
use crate::loader::load_table;
use crate::types::{Table, TableSchema};
use log::debug;
use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

type Slot = Arc<OnceCell<Arc<Table>>>;

/// Loaded tables keyed by file path and schema.
///
/// The map lock only guards slot lookup; each slot is filled at most once,
/// so two panels asking for the same file concurrently trigger one read and
/// both get the same `Arc<Table>`. A failed load leaves its slot empty and
/// the next caller retries.
#[derive(Debug, Default)]
pub struct TableCache {
    slots: Mutex<HashMap<(PathBuf, TableSchema), Slot>>,
}

impl TableCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_load(&self, path: &Path, schema: &TableSchema) -> Result<Arc<Table>, LoadError> {
        let slot = {
            let mut slots = self.lock();
            Arc::clone(
                slots
                    .entry((path.to_path_buf(), schema.clone()))
                    .or_default(),
            )
        };
        if let Some(table) = slot.get() {
            debug!("cache hit for {}", path.display());
            return Ok(Arc::clone(table));
        }
        let table = slot.get_or_try_init(|| {
            debug!("cache miss for {}", path.display());
            load_table(path, schema).map(Arc::new)
        })?;
        Ok(Arc::clone(table))
    }

    pub fn is_cached(&self, path: &Path) -> bool {
        self.lock()
            .iter()
            .any(|((p, _), slot)| p == path && slot.get().is_some())
    }

    /// Drop every cached table read from `path`.
    pub fn invalidate(&self, path: &Path) {
        self.lock().retain(|(p, _), _| p != path);
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Number of successfully loaded tables.
    pub fn len(&self) -> usize {
        self.lock().values().filter(|slot| slot.get().is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<(PathBuf, TableSchema), Slot>> {
        self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn fixture(name: &str) -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("test").join(name)
    }

    #[test]
    fn test_repeated_loads_share_one_table() {
        let cache = TableCache::new();
        let schema = TableSchema::default();
        let a = cache.get_or_load(&fixture("percentages.csv"), &schema).unwrap();
        let b = cache.get_or_load(&fixture("percentages.csv"), &schema).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_failed_load_is_not_cached() {
        let cache = TableCache::new();
        let path = fixture("missing.csv");
        assert!(cache.get_or_load(&path, &TableSchema::default()).is_err());
        assert!(!cache.is_cached(&path));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_invalidate_forces_reload() {
        let cache = TableCache::new();
        let path = fixture("percentages.csv");
        let schema = TableSchema::default();
        let a = cache.get_or_load(&path, &schema).unwrap();
        cache.invalidate(&path);
        assert!(!cache.is_cached(&path));
        let b = cache.get_or_load(&path, &schema).unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(*a, *b);
    }

    #[test]
    fn test_concurrent_first_access_loads_once() {
        let cache = Arc::new(TableCache::new());
        let path = fixture("padded_headers.csv");
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let path = path.clone();
                thread::spawn(move || cache.get_or_load(&path, &TableSchema::default()).unwrap())
            })
            .collect();
        let tables: Vec<Arc<Table>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(tables.iter().all(|t| Arc::ptr_eq(t, &tables[0])));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_clear_drops_every_table() {
        let cache = TableCache::new();
        let schema = TableSchema::default();
        let a = cache.get_or_load(&fixture("percentages.csv"), &schema).unwrap();
        cache.get_or_load(&fixture("padded_headers.csv"), &schema).unwrap();
        assert_eq!(cache.len(), 2);
        cache.clear();
        assert_eq!(cache.len(), 0);
        assert!(!cache.is_cached(&fixture("percentages.csv")));
        let b = cache.get_or_load(&fixture("percentages.csv"), &schema).unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
    }
}
