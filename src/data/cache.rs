use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{Context, Result};

use super::loader::{materialize, DatasetKind, Source};
use super::model::Dataset;
use crate::store::TabularStore;

/// Identity of one materialization. Stored datasets include the store's
/// identity and the table's revision, so a rewrite of the table or a
/// recreated store file produces a different key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MaterializeKey {
    Synthetic {
        kind: DatasetKind,
        seed: u64,
    },
    Stored {
        /// Store file; empty for in-memory stores.
        path: PathBuf,
        store_id: String,
        table: String,
        revision: u64,
    },
}

impl MaterializeKey {
    fn table(&self) -> Option<&str> {
        match self {
            MaterializeKey::Stored { table, .. } => Some(table),
            MaterializeKey::Synthetic { .. } => None,
        }
    }
}

/// Caller-owned memo of materialized datasets.
#[derive(Debug, Default)]
pub struct DatasetCache {
    entries: HashMap<MaterializeKey, Dataset>,
    hits: usize,
    misses: usize,
}

impl DatasetCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `(hits, misses)` since creation.
    pub fn stats(&self) -> (usize, usize) {
        (self.hits, self.misses)
    }

    /// Return the cached dataset for `key`, computing it with `load` on a miss.
    pub fn get_or_try_insert_with<F>(&mut self, key: MaterializeKey, load: F) -> Result<Dataset>
    where
        F: FnOnce() -> Result<Dataset>,
    {
        if let Some(ds) = self.entries.get(&key) {
            self.hits += 1;
            log::debug!("dataset cache hit: {key:?}");
            return Ok(ds.clone());
        }
        self.misses += 1;
        let ds = load()?;
        self.entries.insert(key, ds.clone());
        Ok(ds)
    }

    pub fn synthetic(&mut self, kind: DatasetKind, seed: u64) -> Result<Dataset> {
        let key = MaterializeKey::Synthetic { kind, seed };
        self.get_or_try_insert_with(key, || materialize(Source::Synthetic { kind, seed }))
    }

    /// Read `kind` from `store`, reusing the cached copy while the table's
    /// revision is unchanged.
    pub fn stored(&mut self, store: &TabularStore, kind: DatasetKind) -> Result<Dataset> {
        let table = kind.table_name();
        let revision = store
            .revision(table)
            .with_context(|| format!("reading revision of '{table}'"))?;
        let store_path = store.path().map(PathBuf::from).unwrap_or_default();
        let store_id = store.id();
        // older revisions of this table, or of a store this file replaced,
        // can never be hit again
        self.entries.retain(|k, _| match k {
            MaterializeKey::Stored {
                path,
                store_id: id,
                table: t,
                revision: r,
            } => {
                let same_store = id == store_id;
                let replaced_file = !same_store && store.path().is_some() && *path == store_path;
                !(t == table && ((same_store && *r != revision) || replaced_file))
            }
            MaterializeKey::Synthetic { .. } => true,
        });
        let key = MaterializeKey::Stored {
            path: store_path,
            store_id: store_id.to_string(),
            table: table.to_string(),
            revision,
        };
        self.get_or_try_insert_with(key, || materialize(Source::Stored { store, kind }))
    }

    /// Drop every stored entry for `table`.
    pub fn invalidate_table(&mut self, table: &str) {
        let before = self.entries.len();
        self.entries.retain(|k, _| k.table() != Some(table));
        log::debug!(
            "invalidated {} cached entries for '{table}'",
            before - self.entries.len()
        );
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_entries_are_reused() {
        let mut cache = DatasetCache::new();
        let a = cache.synthetic(DatasetKind::Sales, 42).unwrap();
        let b = cache.synthetic(DatasetKind::Sales, 42).unwrap();
        assert_eq!(a, b);
        assert_eq!(cache.stats(), (1, 1));
        cache.synthetic(DatasetKind::Sales, 43).unwrap();
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn rewriting_the_table_misses_the_cache() {
        let mut store = TabularStore::open_in_memory().unwrap();
        let mut cache = DatasetCache::new();

        let first = DatasetKind::Sales.generate(1).unwrap();
        store.replace_table("sales", &first).unwrap();
        assert_eq!(cache.stored(&store, DatasetKind::Sales).unwrap(), first);
        assert_eq!(cache.stored(&store, DatasetKind::Sales).unwrap(), first);
        assert_eq!(cache.stats(), (1, 1));

        let second = DatasetKind::Sales.generate(2).unwrap();
        store.replace_table("sales", &second).unwrap();
        assert_eq!(cache.stored(&store, DatasetKind::Sales).unwrap(), second);
        assert_eq!(cache.stats(), (1, 2));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn separate_in_memory_stores_do_not_share_entries() {
        let mut a = TabularStore::open_in_memory().unwrap();
        let mut b = TabularStore::open_in_memory().unwrap();
        let first = DatasetKind::Sales.generate(1).unwrap();
        let second = DatasetKind::Sales.generate(2).unwrap();
        a.replace_table("sales", &first).unwrap();
        b.replace_table("sales", &second).unwrap();
        assert_eq!(a.revision("sales").unwrap(), b.revision("sales").unwrap());

        let mut cache = DatasetCache::new();
        assert_eq!(cache.stored(&a, DatasetKind::Sales).unwrap(), first);
        assert_eq!(cache.stored(&b, DatasetKind::Sales).unwrap(), second);
        assert_eq!(cache.stats(), (0, 2));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn invalidate_drops_only_that_table() {
        let mut store = TabularStore::open_in_memory().unwrap();
        let mut cache = DatasetCache::new();
        store
            .replace_table("practice", &DatasetKind::Practice.generate(0).unwrap())
            .unwrap();
        cache.stored(&store, DatasetKind::Practice).unwrap();
        cache.synthetic(DatasetKind::Sales, 1).unwrap();
        cache.invalidate_table("practice");
        assert_eq!(cache.len(), 1);
    }
}
