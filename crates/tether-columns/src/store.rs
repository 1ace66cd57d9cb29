//! The persisted-state boundary: writing materialized columns to a
//! clustered column store and reading them back.

use indexmap::{IndexMap, IndexSet};
use tether_core::ElementType;

use crate::codec::{decode_page, encode_page};
use crate::column::ColumnData;
use crate::error::{ColumnError, StoreError};
use crate::materialize::Materialized;
use crate::table::ColumnTable;

/// What happens to existing trees when a snapshot is written.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SnapshotMode {
    /// Discard every tree in the store first.
    #[default]
    Recreate,
    /// Keep other trees; replacing the target needs `overwrite_if_exists`.
    Update,
}

/// Options for writing a snapshot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SnapshotOptions {
    /// How existing trees are treated. Default: [`SnapshotMode::Recreate`].
    pub mode: SnapshotMode,
    /// Rows per cluster. Default: 1024. Must be in `1..=u32::MAX`.
    pub cluster_rows: usize,
    /// In [`SnapshotMode::Update`], replace a tree of the same name
    /// instead of failing. Default: `false`.
    pub overwrite_if_exists: bool,
}

impl SnapshotOptions {
    /// Default rows per cluster.
    pub const DEFAULT_CLUSTER_ROWS: usize = 1024;

    /// Options for [`SnapshotMode::Update`] with default clustering.
    pub fn update() -> Self {
        Self {
            mode: SnapshotMode::Update,
            ..Self::default()
        }
    }

    /// Check that the options are usable.
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.cluster_rows == 0 {
            return Err(StoreError::InvalidOptions {
                reason: "cluster_rows must be at least 1".into(),
            });
        }
        if self.cluster_rows > u32::MAX as usize {
            return Err(StoreError::InvalidOptions {
                reason: format!("cluster_rows {} exceeds u32::MAX", self.cluster_rows),
            });
        }
        Ok(())
    }
}

impl Default for SnapshotOptions {
    fn default() -> Self {
        Self {
            mode: SnapshotMode::default(),
            cluster_rows: Self::DEFAULT_CLUSTER_ROWS,
            overwrite_if_exists: false,
        }
    }
}

/// Summary of a successful write.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WriteReport {
    /// The tree written.
    pub tree: String,
    /// Rows written.
    pub rows: usize,
    /// Columns written.
    pub columns: usize,
    /// Clusters written.
    pub clusters: usize,
    /// Encoded bytes across all pages.
    pub bytes: usize,
}

/// A columnar container that stores named trees of columns.
pub trait ColumnStore {
    /// Write `columns` as `tree`.
    fn write(
        &mut self,
        tree: &str,
        columns: &Materialized,
        options: &SnapshotOptions,
    ) -> Result<WriteReport, StoreError>;

    /// Read columns of `tree`, in the given order, or every column in
    /// stored order when `names` is empty.
    fn read(&self, tree: &str, names: &[&str]) -> Result<ColumnTable, StoreError>;

    /// Names of the stored trees.
    fn trees(&self) -> Vec<String>;
}

#[derive(Clone, Debug)]
struct Cluster {
    rows: usize,
    pages: Vec<Vec<u8>>,
}

#[derive(Clone, Debug)]
struct StoredTree {
    schema: Vec<(String, ElementType)>,
    rows: usize,
    clusters: Vec<Cluster>,
}

/// An in-memory [`ColumnStore`].
///
/// Rows are grouped into clusters of `cluster_rows`; each column of each
/// cluster is kept as one little-endian page (see [`crate::codec`]).
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    trees: IndexMap<String, StoredTree>,
}

impl MemoryStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a tree exists.
    pub fn contains(&self, tree: &str) -> bool {
        self.trees.contains_key(tree)
    }

    /// Drop a tree. Returns whether it existed.
    pub fn remove(&mut self, tree: &str) -> bool {
        self.trees.shift_remove(tree).is_some()
    }

    /// Row count of a tree.
    pub fn rows(&self, tree: &str) -> Option<usize> {
        self.trees.get(tree).map(|t| t.rows)
    }

    /// Cluster count of a tree.
    pub fn clusters(&self, tree: &str) -> Option<usize> {
        self.trees.get(tree).map(|t| t.clusters.len())
    }

    /// Column names and kinds of a tree, in stored order.
    pub fn schema(&self, tree: &str) -> Option<&[(String, ElementType)]> {
        self.trees.get(tree).map(|t| t.schema.as_slice())
    }

    fn stored(&self, tree: &str) -> Result<&StoredTree, StoreError> {
        self.trees.get(tree).ok_or_else(|| StoreError::UnknownTree {
            tree: tree.to_string(),
        })
    }
}

impl ColumnStore for MemoryStore {
    fn write(
        &mut self,
        tree: &str,
        columns: &Materialized,
        options: &SnapshotOptions,
    ) -> Result<WriteReport, StoreError> {
        options.validate()?;
        if columns.num_columns() == 0 {
            return Err(StoreError::InvalidOptions {
                reason: "no columns to write".into(),
            });
        }
        if options.mode == SnapshotMode::Update && !options.overwrite_if_exists && self.contains(tree) {
            return Err(StoreError::TreeExists {
                tree: tree.to_string(),
            });
        }

        let rows = columns.len();
        let mut clusters = Vec::with_capacity(rows.div_ceil(options.cluster_rows));
        let mut bytes = 0usize;
        let mut start = 0usize;
        while start < rows {
            let end = (start + options.cluster_rows).min(rows);
            let mut pages = Vec::with_capacity(columns.num_columns());
            for column in columns.columns() {
                let page = encode_page(column.data(), start..end)?;
                bytes += page.len();
                pages.push(page);
            }
            tracing::debug!(tree, cluster = clusters.len(), rows = end - start, "cluster encoded");
            clusters.push(Cluster {
                rows: end - start,
                pages,
            });
            start = end;
        }

        let schema = columns
            .columns()
            .map(|c| (c.name().to_string(), c.element_type()))
            .collect();
        if options.mode == SnapshotMode::Recreate {
            self.trees.clear();
        }
        let report = WriteReport {
            tree: tree.to_string(),
            rows,
            columns: columns.num_columns(),
            clusters: clusters.len(),
            bytes,
        };
        self.trees.insert(
            tree.to_string(),
            StoredTree {
                schema,
                rows,
                clusters,
            },
        );
        tracing::info!(
            tree,
            rows,
            columns = report.columns,
            clusters = report.clusters,
            bytes,
            mode = ?options.mode,
            "snapshot written"
        );
        Ok(report)
    }

    fn read(&self, tree: &str, names: &[&str]) -> Result<ColumnTable, StoreError> {
        let stored = self.stored(tree)?;
        let selected: Vec<usize> = if names.is_empty() {
            (0..stored.schema.len()).collect()
        } else {
            let mut seen = IndexSet::with_capacity(names.len());
            let mut out = Vec::with_capacity(names.len());
            for &name in names {
                if !seen.insert(name) {
                    return Err(ColumnError::DuplicateColumn {
                        name: name.to_string(),
                    }
                    .into());
                }
                let index = stored
                    .schema
                    .iter()
                    .position(|(n, _)| n == name)
                    .ok_or_else(|| ColumnError::UnknownColumn {
                        name: name.to_string(),
                    })?;
                out.push(index);
            }
            out
        };

        let mut table = ColumnTable::new();
        for index in selected {
            let (name, kind) = &stored.schema[index];
            let mut data = ColumnData::empty(*kind);
            for (c, cluster) in stored.clusters.iter().enumerate() {
                let page = cluster.pages.get(index).ok_or_else(|| StoreError::Corrupt {
                    tree: tree.to_string(),
                    detail: format!("cluster {c} has no page for column '{name}'"),
                })?;
                let decoded = decode_page(page, &mut data).map_err(|e| StoreError::Corrupt {
                    tree: tree.to_string(),
                    detail: format!("column '{name}', cluster {c}: {e}"),
                })?;
                if decoded != cluster.rows {
                    return Err(StoreError::Corrupt {
                        tree: tree.to_string(),
                        detail: format!(
                            "column '{name}', cluster {c}: {decoded} rows, expected {}",
                            cluster.rows
                        ),
                    });
                }
            }
            table.insert(name.clone(), data)?;
        }
        tracing::debug!(tree, rows = stored.rows, columns = table.num_columns(), "tree read");
        Ok(table)
    }

    fn trees(&self) -> Vec<String> {
        self.trees.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn xy() -> ColumnTable {
        ColumnTable::from_columns([
            ("x", ColumnData::from(vec![1.0f64, 2.0, 3.0])),
            ("y", ColumnData::from(vec![4i32, 5, 6])),
        ])
        .unwrap()
    }

    #[test]
    fn write_groups_rows_into_clusters() {
        let mut store = MemoryStore::new();
        let m = xy().materialize(&["x", "y"]).unwrap();
        let options = SnapshotOptions {
            cluster_rows: 2,
            ..SnapshotOptions::default()
        };
        let report = store.write("t", &m, &options).unwrap();
        assert_eq!(report.rows, 3);
        assert_eq!(report.clusters, 2);
        assert_eq!(report.columns, 2);
        assert_eq!(store.clusters("t"), Some(2));
        assert_eq!(store.rows("t"), Some(3));
        let back = store.read("t", &[]).unwrap();
        assert_eq!(back.names().collect::<Vec<_>>(), ["x", "y"]);
        assert_eq!(back.len(), 3);
    }

    #[test]
    fn read_selects_and_orders_columns() {
        let mut store = MemoryStore::new();
        xy().snapshot(&mut store, "t", &["x", "y"], &SnapshotOptions::default())
            .unwrap();
        let back = store.read("t", &["y"]).unwrap();
        assert_eq!(back.names().collect::<Vec<_>>(), ["y"]);
        assert!(matches!(
            store.read("t", &["z"]),
            Err(StoreError::Column(ColumnError::UnknownColumn { .. }))
        ));
        assert!(matches!(
            store.read("t", &["y", "y"]),
            Err(StoreError::Column(ColumnError::DuplicateColumn { .. }))
        ));
        assert!(matches!(store.read("u", &[]), Err(StoreError::UnknownTree { .. })));
    }

    #[test]
    fn recreate_discards_other_trees() {
        let mut store = MemoryStore::new();
        let m = xy().materialize(&["x"]).unwrap();
        store.write("a", &m, &SnapshotOptions::update()).unwrap();
        store.write("b", &m, &SnapshotOptions::default()).unwrap();
        assert_eq!(store.trees(), vec!["b".to_string()]);
    }

    #[test]
    fn update_keeps_trees_and_guards_overwrite() {
        let mut store = MemoryStore::new();
        let m = xy().materialize(&["x"]).unwrap();
        store.write("a", &m, &SnapshotOptions::update()).unwrap();
        store.write("b", &m, &SnapshotOptions::update()).unwrap();
        assert_eq!(store.trees(), vec!["a".to_string(), "b".to_string()]);
        assert_eq!(
            store.write("a", &m, &SnapshotOptions::update()),
            Err(StoreError::TreeExists { tree: "a".into() })
        );
        let overwrite = SnapshotOptions {
            overwrite_if_exists: true,
            ..SnapshotOptions::update()
        };
        assert!(store.write("a", &m, &overwrite).is_ok());
        assert!(store.remove("a"));
        assert!(!store.contains("a"));
    }

    #[test]
    fn invalid_options_are_rejected() {
        let mut store = MemoryStore::new();
        let m = xy().materialize(&["x"]).unwrap();
        let zero = SnapshotOptions {
            cluster_rows: 0,
            ..SnapshotOptions::default()
        };
        assert!(matches!(
            store.write("t", &m, &zero),
            Err(StoreError::InvalidOptions { .. })
        ));
        let none = xy().materialize(&[]).unwrap();
        assert!(matches!(
            store.write("t", &none, &SnapshotOptions::default()),
            Err(StoreError::InvalidOptions { .. })
        ));
        assert!(store.trees().is_empty());
    }

    #[test]
    fn empty_table_round_trips_with_no_clusters() {
        let mut store = MemoryStore::new();
        let t = ColumnTable::from_columns([("x", ColumnData::from(Vec::<f32>::new()))]).unwrap();
        let back = t.snapshot(&mut store, "e", &["x"], &SnapshotOptions::default()).unwrap();
        assert_eq!(store.clusters("e"), Some(0));
        assert_eq!(back.len(), 0);
        assert_eq!(back.element_type("x").unwrap(), ElementType::F32);
    }
}
