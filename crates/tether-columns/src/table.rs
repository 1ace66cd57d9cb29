//! Column tables.

use indexmap::IndexMap;
use tether_core::{BufferDescriptor, ElementType, ExportBuffer, ExportBufferMut};
use tether_foreign::ForeignArray;

use crate::column::{Column, ColumnData};
use crate::error::{ColumnError, StoreError};
use crate::materialize::Materialized;
use crate::step::{Pipeline, Row};
use crate::store::{ColumnStore, SnapshotOptions};

/// An ordered set of equal-length named columns.
///
/// Columns keep insertion order. Names are unique and every column has the
/// same number of rows.
#[derive(Clone, Debug, Default)]
pub struct ColumnTable {
    columns: IndexMap<String, Column>,
    rows: usize,
}

impl ColumnTable {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from `(name, values)` pairs.
    pub fn from_columns<I, S, D>(columns: I) -> Result<Self, ColumnError>
    where
        I: IntoIterator<Item = (S, D)>,
        S: Into<String>,
        D: Into<ColumnData>,
    {
        let mut table = Self::new();
        for (name, data) in columns {
            table.insert(name, data)?;
        }
        Ok(table)
    }

    /// Build a table over foreign arrays without copying them.
    ///
    /// Every array must be one-dimensional (or C-contiguous, in which case
    /// it is flattened) with a scalar element type. The columns adopt the
    /// arrays read-only and go stale if an array is dropped.
    pub fn from_foreign<'a, I, S>(arrays: I) -> Result<Self, ColumnError>
    where
        I: IntoIterator<Item = (S, &'a ForeignArray)>,
        S: Into<String>,
    {
        Self::from_descriptors(
            arrays
                .into_iter()
                .map(|(name, array)| array.export_buffer().map(|desc| (name, desc)))
                .collect::<Result<Vec<_>, _>>()?,
        )
    }

    /// Build a table by adopting contiguous scalar descriptors.
    pub fn from_descriptors<I, S>(descriptors: I) -> Result<Self, ColumnError>
    where
        I: IntoIterator<Item = (S, BufferDescriptor)>,
        S: Into<String>,
    {
        let mut table = Self::new();
        for (name, desc) in descriptors {
            table.insert(name, ColumnData::adopt(&desc)?)?;
        }
        Ok(table)
    }

    /// Append a column.
    ///
    /// Fails with [`ColumnError::DuplicateColumn`] if the name is taken and
    /// [`ColumnError::LengthMismatch`] if the length differs from the
    /// existing columns.
    pub fn insert(&mut self, name: impl Into<String>, data: impl Into<ColumnData>) -> Result<(), ColumnError> {
        let column = Column::new(name, data);
        if self.columns.contains_key(column.name()) {
            return Err(ColumnError::DuplicateColumn {
                name: column.name().to_string(),
            });
        }
        if !self.columns.is_empty() && column.len() != self.rows {
            return Err(ColumnError::LengthMismatch {
                name: column.name().to_string(),
                expected: self.rows,
                found: column.len(),
            });
        }
        self.rows = column.len();
        self.columns.insert(column.name().to_string(), column);
        Ok(())
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// Number of columns.
    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// Column names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    /// Columns in insertion order.
    pub fn columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.values()
    }

    /// Look up a column.
    pub fn column(&self, name: &str) -> Result<&Column, ColumnError> {
        self.columns.get(name).ok_or_else(|| ColumnError::UnknownColumn {
            name: name.to_string(),
        })
    }

    /// Overwrite one value of a column in place, converted from `f64`.
    pub fn set_f64(&mut self, name: &str, index: usize, value: f64) -> Result<(), ColumnError> {
        Ok(self.column_mut(name)?.set_f64(index, value)?)
    }

    /// A writable descriptor of one column. Writes through it never change
    /// the row count.
    pub fn export_column_mut(&mut self, name: &str) -> Result<BufferDescriptor, ColumnError> {
        Ok(self.column_mut(name)?.export_buffer_mut()?)
    }

    fn column_mut(&mut self, name: &str) -> Result<&mut Column, ColumnError> {
        self.columns.get_mut(name).ok_or_else(|| ColumnError::UnknownColumn {
            name: name.to_string(),
        })
    }

    /// Whether a column exists.
    pub fn contains(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// Element type of a column.
    pub fn element_type(&self, name: &str) -> Result<ElementType, ColumnError> {
        self.column(name).map(Column::element_type)
    }

    /// Start a pipeline of declarative steps over this table.
    pub fn pipeline(&self) -> Pipeline<'_> {
        Pipeline::new(self)
    }

    /// Start a pipeline with a row filter. See [`Pipeline::filter`].
    pub fn filter<F>(&self, label: impl Into<String>, predicate: F) -> Pipeline<'_>
    where
        F: Fn(&Row<'_>) -> Result<bool, ColumnError> + Send + Sync + 'static,
    {
        self.pipeline().filter(label, predicate)
    }

    /// Start a pipeline with a computed column. See [`Pipeline::define`].
    pub fn define<F>(&self, name: impl Into<String>, element: ElementType, expr: F) -> Pipeline<'_>
    where
        F: Fn(&Row<'_>) -> Result<f64, ColumnError> + Send + Sync + 'static,
    {
        self.pipeline().define(name, element, expr)
    }

    /// Materialize columns with no steps applied. See [`Pipeline::materialize`].
    pub fn materialize(&self, names: &[&str]) -> Result<Materialized, ColumnError> {
        self.pipeline().materialize(names)
    }

    /// Write columns to `store` and read them back. See [`Pipeline::snapshot`].
    pub fn snapshot<S: ColumnStore + ?Sized>(
        &self,
        store: &mut S,
        tree: &str,
        names: &[&str],
        options: &SnapshotOptions,
    ) -> Result<ColumnTable, StoreError> {
        self.pipeline().snapshot(store, tree, names, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_enforces_unique_names_and_equal_lengths() {
        let mut t = ColumnTable::new();
        t.insert("x", vec![1.0f64, 2.0, 3.0]).unwrap();
        assert_eq!(
            t.insert("x", vec![1.0f64, 2.0, 3.0]),
            Err(ColumnError::DuplicateColumn { name: "x".into() })
        );
        assert_eq!(
            t.insert("y", vec![1i32]),
            Err(ColumnError::LengthMismatch {
                name: "y".into(),
                expected: 3,
                found: 1
            })
        );
        t.insert("y", vec![4i32, 5, 6]).unwrap();
        assert_eq!(t.names().collect::<Vec<_>>(), ["x", "y"]);
        assert_eq!(t.len(), 3);
        assert_eq!(t.element_type("y").unwrap(), ElementType::I32);
        assert!(matches!(t.column("z"), Err(ColumnError::UnknownColumn { .. })));
    }

    #[test]
    fn from_foreign_adopts_without_copying() {
        let mut x = ForeignArray::from_vec(vec![1.0f64, 2.0]);
        let id = ForeignArray::from_vec(vec![7u32, 8]);
        let t = ColumnTable::from_foreign([("x", &x), ("id", &id)]).unwrap();
        assert!(t.column("x").unwrap().data().is_adopted());
        x.set(&[0], 9.0f64).unwrap();
        assert_eq!(t.column("x").unwrap().data().get_f64(0).unwrap(), 9.0);
    }

    #[test]
    fn in_place_writes_keep_row_count() {
        let mut t = ColumnTable::from_columns([("a", vec![1.0f64, 2.0, 3.0])]).unwrap();
        t.insert("b", vec![4i32, 5, 6]).unwrap();
        t.set_f64("a", 2, 9.0).unwrap();
        t.set_f64("b", 0, -4.0).unwrap();
        assert!(matches!(t.set_f64("c", 0, 0.0), Err(ColumnError::UnknownColumn { .. })));
        assert!(matches!(
            t.set_f64("a", 3, 0.0),
            Err(ColumnError::Adopt(tether_core::AdoptError::IndexOutOfBounds { index: 3, len: 3 }))
        ));

        let mut view = tether_foreign::adopt::<f64>(&t.export_column_mut("a").unwrap()).unwrap();
        view.set(0, 7.0).unwrap();
        assert_eq!(view.len(), 3);

        assert_eq!(t.len(), 3);
        assert!(t.columns().all(|c| c.len() == t.len()));
        assert_eq!(t.column("a").unwrap().data().get_f64(0).unwrap(), 7.0);
        assert_eq!(t.column("a").unwrap().data().get_f64(2).unwrap(), 9.0);
        assert_eq!(t.column("b").unwrap().data().get_i64(0).unwrap(), -4);
    }

    #[test]
    fn from_foreign_rejects_records() {
        let layout = tether_core::RecordLayout::packed(&[("a", ElementType::U8)]).unwrap();
        let r = ForeignArray::from_records(layout, [[1.0]]).unwrap();
        assert!(matches!(
            ColumnTable::from_foreign([("r", &r)]),
            Err(ColumnError::Adopt(tether_core::AdoptError::UnsupportedElementType { .. }))
        ));
    }
}
