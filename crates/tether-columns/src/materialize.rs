//! Materialized columns and their zero-copy foreign views.

use indexmap::IndexMap;
use tether_core::{ArrayInterface, ExportBuffer, ExportBufferMut};
use tether_foreign::{adopt_any, AnyView};

use crate::column::{Column, ColumnElement};
use crate::error::ColumnError;
use crate::table::ColumnTable;

/// Owned, contiguous columns in requested order.
///
/// Produced by [`Pipeline::materialize`](crate::Pipeline::materialize).
/// Views returned by [`Materialized::as_foreign`] alias these columns;
/// they go stale when the `Materialized` is dropped.
#[derive(Clone, Debug)]
pub struct Materialized {
    rows: usize,
    columns: IndexMap<String, Column>,
}

impl Materialized {
    pub(crate) fn new(rows: usize, columns: Vec<Column>) -> Self {
        Self {
            rows,
            columns: columns
                .into_iter()
                .map(|c| (c.name().to_string(), c))
                .collect(),
        }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows
    }

    /// Whether there are no rows.
    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// Number of columns.
    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// Column names in requested order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    /// Columns in requested order.
    pub fn columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.values()
    }

    /// Look up a column.
    pub fn column(&self, name: &str) -> Result<&Column, ColumnError> {
        self.columns.get(name).ok_or_else(|| ColumnError::UnknownColumn {
            name: name.to_string(),
        })
    }

    /// Copy a column's values out as `T`.
    pub fn get<T: ColumnElement>(&self, name: &str) -> Result<Vec<T>, ColumnError> {
        let column = self.column(name)?;
        let buf = column.data().typed::<T>().ok_or_else(|| ColumnError::TypeMismatch {
            name: name.to_string(),
            expected: T::TYPE,
            found: column.element_type(),
        })?;
        Ok(buf.to_vec()?)
    }

    /// Writable zero-copy views of every column, keyed by name in
    /// requested order.
    pub fn as_foreign(&mut self) -> Result<IndexMap<String, AnyView>, ColumnError> {
        let mut out = IndexMap::with_capacity(self.columns.len());
        for (name, column) in &mut self.columns {
            let desc = column.export_buffer_mut()?;
            out.insert(name.clone(), adopt_any(&desc)?);
        }
        Ok(out)
    }

    /// Array-interface records of every column, keyed by name in
    /// requested order.
    pub fn array_interfaces(&self) -> Result<IndexMap<String, ArrayInterface>, ColumnError> {
        let mut out = IndexMap::with_capacity(self.columns.len());
        for (name, column) in &self.columns {
            out.insert(name.clone(), column.data().array_interface()?);
        }
        Ok(out)
    }

    /// Turn the columns into a table.
    pub fn into_table(self) -> Result<ColumnTable, ColumnError> {
        ColumnTable::from_columns(
            self.columns
                .into_values()
                .map(|c| (c.name().to_string(), c.into_data())),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tether_core::{AdoptError, ElementType};

    fn xy() -> ColumnTable {
        ColumnTable::from_columns([
            ("x", crate::ColumnData::from(vec![1.0f64, 2.0, 3.0])),
            ("y", crate::ColumnData::from(vec![4i32, 5, 6])),
        ])
        .unwrap()
    }

    #[test]
    fn foreign_views_alias_materialized_columns() {
        let mut m = xy().materialize(&["y", "x"]).unwrap();
        let mut views = m.as_foreign().unwrap();
        assert_eq!(views.keys().collect::<Vec<_>>(), ["y", "x"]);
        assert_eq!(views["y"].element_type(), ElementType::I32);
        views["x"].set_f64(0, 10.0).unwrap();
        assert_eq!(m.get::<f64>("x").unwrap(), vec![10.0, 2.0, 3.0]);
    }

    #[test]
    fn views_go_stale_when_materialized_is_dropped() {
        let views = {
            let mut m = xy().materialize(&["x"]).unwrap();
            m.as_foreign().unwrap()
        };
        assert!(matches!(
            views["x"].get_f64(0),
            Err(AdoptError::StaleBuffer { released: true, .. })
        ));
    }

    #[test]
    fn interfaces_describe_each_column() {
        let m = xy().materialize(&["x", "y"]).unwrap();
        let ifaces = m.array_interfaces().unwrap();
        assert_eq!(ifaces["x"].typestr, ElementType::F64.typestr());
        assert_eq!(ifaces["y"].shape.as_slice(), &[3]);
        assert!(ifaces["x"].readonly);
    }

    #[test]
    fn typed_read_checks_kind() {
        let m = xy().materialize(&["y"]).unwrap();
        assert_eq!(
            m.get::<f64>("y"),
            Err(ColumnError::TypeMismatch {
                name: "y".into(),
                expected: ElementType::F64,
                found: ElementType::I32
            })
        );
        let t = m.into_table().unwrap();
        assert_eq!(t.len(), 3);
    }
}
