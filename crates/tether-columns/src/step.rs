//! Declarative filter and define steps, evaluated at materialization.

use std::fmt;
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use tether_core::{Element, ElementType};

use crate::column::{Column, ColumnData};
use crate::error::{ColumnError, StoreError};
use crate::materialize::Materialized;
use crate::store::{ColumnStore, SnapshotOptions};
use crate::table::ColumnTable;

type Predicate = Arc<dyn Fn(&Row<'_>) -> Result<bool, ColumnError> + Send + Sync>;
type Expression = Arc<dyn Fn(&Row<'_>) -> Result<f64, ColumnError> + Send + Sync>;

/// One declarative step.
#[derive(Clone)]
pub enum Step {
    /// Keep only rows for which the predicate holds.
    Filter {
        /// Human-readable description, used in logs.
        label: String,
        /// The row predicate.
        predicate: Predicate,
    },
    /// Add a computed column.
    Define {
        /// Name of the new column.
        name: String,
        /// Element type the computed values are stored as.
        element: ElementType,
        /// The value expression.
        expr: Expression,
    },
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Filter { label, .. } => f.debug_struct("Filter").field("label", label).finish(),
            Self::Define { name, element, .. } => f
                .debug_struct("Define")
                .field("name", name)
                .field("element", element)
                .finish(),
        }
    }
}

/// Read access to one row while steps are evaluated.
///
/// Sees the table's columns and every column defined by an earlier step.
pub struct Row<'a> {
    table: &'a ColumnTable,
    index: usize,
    defined: &'a [(&'a str, f64)],
}

impl Row<'_> {
    /// Position of the row in the source table.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Value of `name` in this row, converted to `f64`.
    pub fn get_f64(&self, name: &str) -> Result<f64, ColumnError> {
        if let Some(&(_, v)) = self.defined.iter().find(|(n, _)| *n == name) {
            return Ok(v);
        }
        Ok(self.table.column(name)?.data().get_f64(self.index)?)
    }

    /// Value of `name` in this row, converted to `i64`.
    pub fn get_i64(&self, name: &str) -> Result<i64, ColumnError> {
        if let Some(&(_, v)) = self.defined.iter().find(|(n, _)| *n == name) {
            return Ok(v as i64);
        }
        Ok(self.table.column(name)?.data().get_i64(self.index)?)
    }
}

/// Steps evaluated over rows that survive every filter.
struct Evaluation {
    rows: Vec<usize>,
    defined: IndexMap<String, (ElementType, Vec<f64>)>,
}

/// A table plus a chain of declarative steps.
///
/// Nothing runs until [`Pipeline::materialize`], [`Pipeline::count`] or
/// [`Pipeline::snapshot`] is called. Steps run in the order they were
/// added, row by row.
///
/// Steps are opaque closures, so the column names they read are only
/// resolved when they run. A step never runs on a row an earlier filter
/// rejected, and never runs at all on an empty table; an unknown name in
/// such a step is not reported. Names passed to `materialize` are always
/// checked.
#[derive(Clone, Debug)]
pub struct Pipeline<'t> {
    table: &'t ColumnTable,
    steps: Vec<Step>,
}

fn normalize(element: ElementType, value: f64) -> f64 {
    for_kind!(element, T => T::from_f64(value).to_f64())
}

impl<'t> Pipeline<'t> {
    /// A pipeline with no steps.
    pub fn new(table: &'t ColumnTable) -> Self {
        Self {
            table,
            steps: Vec::new(),
        }
    }

    /// The steps added so far.
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Keep only rows for which `predicate` returns `true`.
    ///
    /// Errors from `predicate`, such as [`ColumnError::UnknownColumn`],
    /// surface on the first row it is evaluated for.
    pub fn filter<F>(mut self, label: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&Row<'_>) -> Result<bool, ColumnError> + Send + Sync + 'static,
    {
        self.steps.push(Step::Filter {
            label: label.into(),
            predicate: Arc::new(predicate),
        });
        self
    }

    /// Add a column `name` of kind `element` computed by `expr`.
    ///
    /// Values are converted to `element` with `as` semantics. The name
    /// must not clash with a table column or an earlier definition; that
    /// is checked before any row is evaluated. Errors from `expr` surface
    /// on the first row it is evaluated for.
    pub fn define<F>(mut self, name: impl Into<String>, element: ElementType, expr: F) -> Self
    where
        F: Fn(&Row<'_>) -> Result<f64, ColumnError> + Send + Sync + 'static,
    {
        self.steps.push(Step::Define {
            name: name.into(),
            element,
            expr: Arc::new(expr),
        });
        self
    }

    fn evaluate(&self) -> Result<Evaluation, ColumnError> {
        let mut defined: IndexMap<String, (ElementType, Vec<f64>)> = IndexMap::new();
        for step in &self.steps {
            if let Step::Define { name, element, .. } = step {
                if self.table.contains(name) || defined.contains_key(name) {
                    return Err(ColumnError::DuplicateColumn { name: name.clone() });
                }
                defined.insert(name.clone(), (*element, Vec::new()));
            }
        }

        let mut rows = Vec::new();
        let mut scratch: Vec<(&str, f64)> = Vec::with_capacity(defined.len());
        'rows: for index in 0..self.table.len() {
            scratch.clear();
            for step in &self.steps {
                let row = Row {
                    table: self.table,
                    index,
                    defined: &scratch,
                };
                match step {
                    Step::Filter { predicate, .. } => {
                        if !predicate(&row)? {
                            continue 'rows;
                        }
                    }
                    Step::Define { name, element, expr } => {
                        let value = normalize(*element, expr(&row)?);
                        scratch.push((name.as_str(), value));
                    }
                }
            }
            rows.push(index);
            for &(name, value) in &scratch {
                if let Some((_, values)) = defined.get_mut(name) {
                    values.push(value);
                }
            }
        }

        tracing::debug!(
            selected = rows.len(),
            total = self.table.len(),
            defines = defined.len(),
            "steps evaluated"
        );
        Ok(Evaluation { rows, defined })
    }

    /// Number of rows that pass every filter.
    pub fn count(&self) -> Result<usize, ColumnError> {
        Ok(self.evaluate()?.rows.len())
    }

    /// Run the steps and copy the requested columns into owned,
    /// contiguous storage.
    ///
    /// The result preserves the requested order. Requesting a name twice
    /// fails with [`ColumnError::DuplicateColumn`]; an unknown name fails
    /// with [`ColumnError::UnknownColumn`].
    pub fn materialize(&self, names: &[&str]) -> Result<Materialized, ColumnError> {
        let mut requested = IndexSet::with_capacity(names.len());
        for &name in names {
            if !requested.insert(name) {
                return Err(ColumnError::DuplicateColumn {
                    name: name.to_string(),
                });
            }
        }

        let evaluation = self.evaluate()?;
        let mut columns = Vec::with_capacity(names.len());
        for &name in names {
            let data = match evaluation.defined.get(name) {
                Some((element, values)) => ColumnData::from_f64s(*element, values),
                None => self.table.column(name)?.data().gather(&evaluation.rows)?,
            };
            columns.push(Column::new(name, data));
        }

        tracing::info!(
            rows = evaluation.rows.len(),
            source_rows = self.table.len(),
            columns = columns.len(),
            steps = self.steps.len(),
            "columns materialized"
        );
        Ok(Materialized::new(evaluation.rows.len(), columns))
    }

    /// Materialize `names`, write them to `store` as `tree`, and read the
    /// tree back.
    pub fn snapshot<S: ColumnStore + ?Sized>(
        &self,
        store: &mut S,
        tree: &str,
        names: &[&str],
        options: &SnapshotOptions,
    ) -> Result<ColumnTable, StoreError> {
        options.validate()?;
        let materialized = self.materialize(names)?;
        store.write(tree, &materialized, options)?;
        store.read(tree, &[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> ColumnTable {
        ColumnTable::from_columns([
            ("x", ColumnData::from(vec![1.0f64, 2.0, 3.0, 4.0])),
            ("n", ColumnData::from(vec![10i32, 20, 30, 40])),
        ])
        .unwrap()
    }

    #[test]
    fn filter_then_define() {
        let t = table();
        let m = t
            .filter("x > 1", |r| Ok(r.get_f64("x")? > 1.0))
            .define("twice", ElementType::I64, |r| Ok(2.0 * r.get_f64("n")?))
            .materialize(&["twice", "x"])
            .unwrap();
        assert_eq!(m.names().collect::<Vec<_>>(), ["twice", "x"]);
        assert_eq!(m.get::<i64>("twice").unwrap(), vec![40, 60, 80]);
        assert_eq!(m.get::<f64>("x").unwrap(), vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn defines_see_earlier_defines_and_filters_see_defines() {
        let t = table();
        let p = t
            .define("half", ElementType::F32, |r| Ok(r.get_f64("x")? / 2.0))
            .define("flag", ElementType::U8, |r| Ok(if r.get_f64("half")? >= 1.0 { 1.0 } else { 0.0 }))
            .filter("flag", |r| Ok(r.get_i64("flag")? == 1));
        assert_eq!(p.count().unwrap(), 3);
        let m = p.materialize(&["half"]).unwrap();
        assert_eq!(m.get::<f32>("half").unwrap(), vec![1.0, 1.5, 2.0]);
    }

    #[test]
    fn define_values_take_the_declared_kind() {
        let t = table();
        let m = t
            .define("frac", ElementType::I16, |r| Ok(r.get_f64("x")? + 0.75))
            .materialize(&["frac"])
            .unwrap();
        assert_eq!(m.get::<i16>("frac").unwrap(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn unknown_names_are_reported() {
        let t = table();
        assert_eq!(
            t.filter("bad", |r| Ok(r.get_f64("nope")? > 0.0)).count(),
            Err(ColumnError::UnknownColumn { name: "nope".into() })
        );
        assert!(matches!(
            t.materialize(&["x", "nope"]),
            Err(ColumnError::UnknownColumn { .. })
        ));
    }

    #[test]
    fn step_names_resolve_only_on_evaluated_rows() {
        let bad = |t: &ColumnTable| {
            t.filter("bad", |r| Ok(r.get_f64("nope")? > 0.0))
                .materialize(&["x"])
                .map(|m| m.len())
        };
        let empty = ColumnTable::from_columns([("x", Vec::<f64>::new())]).unwrap();
        assert_eq!(bad(&empty), Ok(0));
        assert_eq!(bad(&table()), Err(ColumnError::UnknownColumn { name: "nope".into() }));

        let rejected = table()
            .filter("none", |_| Ok(false))
            .define("y", ElementType::F64, |r| r.get_f64("nope"))
            .count();
        assert_eq!(rejected, Ok(0));

        assert!(matches!(
            empty.define("x", ElementType::F64, |_| Ok(0.0)).count(),
            Err(ColumnError::DuplicateColumn { .. })
        ));
        assert!(matches!(
            empty.materialize(&["nope"]),
            Err(ColumnError::UnknownColumn { .. })
        ));
    }

    #[test]
    fn duplicate_definitions_and_requests_are_rejected() {
        let t = table();
        assert!(matches!(
            t.define("x", ElementType::F64, |_| Ok(0.0)).count(),
            Err(ColumnError::DuplicateColumn { .. })
        ));
        assert!(matches!(
            t.materialize(&["x", "x"]),
            Err(ColumnError::DuplicateColumn { .. })
        ));
    }

    #[test]
    fn row_index_is_source_position() {
        let t = table();
        let m = t
            .filter("odd rows", |r| Ok(r.index() % 2 == 1))
            .define("i", ElementType::U64, |r| Ok(r.index() as f64))
            .materialize(&["i"])
            .unwrap();
        assert_eq!(m.get::<u64>("i").unwrap(), vec![1, 3]);
    }

    #[test]
    fn empty_request_keeps_row_count() {
        let t = table();
        let m = t.filter("all", |_| Ok(true)).materialize(&[]).unwrap();
        assert_eq!(m.len(), 4);
        assert_eq!(m.num_columns(), 0);
    }
}
