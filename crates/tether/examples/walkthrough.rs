//! A tour of the adoption protocol.
//!
//! Run with `RUST_LOG=debug` to see generation bumps, stale adoptions, and
//! materialization events:
//!
//! ```text
//! RUST_LOG=debug cargo run -p tether --example walkthrough
//! ```

use std::error::Error;

use tether::bridge::sum_doubles;
use tether::prelude::*;
use tracing_subscriber::EnvFilter;

fn native_to_foreign() -> Result<(), Box<dyn Error>> {
    let mut v = NativeVec::from_vec(vec![1.0f64, 2.0, 3.0]);
    let mut view = adopt::<f64>(&v.export_buffer_mut()?)?;
    view.set(1, 20.0)?;
    tracing::info!(container = ?v.to_vec(), "write through view is visible");

    v.push(4.0);
    match view.get(0) {
        Err(err @ AdoptError::StaleBuffer { .. }) => {
            tracing::info!(%err, "view detected the resize");
        }
        other => tracing::warn!(?other, "expected a stale view"),
    }
    Ok(())
}

fn foreign_to_native() -> Result<(), Box<dyn Error>> {
    let mut a = ForeignArray::from_vec(vec![10i32, 20, 30]);
    let mut slice = ExternalSlice::<i32>::adopt(&a.export_buffer_mut()?)?;
    slice.fill(7)?;
    tracing::info!(array = ?a.to_vec::<i32>()?, "fill through wrapper is visible");

    let iface = a.array_interface()?;
    tracing::info!(
        data = format_args!("{:#x}", iface.data),
        typestr = %iface.typestr,
        shape = ?iface.shape.as_slice(),
        "array interface"
    );
    Ok(())
}

fn bridge() -> Result<(), Box<dyn Error>> {
    let a = ForeignArray::from_vec(vec![0.25f64; 8]);
    tracing::info!(sum = sum_doubles(&a)?, "bridge kernel over a foreign array");
    Ok(())
}

fn columns() -> Result<(), Box<dyn Error>> {
    let mut table = ColumnTable::new();
    table.insert("x", vec![1.0f64, 2.0, 3.0])?;
    table.insert("y", vec![4i64, 5, 6])?;

    let mut m = table
        .filter("y > 4", |row| Ok(row.get_i64("y")? > 4))
        .define("xy", ElementType::F64, |row| Ok(row.get_f64("x")? * row.get_f64("y")?))
        .materialize(&["x", "xy"])?;
    for (name, view) in m.as_foreign()? {
        tracing::info!(column = %name, values = ?view.to_f64_vec()?, "materialized");
    }

    let mut store = MemoryStore::new();
    let back = table.snapshot(&mut store, "xy", &["x", "y"], &SnapshotOptions::default())?;
    tracing::info!(trees = ?store.trees(), rows = back.len(), "snapshot read back");
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    native_to_foreign()?;
    foreign_to_native()?;
    bridge()?;
    columns()?;
    Ok(())
}
