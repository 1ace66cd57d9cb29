//! End-to-end properties of the adoption protocol across every crate.

use tether::bridge::{sum_doubles, RawParts};
use tether::prelude::*;
use tether::types::RecordLayout;
use tether_test_utils::{
    boundary_values, xy_table, Boundary, ReadOnlySource, RelocatingSource, XY_X, XY_Y,
};

// ── Helpers ─────────────────────────────────────────────────────

fn bits<T: Boundary>(values: &[T]) -> Vec<u64> {
    values.iter().map(|v| v.bits()).collect()
}

/// Native → interface record → adopted view → values, for one type.
fn interface_round_trip<T: Boundary>() {
    let values = boundary_values::<T>();
    let mut v = NativeVec::from_vec(values.clone());
    let iface = ArrayInterface::from_descriptor(&v.export_buffer_mut().unwrap());
    assert_eq!(ElementType::from_typestr(&iface.typestr).unwrap(), T::TYPE);
    assert_eq!(iface.shape.as_slice(), &[values.len()]);

    // SAFETY: `v` is alive and unchanged while the view is used.
    let view = unsafe { tether::foreign::adopt_interface(&iface) }.unwrap();
    assert_eq!(view.element_type(), T::TYPE);
    let back = view.typed::<T>().unwrap().to_vec().unwrap();
    assert_eq!(bits(&back), bits(&values), "{} via interface", T::TYPE);
}

/// Foreign array → fixed native wrapper → values, for one type.
fn foreign_round_trip<T: Boundary>() {
    let values = boundary_values::<T>();
    let mut a = ForeignArray::from_vec(values.clone());
    let slice = ExternalSlice::<T>::adopt(&a.export_buffer_mut().unwrap()).unwrap();
    assert_eq!(bits(&slice.to_vec().unwrap()), bits(&values), "{} via slice", T::TYPE);
    assert_eq!(bits(&a.to_vec::<T>().unwrap()), bits(&values));
}

fn type_round_trip<T: Boundary>() {
    interface_round_trip::<T>();
    foreign_round_trip::<T>();
}

// ── Native → foreign ────────────────────────────────────────────

#[test]
fn writes_through_view_are_visible_in_container() {
    let mut v = NativeVec::from_vec(vec![0i64; 8]);
    let mut view = adopt::<i64>(&v.export_buffer_mut().unwrap()).unwrap();
    for i in 0..view.len() {
        view.set(i, i as i64 * 10).unwrap();
    }
    assert_eq!(v.to_vec(), (0..8).map(|i| i * 10).collect::<Vec<_>>());

    v.set(3, -1).unwrap();
    assert_eq!(view.get(3).unwrap(), -1);
}

#[test]
fn growth_invalidates_outstanding_views() {
    let mut v = NativeVec::from_vec(vec![1.0f32, 2.0]);
    let view = adopt::<f32>(&v.export_buffer_mut().unwrap()).unwrap();
    let before = v.generation();
    v.push(3.0);
    let err = view.get(0).unwrap_err();
    assert_eq!(
        err,
        AdoptError::StaleBuffer {
            adopted: before,
            current: v.generation(),
            released: false,
        }
    );
    assert!(view.is_stale());

    // A fresh export sees the new size.
    let fresh = adopt::<f32>(&v.export_buffer().unwrap()).unwrap();
    assert_eq!(fresh.to_vec().unwrap(), vec![1.0, 2.0, 3.0]);
}

#[test]
fn dropping_the_container_releases_views() {
    let mut v = NativeVec::from_vec(vec![7u16; 4]);
    let mut view = adopt::<u16>(&v.export_buffer_mut().unwrap()).unwrap();
    drop(v);
    assert!(matches!(
        view.set(0, 1),
        Err(AdoptError::StaleBuffer { released: true, .. })
    ));
}

#[test]
fn relocated_source_reports_released_allocation() {
    let mut s = RelocatingSource::new(vec![1i32, 2, 3]);
    let parts = RawParts::<i32>::from_source(&s).unwrap();
    s.relocate();
    assert!(matches!(
        parts.check_fresh(),
        Err(AdoptError::StaleBuffer { released: true, .. })
    ));
    assert_eq!(adopt_source::<i32, _>(&s).unwrap().to_vec().unwrap(), vec![1, 2, 3]);
}

// ── Foreign → native ────────────────────────────────────────────

#[test]
fn foreign_records_expose_field_views() {
    let layout = RecordLayout::packed(&[("id", ElementType::U32), ("score", ElementType::F64)]).unwrap();
    let mut a = ForeignArray::from_records(layout, [[1.0, 0.5], [2.0, 1.5]]).unwrap();
    let records = adopt_records(&a.export_buffer_mut().unwrap()).unwrap();
    assert_eq!(records.field_names().collect::<Vec<_>>(), ["id", "score"]);

    let mut score = records.field::<f64>("score").unwrap();
    assert_eq!(score.to_vec().unwrap(), vec![0.5, 1.5]);
    score.set(1, 9.0).unwrap();
    let ids = records.field::<u32>("id").unwrap();
    assert_eq!(ids.to_vec().unwrap(), vec![1, 2]);
    assert_eq!(records.field::<f64>("score").unwrap().get(1).unwrap(), 9.0);
}

#[test]
fn bridge_sums_native_and_foreign_sources_alike() {
    let v = NativeVec::from_vec(vec![1.0f64, 2.0, 3.5]);
    let a = ForeignArray::from_vec(vec![1.0f64, 2.0, 3.5]);
    assert_eq!(sum_doubles(&v).unwrap(), 6.5);
    assert_eq!(sum_doubles(&a).unwrap(), 6.5);

    let ints = ForeignArray::from_vec(vec![1i32]);
    assert!(matches!(
        sum_doubles(&ints),
        Err(AdoptError::UnsupportedElementType { .. })
    ));
}

// ── Read-only ───────────────────────────────────────────────────

#[test]
fn read_only_descriptors_reject_writes() {
    let v = NativeVec::from_vec(vec![1u8, 2]);
    let mut view = adopt::<u8>(&v.export_buffer().unwrap()).unwrap();
    assert!(view.is_readonly());
    assert_eq!(view.set(0, 9), Err(AdoptError::ReadOnlyViolation));
    assert_eq!(v.to_vec(), vec![1, 2]);

    let mut slice = ExternalSlice::<u8>::adopt(&v.export_buffer().unwrap()).unwrap();
    assert_eq!(slice.set(0, 9), Err(AdoptError::ReadOnlyViolation));

    let mut parts = RawParts::<u8>::from_source(&v).unwrap();
    assert_eq!(parts.as_mut_ptr().unwrap_err(), AdoptError::ReadOnlyViolation);

    let mut a = ForeignArray::from_vec(vec![1.0f64]);
    a.set_readonly(true);
    assert_eq!(a.export_buffer_mut().unwrap_err(), AdoptError::ReadOnlyViolation);
    assert_eq!(a.set(&[0], 2.0f64), Err(AdoptError::ReadOnlyViolation));

    let mut src = ReadOnlySource::new(vec![5i16]);
    let mut view = adopt::<i16>(&src.export_buffer_mut().unwrap()).unwrap();
    assert_eq!(view.set(0, 6), Err(AdoptError::ReadOnlyViolation));
    assert_eq!(src.values(), vec![5]);
}

// ── Type mapping ────────────────────────────────────────────────

#[test]
fn every_element_type_round_trips_bit_exact() {
    type_round_trip::<i8>();
    type_round_trip::<i16>();
    type_round_trip::<i32>();
    type_round_trip::<i64>();
    type_round_trip::<u8>();
    type_round_trip::<u16>();
    type_round_trip::<u32>();
    type_round_trip::<u64>();
    type_round_trip::<f32>();
    type_round_trip::<f64>();
}

#[test]
fn big_endian_typestrs_are_unsupported() {
    assert!(matches!(
        ElementType::from_typestr(">f8"),
        Err(AdoptError::UnsupportedElementType { .. })
    ));
    assert_eq!(ElementType::from_typestr("=i4").unwrap(), ElementType::I32);
}

// ── Columns ─────────────────────────────────────────────────────

#[test]
fn materialized_xy_is_writable_through_foreign_views_and_storable() {
    let table = xy_table();
    let mut m = table.materialize(&["x", "y"]).unwrap();
    {
        let mut views = m.as_foreign().unwrap();
        assert_eq!(views["x"].element_type(), ElementType::F64);
        assert_eq!(views["y"].element_type(), ElementType::I64);
        views["y"].set_f64(2, 60.0).unwrap();
    }
    assert_eq!(m.get::<f64>("x").unwrap(), XY_X.to_vec());
    assert_eq!(m.get::<i64>("y").unwrap(), vec![XY_Y[0], XY_Y[1], 60]);

    let mut store = MemoryStore::new();
    let stored = m.into_table().unwrap();
    let back = stored
        .snapshot(&mut store, "xy", &["y", "x"], &SnapshotOptions::default())
        .unwrap();
    assert_eq!(back.names().collect::<Vec<_>>(), ["y", "x"]);
    assert_eq!(store.read("xy", &["x"]).unwrap().len(), 3);
    assert_eq!(back.column("y").unwrap().data().get_i64(2).unwrap(), 60);
}

#[test]
fn table_over_a_dropped_foreign_array_goes_stale() {
    let x = ForeignArray::from_vec(vec![1.0f64, 2.0]);
    let table = ColumnTable::from_foreign([("x", &x)]).unwrap();
    assert_eq!(table.materialize(&["x"]).unwrap().get::<f64>("x").unwrap(), vec![1.0, 2.0]);
    drop(x);
    assert!(matches!(
        table.materialize(&["x"]),
        Err(ColumnError::Adopt(AdoptError::StaleBuffer { released: true, .. }))
    ));
}

// ── Property tests ──────────────────────────────────────────────

#[cfg(not(miri))]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn external_slice_writes_reach_every_foreign_index(
            values in prop::collection::vec(any::<i32>(), 1..64),
            delta in any::<i32>(),
        ) {
            let mut a = ForeignArray::from_vec(values.clone());
            let mut slice = ExternalSlice::<i32>::adopt(&a.export_buffer_mut().unwrap()).unwrap();
            for (i, v) in values.iter().enumerate() {
                slice.set(i, v.wrapping_add(delta)).unwrap();
            }
            for (i, v) in values.iter().enumerate() {
                prop_assert_eq!(a.get::<i32>(&[i]).unwrap(), v.wrapping_add(delta));
            }
        }

        #[test]
        fn any_size_change_stales_earlier_views(
            len in 0usize..32,
            new_len in 0usize..32,
        ) {
            prop_assume!(len != new_len);
            let mut v = NativeVec::from_vec(vec![0u64; len]);
            let desc = v.export_buffer_mut().unwrap();
            v.resize(new_len, 1);
            let stale = matches!(desc.check_fresh(), Err(AdoptError::StaleBuffer { released: false, .. }));
            prop_assert!(stale);
        }
    }
}
