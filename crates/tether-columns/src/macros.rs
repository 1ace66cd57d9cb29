//! Dispatch over the ten scalar kinds.

/// Run `$body` with `$v` bound to the typed buffer inside a `ColumnData`.
macro_rules! each_column {
    ($data:expr, $v:ident => $body:expr) => {
        match $data {
            $crate::column::ColumnData::I8($v) => $body,
            $crate::column::ColumnData::I16($v) => $body,
            $crate::column::ColumnData::I32($v) => $body,
            $crate::column::ColumnData::I64($v) => $body,
            $crate::column::ColumnData::U8($v) => $body,
            $crate::column::ColumnData::U16($v) => $body,
            $crate::column::ColumnData::U32($v) => $body,
            $crate::column::ColumnData::U64($v) => $body,
            $crate::column::ColumnData::F32($v) => $body,
            $crate::column::ColumnData::F64($v) => $body,
        }
    };
}

/// Run `$body` with `$t` aliased to the Rust type of an `ElementType`.
macro_rules! for_kind {
    ($kind:expr, $t:ident => $body:expr) => {
        match $kind {
            tether_core::ElementType::I8 => {
                type $t = i8;
                $body
            }
            tether_core::ElementType::I16 => {
                type $t = i16;
                $body
            }
            tether_core::ElementType::I32 => {
                type $t = i32;
                $body
            }
            tether_core::ElementType::I64 => {
                type $t = i64;
                $body
            }
            tether_core::ElementType::U8 => {
                type $t = u8;
                $body
            }
            tether_core::ElementType::U16 => {
                type $t = u16;
                $body
            }
            tether_core::ElementType::U32 => {
                type $t = u32;
                $body
            }
            tether_core::ElementType::U64 => {
                type $t = u64;
                $body
            }
            tether_core::ElementType::F32 => {
                type $t = f32;
                $body
            }
            tether_core::ElementType::F64 => {
                type $t = f64;
                $body
            }
        }
    };
}
