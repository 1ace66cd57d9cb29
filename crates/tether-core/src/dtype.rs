//! Scalar element types and their array-interface type strings.
//!
//! The mapping between [`ElementType`] and type strings is total and
//! bijective over the ten fixed-width numeric kinds. Anything else
//! (objects, strings, booleans, complex, datetimes, opposite-endian data)
//! is rejected with [`AdoptError::UnsupportedElementType`].

use std::fmt;

use crate::error::AdoptError;

/// A scalar numeric kind that can cross an adoption boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ElementType {
    /// Signed 8-bit integer.
    I8,
    /// Signed 16-bit integer.
    I16,
    /// Signed 32-bit integer.
    I32,
    /// Signed 64-bit integer.
    I64,
    /// Unsigned 8-bit integer.
    U8,
    /// Unsigned 16-bit integer.
    U16,
    /// Unsigned 32-bit integer.
    U32,
    /// Unsigned 64-bit integer.
    U64,
    /// IEEE-754 binary32.
    F32,
    /// IEEE-754 binary64.
    F64,
}

impl ElementType {
    /// Every supported kind, in code order.
    pub const ALL: [ElementType; 10] = [
        Self::I8,
        Self::I16,
        Self::I32,
        Self::I64,
        Self::U8,
        Self::U16,
        Self::U32,
        Self::U64,
        Self::F32,
        Self::F64,
    ];

    /// Size of one element in bytes.
    pub fn itemsize(self) -> usize {
        match self {
            Self::I8 | Self::U8 => 1,
            Self::I16 | Self::U16 => 2,
            Self::I32 | Self::U32 | Self::F32 => 4,
            Self::I64 | Self::U64 | Self::F64 => 8,
        }
    }

    /// Array-interface kind character (`i`, `u`, or `f`).
    pub fn kind(self) -> char {
        match self {
            Self::I8 | Self::I16 | Self::I32 | Self::I64 => 'i',
            Self::U8 | Self::U16 | Self::U32 | Self::U64 => 'u',
            Self::F32 | Self::F64 => 'f',
        }
    }

    /// Whether this is a floating-point kind.
    pub fn is_float(self) -> bool {
        self.kind() == 'f'
    }

    /// Whether this is a signed integer kind.
    pub fn is_signed_int(self) -> bool {
        self.kind() == 'i'
    }

    /// Array-interface type string in host byte order, e.g. `"<f8"`.
    ///
    /// Single-byte kinds use the `|` (not applicable) order marker.
    pub fn typestr(self) -> String {
        let order = if self.itemsize() == 1 {
            '|'
        } else if cfg!(target_endian = "little") {
            '<'
        } else {
            '>'
        };
        format!("{order}{}{}", self.kind(), self.itemsize())
    }

    /// Parse an array-interface type string.
    ///
    /// Accepts `<`, `=`, and `|` order markers (and `>` on big-endian
    /// hosts). Rejects every kind outside `i`, `u`, `f` and every size
    /// that does not name one of the supported kinds.
    pub fn from_typestr(typestr: &str) -> Result<Self, AdoptError> {
        let unsupported = || AdoptError::unsupported(typestr);
        let mut chars = typestr.chars();
        let order = chars.next().ok_or_else(unsupported)?;
        let kind = chars.next().ok_or_else(unsupported)?;
        let size: usize = chars.as_str().parse().map_err(|_| unsupported())?;

        let host_order = if cfg!(target_endian = "little") { '<' } else { '>' };
        let order_ok = match order {
            '=' | '|' => true,
            o if o == host_order => true,
            '<' | '>' => size == 1,
            _ => false,
        };
        if !order_ok {
            return Err(unsupported());
        }

        let ty = match (kind, size) {
            ('i', 1) => Self::I8,
            ('i', 2) => Self::I16,
            ('i', 4) => Self::I32,
            ('i', 8) => Self::I64,
            ('u', 1) => Self::U8,
            ('u', 2) => Self::U16,
            ('u', 4) => Self::U32,
            ('u', 8) => Self::U64,
            ('f', 4) => Self::F32,
            ('f', 8) => Self::F64,
            _ => return Err(unsupported()),
        };
        Ok(ty)
    }

    /// Stable numeric code used at the C boundary and in column pages.
    pub fn code(self) -> u8 {
        match self {
            Self::I8 => 0,
            Self::I16 => 1,
            Self::I32 => 2,
            Self::I64 => 3,
            Self::U8 => 4,
            Self::U16 => 5,
            Self::U32 => 6,
            Self::U64 => 7,
            Self::F32 => 8,
            Self::F64 => 9,
        }
    }

    /// Inverse of [`ElementType::code`].
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }

    /// Human-readable numpy-style name, e.g. `"float64"`.
    pub fn name(self) -> &'static str {
        match self {
            Self::I8 => "int8",
            Self::I16 => "int16",
            Self::I32 => "int32",
            Self::I64 => "int64",
            Self::U8 => "uint8",
            Self::U16 => "uint16",
            Self::U32 => "uint32",
            Self::U64 => "uint64",
            Self::F32 => "float32",
            Self::F64 => "float64",
        }
    }

    /// Parse a numpy-style name as produced by [`ElementType::name`].
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

mod sealed {
    pub trait Sealed {}
}

/// A Rust scalar type with a fixed [`ElementType`].
///
/// Sealed: implemented for the ten fixed-width integer and float types and
/// nothing else, so every `Element` is plain old data of the stated width.
pub trait Element:
    sealed::Sealed + Copy + PartialEq + PartialOrd + Default + fmt::Debug + Send + Sync + 'static
{
    /// The element kind this type maps to.
    const TYPE: ElementType;

    /// Lossy numeric conversion to `f64` (`as` semantics).
    fn to_f64(self) -> f64;

    /// Lossy numeric conversion from `f64` (`as` semantics, saturating).
    fn from_f64(v: f64) -> Self;

    /// Lossy numeric conversion to `i64` (`as` semantics).
    fn to_i64(self) -> i64;

    /// Lossy numeric conversion from `i64` (`as` semantics).
    fn from_i64(v: i64) -> Self;

    /// Append the little-endian encoding of `self` to `out`.
    fn write_le(self, out: &mut Vec<u8>);

    /// Decode from the first `size_of::<Self>()` bytes of `bytes`.
    ///
    /// Returns `None` if `bytes` is too short.
    fn read_le(bytes: &[u8]) -> Option<Self>;
}

macro_rules! impl_element {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(
            impl sealed::Sealed for $t {}

            impl Element for $t {
                const TYPE: ElementType = ElementType::$variant;

                #[inline]
                fn to_f64(self) -> f64 {
                    self as f64
                }

                #[inline]
                fn from_f64(v: f64) -> Self {
                    v as $t
                }

                #[inline]
                fn to_i64(self) -> i64 {
                    self as i64
                }

                #[inline]
                fn from_i64(v: i64) -> Self {
                    v as $t
                }

                #[inline]
                fn write_le(self, out: &mut Vec<u8>) {
                    out.extend_from_slice(&self.to_le_bytes());
                }

                #[inline]
                fn read_le(bytes: &[u8]) -> Option<Self> {
                    const N: usize = std::mem::size_of::<$t>();
                    let raw: [u8; N] = bytes.get(..N)?.try_into().ok()?;
                    Some(<$t>::from_le_bytes(raw))
                }
            }
        )*
    };
}

impl_element! {
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typestr_round_trip_is_total() {
        for ty in ElementType::ALL {
            let s = ty.typestr();
            assert_eq!(ElementType::from_typestr(&s), Ok(ty), "{s}");
        }
    }

    #[test]
    fn code_round_trip_is_total() {
        for ty in ElementType::ALL {
            assert_eq!(ElementType::from_code(ty.code()), Some(ty));
        }
        assert_eq!(ElementType::from_code(10), None);
    }

    #[test]
    fn name_round_trip() {
        for ty in ElementType::ALL {
            assert_eq!(ElementType::from_name(ty.name()), Some(ty));
        }
        assert_eq!(ElementType::from_name("object"), None);
    }

    #[test]
    fn element_sizes_match_rust_types() {
        assert_eq!(i8::TYPE.itemsize(), std::mem::size_of::<i8>());
        assert_eq!(u16::TYPE.itemsize(), std::mem::size_of::<u16>());
        assert_eq!(i32::TYPE.itemsize(), std::mem::size_of::<i32>());
        assert_eq!(u64::TYPE.itemsize(), std::mem::size_of::<u64>());
        assert_eq!(f32::TYPE.itemsize(), std::mem::size_of::<f32>());
        assert_eq!(f64::TYPE.itemsize(), std::mem::size_of::<f64>());
    }

    #[test]
    fn accepts_native_and_not_applicable_markers() {
        assert_eq!(ElementType::from_typestr("=f8"), Ok(ElementType::F64));
        assert_eq!(ElementType::from_typestr("|u1"), Ok(ElementType::U8));
        assert_eq!(ElementType::from_typestr("<i1"), Ok(ElementType::I8));
    }

    #[cfg(target_endian = "little")]
    #[test]
    fn rejects_big_endian_multibyte() {
        assert!(matches!(
            ElementType::from_typestr(">f8"),
            Err(AdoptError::UnsupportedElementType { .. })
        ));
        assert_eq!(ElementType::from_typestr(">i1"), Ok(ElementType::I8));
    }

    #[test]
    fn rejects_non_numeric_kinds() {
        for s in ["|O", "<U8", "|b1", "<c16", "<M8", "|V16", "|S4", "<f2", "<i3", "", "<", "<f"] {
            assert!(
                matches!(
                    ElementType::from_typestr(s),
                    Err(AdoptError::UnsupportedElementType { .. })
                ),
                "{s} should be rejected"
            );
        }
    }

    #[test]
    fn little_endian_codec_is_bit_exact() {
        let mut buf = Vec::new();
        f64::NAN.write_le(&mut buf);
        (-0.0f32).write_le(&mut buf);
        u64::MAX.write_le(&mut buf);
        assert_eq!(f64::read_le(&buf).map(f64::to_bits), Some(f64::NAN.to_bits()));
        assert_eq!(
            f32::read_le(&buf[8..]).map(f32::to_bits),
            Some((-0.0f32).to_bits())
        );
        assert_eq!(u64::read_le(&buf[12..]), Some(u64::MAX));
        assert_eq!(u64::read_le(&buf[13..]), None);
    }

    #[cfg(not(miri))]
    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn arbitrary_typestr_never_panics(s in "\\PC{0,6}") {
                let _ = ElementType::from_typestr(&s);
            }

            #[test]
            fn i64_le_round_trip(v in any::<i64>()) {
                let mut buf = Vec::new();
                v.write_le(&mut buf);
                prop_assert_eq!(i64::read_le(&buf), Some(v));
            }
        }
    }
}
