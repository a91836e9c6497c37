//! Scalar conversions
//!
//! Managed primitives map onto native scalars with plain casts; unsigned
//! kinds reuse the signed primitive of the same width and reinterpret
//! the bits, the way `({owner})v` does in the generated C++.

// Unsigned kinds share the signed ANI primitive; the casts reinterpret bits.
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_wrap)]

use crate::abi::ScalarKind;
use crate::error::{AniError, AniResult};
use crate::value::{AniValue, NativeValue};

/// Convert a managed primitive to the native scalar of `kind`
pub fn scalar_from_ani(kind: ScalarKind, value: &AniValue) -> AniResult<NativeValue> {
    Ok(match (kind, value) {
        (ScalarKind::Bool, AniValue::Boolean(v)) => NativeValue::Bool(*v),
        (ScalarKind::F32, AniValue::Float(v)) => NativeValue::F32(*v),
        (ScalarKind::F64, AniValue::Double(v)) => NativeValue::F64(*v),
        (ScalarKind::I8, AniValue::Byte(v)) => NativeValue::I8(*v),
        (ScalarKind::U8, AniValue::Byte(v)) => NativeValue::U8(*v as u8),
        (ScalarKind::I16, AniValue::Short(v)) => NativeValue::I16(*v),
        (ScalarKind::U16, AniValue::Short(v)) => NativeValue::U16(*v as u16),
        (ScalarKind::I32, AniValue::Int(v)) => NativeValue::I32(*v),
        (ScalarKind::U32, AniValue::Int(v)) => NativeValue::U32(*v as u32),
        (ScalarKind::I64, AniValue::Long(v)) => NativeValue::I64(*v),
        (ScalarKind::U64, AniValue::Long(v)) => NativeValue::U64(*v as u64),
        _ => {
            return Err(AniError::type_error(format!(
                "cannot convert {} to {}",
                value.class_name(),
                kind
            )))
        }
    })
}

/// Convert a native scalar to its managed primitive
pub fn scalar_into_ani(value: &NativeValue) -> AniResult<AniValue> {
    Ok(match value {
        NativeValue::Bool(v) => AniValue::Boolean(*v),
        NativeValue::F32(v) => AniValue::Float(*v),
        NativeValue::F64(v) => AniValue::Double(*v),
        NativeValue::I8(v) => AniValue::Byte(*v),
        NativeValue::U8(v) => AniValue::Byte(*v as i8),
        NativeValue::I16(v) => AniValue::Short(*v),
        NativeValue::U16(v) => AniValue::Short(*v as i16),
        NativeValue::I32(v) => AniValue::Int(*v),
        NativeValue::U32(v) => AniValue::Int(*v as i32),
        NativeValue::I64(v) => AniValue::Long(*v),
        NativeValue::U64(v) => AniValue::Long(*v as i64),
        other => {
            return Err(AniError::type_error(format!(
                "{} is not a scalar",
                other.type_name()
            )))
        }
    })
}

/// Little-endian bytes of a scalar array, as `memcpy` lays them out
pub fn scalars_to_bytes(kind: ScalarKind, items: &[NativeValue]) -> AniResult<Vec<u8>> {
    let mut bytes = Vec::with_capacity(items.len() * kind.byte_width());
    for item in items {
        match (kind, item) {
            (ScalarKind::Bool, NativeValue::Bool(v)) => bytes.push(u8::from(*v)),
            (ScalarKind::F32, NativeValue::F32(v)) => bytes.extend_from_slice(&v.to_le_bytes()),
            (ScalarKind::F64, NativeValue::F64(v)) => bytes.extend_from_slice(&v.to_le_bytes()),
            (ScalarKind::I8, NativeValue::I8(v)) => bytes.extend_from_slice(&v.to_le_bytes()),
            (ScalarKind::U8, NativeValue::U8(v)) => bytes.push(*v),
            (ScalarKind::I16, NativeValue::I16(v)) => bytes.extend_from_slice(&v.to_le_bytes()),
            (ScalarKind::U16, NativeValue::U16(v)) => bytes.extend_from_slice(&v.to_le_bytes()),
            (ScalarKind::I32, NativeValue::I32(v)) => bytes.extend_from_slice(&v.to_le_bytes()),
            (ScalarKind::U32, NativeValue::U32(v)) => bytes.extend_from_slice(&v.to_le_bytes()),
            (ScalarKind::I64, NativeValue::I64(v)) => bytes.extend_from_slice(&v.to_le_bytes()),
            (ScalarKind::U64, NativeValue::U64(v)) => bytes.extend_from_slice(&v.to_le_bytes()),
            _ => {
                return Err(AniError::type_error(format!(
                    "expected {} item, got {}",
                    kind,
                    item.type_name()
                )))
            }
        }
    }
    Ok(bytes)
}

/// Read a scalar array back from little-endian bytes. Trailing bytes that
/// do not fill a whole element are ignored.
pub fn scalars_from_bytes(kind: ScalarKind, bytes: &[u8]) -> AniResult<Vec<NativeValue>> {
    let width = kind.byte_width();
    bytes
        .chunks_exact(width)
        .map(|chunk| decode_scalar(kind, chunk))
        .collect()
}

fn decode_scalar(kind: ScalarKind, chunk: &[u8]) -> AniResult<NativeValue> {
    fn fixed<const N: usize>(chunk: &[u8]) -> AniResult<[u8; N]> {
        chunk
            .try_into()
            .map_err(|_| AniError::type_error("truncated element"))
    }

    Ok(match kind {
        ScalarKind::Bool => NativeValue::Bool(chunk[0] != 0),
        ScalarKind::F32 => NativeValue::F32(f32::from_le_bytes(fixed(chunk)?)),
        ScalarKind::F64 => NativeValue::F64(f64::from_le_bytes(fixed(chunk)?)),
        ScalarKind::I8 => NativeValue::I8(i8::from_le_bytes(fixed(chunk)?)),
        ScalarKind::U8 => NativeValue::U8(chunk[0]),
        ScalarKind::I16 => NativeValue::I16(i16::from_le_bytes(fixed(chunk)?)),
        ScalarKind::U16 => NativeValue::U16(u16::from_le_bytes(fixed(chunk)?)),
        ScalarKind::I32 => NativeValue::I32(i32::from_le_bytes(fixed(chunk)?)),
        ScalarKind::U32 => NativeValue::U32(u32::from_le_bytes(fixed(chunk)?)),
        ScalarKind::I64 => NativeValue::I64(i64::from_le_bytes(fixed(chunk)?)),
        ScalarKind::U64 => NativeValue::U64(u64::from_le_bytes(fixed(chunk)?)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_from_ani() {
        assert_eq!(
            scalar_from_ani(ScalarKind::I32, &AniValue::Int(-7)).unwrap(),
            NativeValue::I32(-7)
        );
        assert_eq!(
            scalar_from_ani(ScalarKind::U8, &AniValue::Byte(-1)).unwrap(),
            NativeValue::U8(255)
        );
        assert!(scalar_from_ani(ScalarKind::I64, &AniValue::Int(1)).is_err());
    }

    #[test]
    fn test_unsigned_round_trip() {
        let value = NativeValue::U32(u32::MAX);
        let managed = scalar_into_ani(&value).unwrap();
        assert_eq!(managed, AniValue::Int(-1));
        assert_eq!(scalar_from_ani(ScalarKind::U32, &managed).unwrap(), value);
    }

    #[test]
    fn test_bytes() {
        let items = vec![NativeValue::I16(1), NativeValue::I16(-2)];
        let bytes = scalars_to_bytes(ScalarKind::I16, &items).unwrap();
        assert_eq!(bytes, vec![1, 0, 0xfe, 0xff]);
        assert_eq!(scalars_from_bytes(ScalarKind::I16, &bytes).unwrap(), items);
        assert!(scalars_to_bytes(ScalarKind::I16, &[NativeValue::I32(1)]).is_err());
    }
}
