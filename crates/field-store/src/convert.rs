//! Element encoding and numeric conversion between storage types.
//!
//! Payloads travel as little-endian bytes. Conversion decodes the source
//! elements, casts each with `as` semantics and re-encodes them; string and
//! binary payloads convert through their raw byte values.

use num_traits::AsPrimitive;

use crate::error::{Result, StoreError};
use crate::types::DataType;

/// A primitive that can be stored as a field element.
pub trait Element: bytemuck::Pod + Default + Send + Sync + 'static {
    /// Storage type of an uncompressed slice of this element.
    const DATA_TYPE: DataType;

    fn append_le(self, out: &mut Vec<u8>);

    /// Decode one element from exactly `size_of::<Self>()` bytes.
    fn from_le(bytes: &[u8]) -> Self;
}

macro_rules! impl_element {
    ($($ty:ty => $dtype:ident),* $(,)?) => {
        $(
            impl Element for $ty {
                const DATA_TYPE: DataType = DataType::$dtype;

                fn append_le(self, out: &mut Vec<u8>) {
                    out.extend_from_slice(&self.to_le_bytes());
                }

                fn from_le(bytes: &[u8]) -> Self {
                    let mut raw = [0u8; std::mem::size_of::<$ty>()];
                    raw.copy_from_slice(bytes);
                    <$ty>::from_le_bytes(raw)
                }
            }
        )*
    };
}

impl_element!(
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    u8 => UInt8,
    u16 => UInt16,
    u32 => UInt32,
    u64 => UInt64,
    f32 => Float32,
    f64 => Float64,
);

/// Little-endian byte image of `values`.
pub fn encode_le<T: Element>(values: &[T]) -> Vec<u8> {
    let mut out = Vec::with_capacity(std::mem::size_of_val(values));
    for &value in values {
        value.append_le(&mut out);
    }
    out
}

/// Decode little-endian elements. Trailing bytes that do not form a whole
/// element are ignored.
pub fn decode_le<T: Element>(bytes: &[u8]) -> Vec<T> {
    bytes
        .chunks_exact(std::mem::size_of::<T>())
        .map(T::from_le)
        .collect()
}

/// An element castable to every storage element type.
pub trait Castable:
    Element
    + AsPrimitive<i8>
    + AsPrimitive<i16>
    + AsPrimitive<i32>
    + AsPrimitive<i64>
    + AsPrimitive<u8>
    + AsPrimitive<u16>
    + AsPrimitive<u32>
    + AsPrimitive<u64>
    + AsPrimitive<f32>
    + AsPrimitive<f64>
{
}

impl<T> Castable for T where
    T: Element
        + AsPrimitive<i8>
        + AsPrimitive<i16>
        + AsPrimitive<i32>
        + AsPrimitive<i64>
        + AsPrimitive<u8>
        + AsPrimitive<u16>
        + AsPrimitive<u32>
        + AsPrimitive<u64>
        + AsPrimitive<f32>
        + AsPrimitive<f64>
{
}

/// Cast every element of `values` to `D`.
pub fn cast_values<S, D>(values: &[S]) -> Vec<D>
where
    S: AsPrimitive<D>,
    D: Copy + 'static,
{
    values.iter().map(|v| v.as_()).collect()
}

/// Convert a little-endian payload of `from` elements to `to` elements.
///
/// Compressed types convert as their decoded float type; `bytes` must
/// already be decoded.
pub fn convert(bytes: &[u8], from: DataType, to: DataType) -> Result<Vec<u8>> {
    let (source, target) = (from.decoded(), to.decoded());
    if source.element_size() == 0 || target.element_size() == 0 {
        return Err(StoreError::Conversion { from, to });
    }
    if byte_repr(source) == byte_repr(target) {
        return Ok(bytes.to_vec());
    }

    match source {
        DataType::Int8 => convert_from::<i8>(bytes, target),
        DataType::Int16 => convert_from::<i16>(bytes, target),
        DataType::Int32 => convert_from::<i32>(bytes, target),
        DataType::Int64 => convert_from::<i64>(bytes, target),
        DataType::String | DataType::Binary | DataType::UInt8 => {
            convert_from::<u8>(bytes, target)
        }
        DataType::UInt16 => convert_from::<u16>(bytes, target),
        DataType::UInt32 => convert_from::<u32>(bytes, target),
        DataType::UInt64 => convert_from::<u64>(bytes, target),
        DataType::Float32 => convert_from::<f32>(bytes, target),
        DataType::Float64 => convert_from::<f64>(bytes, target),
        _ => Err(StoreError::Conversion { from, to }),
    }
}

/// String and binary payloads share the `u8` representation.
fn byte_repr(dtype: DataType) -> DataType {
    match dtype {
        DataType::String | DataType::Binary => DataType::UInt8,
        other => other,
    }
}

fn convert_from<S: Castable>(bytes: &[u8], target: DataType) -> Result<Vec<u8>> {
    let values = decode_le::<S>(bytes);
    let converted = match target {
        DataType::Int8 => encode_le(&cast_values::<S, i8>(&values)),
        DataType::Int16 => encode_le(&cast_values::<S, i16>(&values)),
        DataType::Int32 => encode_le(&cast_values::<S, i32>(&values)),
        DataType::Int64 => encode_le(&cast_values::<S, i64>(&values)),
        DataType::String | DataType::Binary | DataType::UInt8 => {
            encode_le(&cast_values::<S, u8>(&values))
        }
        DataType::UInt16 => encode_le(&cast_values::<S, u16>(&values)),
        DataType::UInt32 => encode_le(&cast_values::<S, u32>(&values)),
        DataType::UInt64 => encode_le(&cast_values::<S, u64>(&values)),
        DataType::Float32 => encode_le(&cast_values::<S, f32>(&values)),
        DataType::Float64 => encode_le(&cast_values::<S, f64>(&values)),
        _ => {
            return Err(StoreError::Conversion {
                from: S::DATA_TYPE,
                to: target,
            })
        }
    };
    Ok(converted)
}
