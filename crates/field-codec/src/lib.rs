//! Lossless compression for floating-point field payloads.
//!
//! The codec predicts every value from the history of values already seen
//! and stores only the XOR residual against that prediction, at nibble
//! granularity. Smooth gridded data (temperatures, pressures, heights)
//! usually leaves the high-order residual nibbles empty.
//!
//! # Example
//!
//! ```
//! use field_codec::{compress, decompress};
//!
//! let ramp: Vec<f32> = (0..1000).map(|i| 250.0 + i as f32 * 0.05).collect();
//! let packed = compress(&ramp).expect("smooth data compresses");
//! assert!(packed.len() < ramp.len() * 4);
//!
//! let restored: Vec<f32> = decompress(&packed, ramp.len()).unwrap();
//! assert_eq!(ramp, restored);
//! ```
//!
//! The compressed stream is not self-describing: keep the value count and
//! element width next to it.

pub mod codec;
pub mod error;
pub mod nibble;

pub use codec::{compress, compress_to_writer, decompress, decompress_into, CodecFloat, CONTEXT_BITS};
pub use error::{CodecError, Result};
pub use nibble::{NibbleReader, NibbleWriter};
