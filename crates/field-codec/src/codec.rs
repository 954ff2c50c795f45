//! History-predictive float compression.
//!
//! Values are handled purely as raw bit patterns. A table of
//! `1 << CONTEXT_BITS` contexts remembers the last two deltas (difference of
//! consecutive raw words) routed to each context; the context id is a rolling
//! hash of the coarse bits of the most recent deltas. Each value is predicted
//! from the previous value plus the context's last delta, optionally extended
//! by the delta trend, and the XOR residual is written as a leading-zero
//! nibble count followed by the significant nibbles.
//!
//! Encoder and decoder evolve identical state, so nothing but the residual
//! stream is stored. The stream carries no length: callers keep the value
//! count alongside it.

use std::io::Write;
use std::marker::PhantomData;

use tracing::debug;

use crate::error::{CodecError, Result};
use crate::nibble::{NibbleReader, NibbleWriter};

/// log2 of the number of prediction contexts.
pub const CONTEXT_BITS: u32 = 20;

const CONTEXT_MASK: u64 = (1 << CONTEXT_BITS) - 1;

/// Each hash step shifts older deltas out; after three steps a coarse value
/// has left the 20-bit window.
const HASH_SHIFT: u32 = 7;

/// Code reserved for an all-zero residual (no trailing nibbles).
const ZERO_RESIDUAL: u8 = 15;

/// Largest leading-zero count that is written as-is. A 64-bit residual with
/// fifteen leading zero nibbles is written as fourteen plus two nibbles.
const MAX_LEADING: u32 = 14;

/// A float type the codec can process through its raw bit pattern.
pub trait CodecFloat: Copy {
    /// Width of the raw word in bits.
    const BITS: u32;
    /// Leading bits of a delta that select its context: sign, exponent and
    /// three mantissa bits.
    const COARSE_BITS: u32;
    /// Width of one value in bytes.
    const BYTES: usize = (Self::BITS / 8) as usize;

    fn to_word(self) -> u64;
    fn from_word(word: u64) -> Self;
}

impl CodecFloat for f32 {
    const BITS: u32 = 32;
    const COARSE_BITS: u32 = 12;

    fn to_word(self) -> u64 {
        u64::from(self.to_bits())
    }

    fn from_word(word: u64) -> Self {
        f32::from_bits(word as u32)
    }
}

impl CodecFloat for f64 {
    const BITS: u32 = 64;
    const COARSE_BITS: u32 = 15;

    fn to_word(self) -> u64 {
        self.to_bits()
    }

    fn from_word(word: u64) -> Self {
        f64::from_bits(word)
    }
}

/// Shared encoder/decoder state for one call.
struct Predictor<F: CodecFloat> {
    table: Vec<[u64; 2]>,
    context: usize,
    previous: u64,
    mask: u64,
    _float: PhantomData<F>,
}

impl<F: CodecFloat> Predictor<F> {
    fn new() -> Self {
        let mask = if F::BITS == 64 {
            u64::MAX
        } else {
            (1u64 << F::BITS) - 1
        };
        Self {
            table: vec![[0u64; 2]; 1 << CONTEXT_BITS],
            context: 0,
            previous: 0,
            mask,
            _float: PhantomData,
        }
    }

    fn coarse(delta: u64) -> u64 {
        delta >> (F::BITS - F::COARSE_BITS)
    }

    fn predict(&self) -> u64 {
        let [d0, d1] = self.table[self.context];
        let mut prediction = self.previous.wrapping_add(d0) & self.mask;
        if Self::coarse(d0) == Self::coarse(d1) {
            prediction = prediction.wrapping_add(d0.wrapping_sub(d1)) & self.mask;
        }
        prediction
    }

    fn update(&mut self, actual: u64) {
        let delta = actual.wrapping_sub(self.previous) & self.mask;
        let slot = &mut self.table[self.context];
        *slot = [delta, slot[0]];
        self.context =
            ((((self.context as u64) << HASH_SHIFT) ^ Self::coarse(delta)) & CONTEXT_MASK) as usize;
        self.previous = actual;
    }
}

fn nibbles_per_value<F: CodecFloat>() -> u32 {
    F::BITS / 4
}

fn encode_value<F: CodecFloat, W: Write>(
    writer: &mut NibbleWriter<W>,
    predictor: &mut Predictor<F>,
    actual: u64,
) -> std::io::Result<()> {
    let residual = predictor.predict() ^ actual;
    if residual == 0 {
        writer.push(ZERO_RESIDUAL)?;
    } else {
        let leading_bits = residual.leading_zeros() - (64 - F::BITS);
        let leading = (leading_bits / 4).min(MAX_LEADING);
        writer.push(leading as u8)?;
        writer.push_word(residual, nibbles_per_value::<F>() - leading)?;
    }
    predictor.update(actual);
    Ok(())
}

/// Compress `values`, or return `None` when the result would not be smaller
/// than the raw representation. Callers store the raw bytes in that case.
pub fn compress<F: CodecFloat>(values: &[F]) -> Option<Vec<u8>> {
    let raw_len = values.len() * F::BYTES;
    let mut writer = NibbleWriter::new(Vec::with_capacity(raw_len));
    let mut predictor = Predictor::<F>::new();

    for &value in values {
        encode_value(&mut writer, &mut predictor, value.to_word()).ok()?;
        if writer.len() >= raw_len {
            debug!(
                values = values.len(),
                raw_bytes = raw_len,
                "compression does not shrink payload"
            );
            return None;
        }
    }

    let compressed = writer.finish().ok()?;
    (compressed.len() < raw_len).then_some(compressed)
}

/// Compress `values` straight into `sink` without any size check.
///
/// Returns the number of bytes written.
pub fn compress_to_writer<F: CodecFloat, W: Write>(values: &[F], sink: W) -> Result<usize> {
    let mut writer = NibbleWriter::new(sink);
    let mut predictor = Predictor::<F>::new();
    for &value in values {
        encode_value(&mut writer, &mut predictor, value.to_word())?;
    }
    let written = writer.len();
    writer.finish()?;
    Ok(written)
}

/// Decompress exactly `count` values from `data`.
pub fn decompress<F: CodecFloat>(data: &[u8], count: usize) -> Result<Vec<F>> {
    let mut values = Vec::with_capacity(count);
    decode_each::<F>(data, count, |value| values.push(value))?;
    Ok(values)
}

/// Decompress `out.len()` values from `data` into a caller-provided buffer.
pub fn decompress_into<F: CodecFloat>(data: &[u8], out: &mut [F]) -> Result<()> {
    let count = out.len();
    let mut slots = out.iter_mut();
    decode_each::<F>(data, count, |value| {
        if let Some(slot) = slots.next() {
            *slot = value;
        }
    })
}

fn decode_each<F: CodecFloat>(data: &[u8], count: usize, mut emit: impl FnMut(F)) -> Result<()> {
    let mut reader = NibbleReader::new(data);
    let mut predictor = Predictor::<F>::new();
    let width = nibbles_per_value::<F>();

    for decoded in 0..count {
        let code = reader.next_nibble().ok_or(CodecError::Truncated {
            decoded,
            expected: count,
        })?;
        let residual = if code == ZERO_RESIDUAL {
            0
        } else if u32::from(code) < width {
            reader.read_word(width - u32::from(code), decoded, count)?
        } else {
            return Err(CodecError::InvalidCode {
                code,
                index: decoded,
            });
        };

        let actual = predictor.predict() ^ residual;
        predictor.update(actual);
        emit(F::from_word(actual));
    }

    Ok(())
}
