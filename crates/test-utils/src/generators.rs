//! Test data generators for creating synthetic field payloads.
//!
//! These generators create predictable, verifiable test data patterns
//! that can be used across the test suite.

/// Creates a test grid with temperature-like values in Kelvin.
///
/// The values range from approximately 250K (-23C) to 310K (37C),
/// creating a gradient pattern similar to real weather data.
pub fn create_temperature_grid(width: usize, height: usize) -> Vec<f32> {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            // Create a gradient from cold (top-left) to warm (bottom-right)
            let x_factor = col as f32 / width.max(1) as f32;
            let y_factor = row as f32 / height.max(1) as f32;
            let temp = 250.0 + (x_factor * 30.0) + (y_factor * 30.0);
            data.push(temp);
        }
    }
    data
}

/// Same gradient as [`create_temperature_grid`] in double precision.
pub fn create_temperature_grid_f64(width: usize, height: usize) -> Vec<f64> {
    create_temperature_grid(width, height)
        .into_iter()
        .map(f64::from)
        .collect()
}

/// A monotonic ramp `start, start + step, start + 2*step, ...`.
pub fn create_ramp_f32(len: usize, start: f32, step: f32) -> Vec<f32> {
    (0..len).map(|i| start + i as f32 * step).collect()
}

/// A monotonic ramp in double precision.
pub fn create_ramp_f64(len: usize, start: f64, step: f64) -> Vec<f64> {
    (0..len).map(|i| start + i as f64 * step).collect()
}

/// Floats built from pseudo-random bit patterns.
///
/// Deterministic for a given seed. The result contains NaNs and infinities
/// as often as the bit patterns produce them.
pub fn create_noise_f32(len: usize, seed: u32) -> Vec<f32> {
    (0..len)
        .map(|i| f32::from_bits(simple_hash(i as u32, 0, seed)))
        .collect()
}

/// Double-precision floats built from pseudo-random bit patterns.
pub fn create_noise_f64(len: usize, seed: u32) -> Vec<f64> {
    (0..len)
        .map(|i| {
            let high = u64::from(simple_hash(i as u32, 1, seed));
            let low = u64::from(simple_hash(i as u32, 2, seed));
            f64::from_bits(high << 32 | low)
        })
        .collect()
}

/// Every special single-precision class: NaNs, infinities, signed zeros,
/// denormals and the finite extremes.
pub fn special_values_f32() -> Vec<f32> {
    vec![
        0.0,
        -0.0,
        f32::NAN,
        -f32::NAN,
        f32::from_bits(0x7FA0_0001), // signalling NaN payload
        f32::INFINITY,
        f32::NEG_INFINITY,
        f32::from_bits(1), // smallest denormal
        f32::MIN_POSITIVE / 3.0,
        -f32::from_bits(0x0000_FFFF),
        f32::MIN_POSITIVE,
        f32::EPSILON,
        f32::MAX,
        f32::MIN,
        1.0,
        -1.0,
    ]
}

/// Every special double-precision class.
pub fn special_values_f64() -> Vec<f64> {
    vec![
        0.0,
        -0.0,
        f64::NAN,
        -f64::NAN,
        f64::from_bits(0x7FF4_0000_0000_0001),
        f64::INFINITY,
        f64::NEG_INFINITY,
        f64::from_bits(1),
        f64::MIN_POSITIVE / 3.0,
        -f64::from_bits(0x000F_FFFF_FFFF),
        f64::MIN_POSITIVE,
        f64::EPSILON,
        f64::MAX,
        f64::MIN,
        1.0,
        -1.0,
    ]
}

/// Every `i16` value in ascending order.
pub fn all_i16_values() -> Vec<i16> {
    (i16::MIN..=i16::MAX).collect()
}

/// Creates a grid filled with a constant value.
pub fn create_constant_grid(width: usize, height: usize, value: f32) -> Vec<f32> {
    vec![value; width * height]
}

/// Creates a grid with NaN values at specified positions.
///
/// # Arguments
///
/// * `width` - Number of columns
/// * `height` - Number of rows
/// * `nan_positions` - List of (col, row) positions that should be NaN
pub fn create_grid_with_nans(
    width: usize,
    height: usize,
    nan_positions: &[(usize, usize)],
) -> Vec<f32> {
    let mut data = vec![0.0f32; width * height];
    for &(col, row) in nan_positions {
        if col < width && row < height {
            data[row * width + col] = f32::NAN;
        }
    }
    data
}

/// Little-endian byte image of a float slice, as stored on disk.
pub fn f32_le_bytes(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Simple deterministic hash for reproducible test data.
fn simple_hash(x: u32, y: u32, seed: u32) -> u32 {
    let mut h = seed;
    h = h.wrapping_mul(31).wrapping_add(x);
    h = h.wrapping_mul(31).wrapping_add(y);
    h ^= h >> 16;
    h = h.wrapping_mul(0x85ebca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2ae35);
    h ^= h >> 16;
    h
}
