//! Common test fixtures for field-store tests.
//!
//! Metadata values that show up across the suite, kept as plain constants so
//! this crate does not depend on the crates it helps test.

/// Variable names (4-character, space padded on disk).
pub mod names {
    /// Air temperature
    pub const TEMPERATURE: &str = "TT";
    /// Geopotential height
    pub const HEIGHT: &str = "GZ";
    /// Zonal wind
    pub const U_WIND: &str = "UU";
    /// Meridional wind
    pub const V_WIND: &str = "VV";
    /// Mean sea level pressure
    pub const PRESSURE: &str = "PN";
    /// Fills all four characters
    pub const FULL_WIDTH: &str = "HU2M";
}

/// Free labels (12-character on disk).
pub mod labels {
    pub const ANALYSIS: &str = "ANALYSE";
    pub const FORECAST: &str = "R1_V710_N";
    pub const FULL_WIDTH: &str = "GEPS_MEMB_01";
}

/// Level identifiers for the first integer tag.
pub mod levels {
    pub const SURFACE: i32 = 0;
    pub const HPA_1000: i32 = 1000;
    pub const HPA_850: i32 = 850;
    pub const HPA_500: i32 = 500;
    pub const HPA_250: i32 = 250;
}

/// Time metadata.
pub mod time {
    /// 2024-01-15T12:00:00Z as Unix seconds.
    pub const ORIGIN_2024_01_15_12Z: i32 = 1_705_320_000;

    /// One-hour model step in seconds.
    pub const HOURLY_STEP: i32 = 3600;

    /// Forecast step counts used by the suite.
    pub const STEPS: [i32; 5] = [0, 1, 6, 12, 48];
}

/// Small grid shapes (NI, NJ, NK).
pub mod shapes {
    pub const TINY: (i32, i32, i32) = (4, 3, 1);
    pub const SMALL: (i32, i32, i32) = (32, 16, 1);
    pub const COLUMN: (i32, i32, i32) = (1, 1, 80);
    pub const REGIONAL: (i32, i32, i32) = (200, 150, 1);

    /// Number of elements in a shape.
    pub const fn len(shape: (i32, i32, i32)) -> usize {
        (shape.0 * shape.1 * shape.2) as usize
    }
}
