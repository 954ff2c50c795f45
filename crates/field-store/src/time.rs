//! Validity time of stored fields.
//!
//! The validity time filter is computed from a field's origin, step length
//! and step count by an injectable function. The default reads the origin
//! as Unix seconds and the step length as seconds.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::header::FieldHeader;

/// `(origin, step_length, step_count) -> validity time`.
pub type ValidityFn = Arc<dyn Fn(i32, i32, i32) -> i64 + Send + Sync>;

/// Origin plus `deet * npas` seconds.
pub fn unix_validity(dateo: i32, deet: i32, npas: i32) -> i64 {
    i64::from(dateo) + i64::from(deet) * i64::from(npas)
}

/// The validity function used when a session is not given one.
pub fn default_validity() -> ValidityFn {
    Arc::new(unix_validity)
}

/// Origin stamp for a timestamp, if it fits the header's 32-bit field.
pub fn stamp_from_datetime(origin: DateTime<Utc>) -> Option<i32> {
    i32::try_from(origin.timestamp()).ok()
}

/// Timestamp for a stamp produced by [`unix_validity`].
pub fn datetime_from_stamp(stamp: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(stamp, 0)
}

/// Validity time of a field under the default interpretation.
pub fn valid_datetime(header: &FieldHeader) -> Option<DateTime<Utc>> {
    datetime_from_stamp(unix_validity(header.dateo, header.deet, header.npas))
}
