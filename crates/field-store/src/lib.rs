//! Randomly-readable binary container for gridded fields.
//!
//! A container file holds a file header, the fields' data written back to
//! back, and a trailing index of fixed-size field headers. Sessions link one
//! or more files; fields are located by metadata filters and read through a
//! memory mapping when the session is read-only.
//!
//! Two storage types compress their float payloads with [`field_codec`].
//!
//! # Example
//!
//! ```no_run
//! use field_store::{DataType, FieldFilter, FieldMeta, FieldStore, OpenMode};
//!
//! # fn main() -> field_store::Result<()> {
//! let mut store = FieldStore::open(&["analysis.fst"], OpenMode::write_only())?;
//! let temps = vec![273.15f32; 64 * 32];
//! store.write(
//!     &temps,
//!     DataType::Float32Compressed,
//!     &FieldMeta::new("TT", (64, 32, 1)).with_level(850),
//! )?;
//! store.close()?;
//!
//! let store = FieldStore::open(&["analysis.fst"], OpenMode::read_only())?;
//! let key = store
//!     .find(&FieldFilter::new().nomvar("TT").ip1(850))
//!     .expect("field was written");
//! let values: Vec<f32> = store.read_values(key)?;
//! assert_eq!(values, temps);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod convert;
pub mod error;
pub mod file;
pub mod header;
pub mod query;
pub mod store;
pub mod time;
pub mod types;

pub use config::{OpenMode, StoreConfig};
pub use convert::{convert, Element};
pub use error::{Result, StoreError};
pub use file::StoreFile;
pub use header::{FieldHeader, FieldMeta, FileHeader};
pub use query::FieldFilter;
pub use store::FieldStore;
pub use time::{default_validity, unix_validity, ValidityFn};
pub use types::{DataType, FieldKey};
