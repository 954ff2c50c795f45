//! A session over one or more linked container files.

use std::borrow::Cow;
use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};

use crate::config::{OpenMode, StoreConfig};
use crate::convert::{convert, decode_le, encode_le, Element};
use crate::error::{Result, StoreError};
use crate::file::StoreFile;
use crate::header::{FieldHeader, FieldMeta};
use crate::query::FieldFilter;
use crate::time::{default_validity, ValidityFn};
use crate::types::{DataType, FieldKey};

/// An open session: an ordered set of files sharing one access mode.
///
/// Writes always land in the first file. Lookups scan files in the order
/// they were given, and fields within a file in the order they were written.
///
/// Fields written in a session only become durable on [`FieldStore::close`].
/// Dropping a session with unwritten indexes leaves its files in the
/// placeholder state, which later opens reject.
pub struct FieldStore {
    files: Vec<StoreFile>,
    mode: OpenMode,
    config: StoreConfig,
    validity: ValidityFn,
}

impl FieldStore {
    /// Open `paths` with the default configuration.
    pub fn open<P: AsRef<Path>>(paths: &[P], mode: OpenMode) -> Result<Self> {
        Self::open_with_config(paths, mode, StoreConfig::default())
    }

    /// Open `paths`, in order, as one session.
    pub fn open_with_config<P: AsRef<Path>>(
        paths: &[P],
        mode: OpenMode,
        config: StoreConfig,
    ) -> Result<Self> {
        config.validate().map_err(StoreError::Config)?;
        mode.validate()?;

        if paths.is_empty() {
            return Err(StoreError::Config("no files given".to_string()));
        }
        if paths.len() > config.max_linked_files {
            return Err(StoreError::Config(format!(
                "{} files exceed the limit of {} linked files",
                paths.len(),
                config.max_linked_files
            )));
        }

        let files = paths
            .iter()
            .map(|path| StoreFile::open(path.as_ref(), mode, &config))
            .collect::<Result<Vec<_>>>()?;

        info!(
            files = files.len(),
            mode = %mode,
            fields = files.iter().map(|f| f.fields().len()).sum::<usize>(),
            "Opened field store"
        );

        Ok(Self {
            files,
            mode,
            config,
            validity: default_validity(),
        })
    }

    /// Link every file matching a glob `pattern`, in sorted path order.
    pub fn open_matching(pattern: &str, mode: OpenMode, config: StoreConfig) -> Result<Self> {
        let entries = glob::glob(pattern)
            .map_err(|e| StoreError::Config(format!("invalid pattern '{}': {}", pattern, e)))?;

        let mut paths = Vec::new();
        for entry in entries {
            match entry {
                Ok(path) if path.is_file() => paths.push(path),
                Ok(_) => {}
                Err(e) => {
                    let path = e.path().to_path_buf();
                    return Err(StoreError::Io {
                        path,
                        op: "glob",
                        source: std::io::Error::from(e),
                    });
                }
            }
        }
        paths.sort();

        if paths.is_empty() {
            return Err(StoreError::Config(format!(
                "no files match '{}'",
                pattern
            )));
        }

        debug!(pattern, matched = paths.len(), "Resolved file pattern");
        Self::open_with_config(&paths, mode, config)
    }

    /// Replace the validity time function used by filters.
    pub fn with_validity(mut self, validity: ValidityFn) -> Self {
        self.validity = validity;
        self
    }

    pub fn validity(&self) -> &ValidityFn {
        &self.validity
    }

    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Number of linked files.
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn files(&self) -> &[StoreFile] {
        &self.files
    }

    pub fn file(&self, index: usize) -> Option<&StoreFile> {
        self.files.get(index)
    }

    /// Total number of fields across all files.
    pub fn len(&self) -> usize {
        self.files.iter().map(|f| f.fields().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append a field from its little-endian byte image.
    ///
    /// `bytes` must hold exactly NI * NJ * NK elements of `datyp`. Compressed
    /// types are stored uncompressed when the codec cannot shrink the data.
    pub fn write_bytes(
        &mut self,
        bytes: &[u8],
        datyp: DataType,
        meta: &FieldMeta,
    ) -> Result<FieldKey> {
        self.check_payload(bytes.len(), datyp, meta)?;

        let compressed = match datyp {
            DataType::Float32Compressed => field_codec::compress(&decode_le::<f32>(bytes)),
            DataType::Float64Compressed => field_codec::compress(&decode_le::<f64>(bytes)),
            _ => None,
        };

        self.store(Cow::Borrowed(bytes), compressed, datyp, meta)
    }

    /// Append a field of typed values.
    ///
    /// `T` must be the element type of `datyp` (`u8` for string and binary
    /// fields, the float type for compressed fields).
    pub fn write<T: Element>(
        &mut self,
        values: &[T],
        datyp: DataType,
        meta: &FieldMeta,
    ) -> Result<FieldKey> {
        if !datyp.accepts(T::DATA_TYPE) {
            return Err(StoreError::Conversion {
                from: T::DATA_TYPE,
                to: datyp,
            });
        }
        self.check_payload(std::mem::size_of_val(values), datyp, meta)?;

        let compressed = match datyp {
            DataType::Float32Compressed => bytemuck::try_cast_slice::<T, f32>(values)
                .ok()
                .and_then(field_codec::compress),
            DataType::Float64Compressed => bytemuck::try_cast_slice::<T, f64>(values)
                .ok()
                .and_then(field_codec::compress),
            _ => None,
        };

        let raw = match compressed {
            Some(_) => Cow::Borrowed(&[][..]),
            None => Cow::Owned(encode_le(values)),
        };
        self.store(raw, compressed, datyp, meta)
    }

    fn check_payload(&self, len: usize, datyp: DataType, meta: &FieldMeta) -> Result<()> {
        if !self.mode.write {
            return Err(StoreError::ReadOnly {
                path: self.primary_path(),
            });
        }
        if datyp == DataType::NoType {
            return Err(StoreError::invalid_field("cannot store untyped data"));
        }

        let count = meta.element_count().ok_or_else(|| {
            StoreError::invalid_field(format!(
                "invalid shape {}x{}x{} for '{}'",
                meta.ni, meta.nj, meta.nk, meta.nomvar
            ))
        })?;
        let expected = count.checked_mul(datyp.element_size());
        if expected != Some(len) {
            return Err(StoreError::invalid_field(format!(
                "'{}' has {} bytes, expected {} {} elements",
                meta.nomvar, len, count, datyp
            )));
        }
        Ok(())
    }

    fn store(
        &mut self,
        raw: Cow<'_, [u8]>,
        compressed: Option<Vec<u8>>,
        datyp: DataType,
        meta: &FieldMeta,
    ) -> Result<FieldKey> {
        let (payload, stored_type) = match compressed {
            Some(bytes) => (Cow::Owned(bytes), datyp),
            None if datyp.is_compressed() => {
                debug!(
                    nomvar = %meta.nomvar,
                    datyp = %datyp,
                    "Compression did not shrink field, storing uncompressed"
                );
                (raw, datyp.decoded())
            }
            None => (raw, datyp),
        };

        let header = FieldHeader::from_meta(meta, stored_type, 0, 0)?;
        let file = self.files.first_mut().ok_or_else(|| {
            StoreError::Config("session has no files".to_string())
        })?;
        let key = next_key(file.fields().len())?;
        let slot = file.append(header, &payload)?;
        debug_assert_eq!(slot, key.slot());

        Ok(key)
    }

    /// Every field in scan order.
    pub fn fields(&self) -> impl Iterator<Item = (FieldKey, &FieldHeader)> + '_ {
        self.files.iter().enumerate().flat_map(|(file_index, file)| {
            file.fields()
                .iter()
                .enumerate()
                .filter_map(move |(slot, header)| {
                    FieldKey::new(file_index, slot).map(|key| (key, header))
                })
        })
    }

    /// First field matching `filter`.
    pub fn find(&self, filter: &FieldFilter) -> Option<FieldKey> {
        self.fields()
            .find(|(_, header)| filter.matches(header, &self.validity))
            .map(|(key, _)| key)
    }

    /// Every field matching `filter`, in scan order.
    pub fn find_all(&self, filter: &FieldFilter) -> Vec<FieldKey> {
        self.fields()
            .filter(|(_, header)| filter.matches(header, &self.validity))
            .map(|(key, _)| key)
            .collect()
    }

    fn resolve(&self, key: FieldKey) -> Result<(&StoreFile, usize, &FieldHeader)> {
        if !key.is_valid() {
            return Err(StoreError::InvalidKey(key.raw()));
        }
        let file = self
            .files
            .get(key.file_index())
            .ok_or(StoreError::InvalidKey(key.raw()))?;
        let header = file
            .fields()
            .get(key.slot())
            .ok_or(StoreError::InvalidKey(key.raw()))?;
        Ok((file, key.slot(), header))
    }

    /// The index record of the field at `key`.
    pub fn header(&self, key: FieldKey) -> Result<&FieldHeader> {
        self.resolve(key).map(|(_, _, header)| header)
    }

    /// Stored bytes of the field at `key` without copying, when its file is
    /// memory-mapped. Compressed fields are returned still compressed.
    pub fn mapped_bytes(&self, key: FieldKey) -> Result<Option<&[u8]>> {
        let (file, slot, _) = self.resolve(key)?;
        Ok(file.mapped_bytes(slot))
    }

    /// The field's values as little-endian bytes of its stored type, or of
    /// the decoded float type for compressed fields.
    pub fn read(&self, key: FieldKey) -> Result<Vec<u8>> {
        let (file, slot, header) = self.resolve(key)?;
        let stored = file.stored_bytes(slot)?;

        debug!(
            key = %key,
            nomvar = %header.nomvar(),
            datyp = %header.datyp,
            nbytes = header.nbytes,
            mapped = file.is_mapped(),
            "Reading field"
        );

        if !header.datyp.is_compressed() {
            return Ok(stored.into_owned());
        }

        let count = header.element_count().ok_or_else(|| {
            StoreError::corrupt_index(file.path(), format!("field {} has an invalid shape", key))
        })?;
        // Every value costs at least one nibble
        if count > stored.len().saturating_mul(2) {
            return Err(StoreError::corrupt_index(
                file.path(),
                format!(
                    "field {} claims {} values in {} compressed bytes",
                    key,
                    count,
                    stored.len()
                ),
            ));
        }

        let decoded = match header.datyp {
            DataType::Float32Compressed => {
                field_codec::decompress::<f32>(&stored, count).map(|v| encode_le(&v))
            }
            _ => field_codec::decompress::<f64>(&stored, count).map(|v| encode_le(&v)),
        };
        decoded.map_err(|source| StoreError::Codec {
            path: file.path().to_path_buf(),
            source,
        })
    }

    /// The field's values converted to `to`, as little-endian bytes.
    pub fn read_as(&self, key: FieldKey, to: DataType) -> Result<Vec<u8>> {
        let from = self.header(key)?.datyp.decoded();
        let bytes = self.read(key)?;
        if from == to.decoded() {
            return Ok(bytes);
        }
        convert(&bytes, from, to)
    }

    /// The field's values converted to `T`.
    pub fn read_values<T: Element>(&self, key: FieldKey) -> Result<Vec<T>> {
        let bytes = self.read_as(key, T::DATA_TYPE)?;
        Ok(decode_le(&bytes))
    }

    /// Write the index of every modified file and release all files.
    ///
    /// Every file is closed even when an earlier one fails; the first
    /// failure is returned.
    pub fn close(mut self) -> Result<()> {
        let sync = self.config.sync_on_close;
        let mut first_error = None;

        for file in std::mem::take(&mut self.files) {
            let path = file.path().to_path_buf();
            if let Err(e) = file.close(sync) {
                error!(path = %path.display(), error = %e, "Failed to close store file");
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn primary_path(&self) -> PathBuf {
        self.files
            .first()
            .map(|f| f.path().to_path_buf())
            .unwrap_or_default()
    }
}

/// Key of the next field appended to the first file, checked before any
/// bytes are written.
fn next_key(slot_count: usize) -> Result<FieldKey> {
    FieldKey::new(0, slot_count).ok_or_else(|| {
        StoreError::invalid_field(format!("slot {} exceeds key range", slot_count))
    })
}

impl Drop for FieldStore {
    fn drop(&mut self) {
        for file in self.files.iter().filter(|f| f.is_dirty()) {
            warn!(
                path = %file.path().display(),
                fields = file.fields().len(),
                "Field store dropped without close, index not written"
            );
        }
    }
}

impl fmt::Debug for FieldStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldStore")
            .field("files", &self.files)
            .field("mode", &self.mode)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
