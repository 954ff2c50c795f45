//! One physical container file.

use std::borrow::Cow;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use memmap2::Mmap;
use tracing::{debug, info, warn};

use crate::config::{OpenMode, StoreConfig};
use crate::error::{Result, StoreError};
use crate::header::{
    FieldHeader, FileHeader, FIELD_COUNT_SIZE, FIELD_HEADER_SIZE, FILE_HEADER_SIZE,
};

/// An open container file: handle, optional mapping, file header and the
/// in-memory field index.
#[derive(Debug)]
pub struct StoreFile {
    path: PathBuf,
    file: File,
    mmap: Option<Mmap>,
    header: FileHeader,
    fields: Vec<FieldHeader>,
    writable: bool,
    dirty: bool,
    /// Where the next field's data goes.
    data_end: u64,
}

impl StoreFile {
    /// Open `path` under `mode`.
    ///
    /// New or truncated files get a placeholder header immediately. Existing
    /// files are validated and their index loaded.
    pub fn open(path: &Path, mode: OpenMode, config: &StoreConfig) -> Result<Self> {
        let mut options = OpenOptions::new();
        options.read(true);
        if mode.write {
            options.write(true).create(true).truncate(mode.truncates());
        }

        let file = options.open(path).map_err(StoreError::io(path, "open"))?;
        let len = file
            .metadata()
            .map_err(StoreError::io(path, "stat"))?
            .len();

        if len == 0 {
            if !mode.write {
                return Err(StoreError::EmptyFile {
                    path: path.to_path_buf(),
                });
            }
            return Self::create(path.to_path_buf(), file);
        }

        if len < FILE_HEADER_SIZE as u64 {
            return Err(StoreError::FileTooSmall {
                path: path.to_path_buf(),
                len,
            });
        }

        let mmap = if mode.maps() && config.use_mmap {
            // SAFETY: the session owns the handle for the mapping's lifetime
            // and never writes through a read-only session.
            match unsafe { Mmap::map(&file) } {
                Ok(map) => Some(map),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "mmap failed, using positioned reads");
                    None
                }
            }
        } else {
            None
        };

        let mut store_file = Self {
            path: path.to_path_buf(),
            file,
            mmap,
            header: FileHeader::placeholder(),
            fields: Vec::new(),
            writable: mode.write,
            dirty: false,
            data_end: 0,
        };

        let header_bytes = store_file.read_region(0, FILE_HEADER_SIZE)?;
        let header = FileHeader::read_from(&mut &header_bytes[..])
            .map_err(StoreError::io(path, "decode file header"))?;
        header.validate(path, len)?;

        store_file.fields = store_file.load_index(&header, len)?;
        store_file.header = header;
        store_file.data_end = header.ioffset as u64;

        info!(
            path = %path.display(),
            mode = %mode,
            fields = store_file.fields.len(),
            mapped = store_file.mmap.is_some(),
            "Opened store file"
        );

        Ok(store_file)
    }

    fn create(path: PathBuf, file: File) -> Result<Self> {
        let mut store_file = Self {
            path,
            file,
            mmap: None,
            header: FileHeader::placeholder(),
            fields: Vec::new(),
            writable: true,
            dirty: false,
            data_end: FILE_HEADER_SIZE as u64,
        };
        store_file.write_placeholder()?;
        info!(path = %store_file.path.display(), "Created store file");
        Ok(store_file)
    }

    fn load_index(&self, header: &FileHeader, len: u64) -> Result<Vec<FieldHeader>> {
        let ioffset = u64::try_from(header.ioffset)
            .ok()
            .filter(|&o| o >= FILE_HEADER_SIZE as u64 && o + FIELD_COUNT_SIZE as u64 <= len)
            .ok_or_else(|| {
                StoreError::corrupt_index(
                    &self.path,
                    format!("index offset {} outside file", header.ioffset),
                )
            })?;

        let count_bytes = self.read_region(ioffset, FIELD_COUNT_SIZE)?;
        let count = (&count_bytes[..])
            .read_i64::<LittleEndian>()
            .map_err(StoreError::io(&self.path, "decode field count"))?;

        let index_start = ioffset + FIELD_COUNT_SIZE as u64;
        let max_fields = (len - index_start) / FIELD_HEADER_SIZE as u64;
        let index_len = u64::try_from(count)
            .ok()
            .filter(|&c| c <= max_fields)
            .map(|c| c * FIELD_HEADER_SIZE as u64)
            .filter(|&n| index_start.checked_add(n) == Some(len))
            .ok_or_else(|| {
                StoreError::corrupt_index(
                    &self.path,
                    format!("{} field headers do not fill the index", count),
                )
            })?;

        let index_bytes = self.read_region(index_start, index_len as usize)?;
        let mut reader = &index_bytes[..];
        let mut fields = Vec::with_capacity(count as usize);
        for slot in 0..count {
            let field = FieldHeader::read_from(&mut reader).map_err(|e| {
                StoreError::corrupt_index(&self.path, format!("field {}: {}", slot, e))
            })?;
            let in_data_region = field.offset >= FILE_HEADER_SIZE as i64
                && field.nbytes >= 0
                && field
                    .offset
                    .checked_add(field.nbytes)
                    .is_some_and(|end| end <= header.ioffset);
            if !in_data_region {
                return Err(StoreError::corrupt_index(
                    &self.path,
                    format!(
                        "field {} spans {}+{} outside the data region",
                        slot, field.offset, field.nbytes
                    ),
                ));
            }
            fields.push(field);
        }

        Ok(fields)
    }

    /// Bytes `[offset, offset + len)` of the file, borrowed from the mapping
    /// when there is one.
    fn read_region(&self, offset: u64, len: usize) -> Result<Cow<'_, [u8]>> {
        if let Some(map) = &self.mmap {
            let start = offset as usize;
            return map
                .get(start..start + len)
                .map(Cow::Borrowed)
                .ok_or_else(|| {
                    StoreError::corrupt_index(
                        &self.path,
                        format!("region {}+{} beyond mapping", offset, len),
                    )
                });
        }

        let mut buf = vec![0u8; len];
        let mut handle = &self.file;
        handle
            .seek(SeekFrom::Start(offset))
            .map_err(StoreError::io(&self.path, "seek"))?;
        handle
            .read_exact(&mut buf)
            .map_err(StoreError::io(&self.path, "read"))?;
        Ok(Cow::Owned(buf))
    }

    fn write_region(&self, offset: u64, bytes: &[u8]) -> Result<()> {
        let mut handle = &self.file;
        handle
            .seek(SeekFrom::Start(offset))
            .map_err(StoreError::io(&self.path, "seek"))?;
        handle
            .write_all(bytes)
            .map_err(StoreError::io(&self.path, "write"))
    }

    fn write_placeholder(&mut self) -> Result<()> {
        let mut buf = Vec::with_capacity(FILE_HEADER_SIZE);
        FileHeader::placeholder()
            .write_to(&mut buf)
            .map_err(StoreError::io(&self.path, "encode file header"))?;
        self.write_region(0, &buf)?;
        self.header = FileHeader::placeholder();
        Ok(())
    }

    /// Append `bytes` at the end of the data region and record `field` for
    /// it. The field's offset and length are filled in here.
    ///
    /// Returns the new field's slot.
    pub fn append(&mut self, mut field: FieldHeader, bytes: &[u8]) -> Result<usize> {
        if !self.writable {
            return Err(StoreError::ReadOnly {
                path: self.path.clone(),
            });
        }

        // The on-disk header stops describing the file once data lands on
        // the old index
        if !self.dirty && !self.header.is_placeholder() {
            self.write_placeholder()?;
        }

        let offset = self.data_end;
        field.offset = offset as i64;
        field.nbytes = bytes.len() as i64;
        self.write_region(offset, bytes)?;

        self.data_end += bytes.len() as u64;
        self.fields.push(field);
        self.dirty = true;

        debug!(
            path = %self.path.display(),
            nomvar = %field.nomvar(),
            datyp = %field.datyp,
            offset,
            nbytes = bytes.len(),
            "Appended field"
        );

        Ok(self.fields.len() - 1)
    }

    /// Stored bytes of the field in `slot`.
    pub fn stored_bytes(&self, slot: usize) -> Result<Cow<'_, [u8]>> {
        let field = self
            .fields
            .get(slot)
            .ok_or_else(|| StoreError::invalid_field(format!("no slot {}", slot)))?;
        self.read_region(field.offset as u64, field.nbytes as usize)
    }

    /// Stored bytes of the field in `slot`, if this file is mapped.
    pub fn mapped_bytes(&self, slot: usize) -> Option<&[u8]> {
        let map = self.mmap.as_ref()?;
        let field = self.fields.get(slot)?;
        let start = field.offset as usize;
        map.get(start..start + field.nbytes as usize)
    }

    /// Write the index and final header if anything was appended or the
    /// file is still a placeholder, then release the mapping and handle.
    pub fn close(self, sync: bool) -> Result<()> {
        let Self {
            path,
            file,
            mmap,
            header,
            fields,
            writable,
            dirty,
            data_end,
        } = self;
        drop(mmap);

        // A file created by this session gets an empty index even without writes
        if !(writable && (dirty || header.is_placeholder())) {
            debug!(path = %path.display(), "Closed store file without changes");
            return Ok(());
        }

        let mut index = Vec::with_capacity(FIELD_COUNT_SIZE + fields.len() * FIELD_HEADER_SIZE);
        index
            .write_i64::<LittleEndian>(fields.len() as i64)
            .map_err(StoreError::io(&path, "encode field count"))?;
        for field in &fields {
            field
                .write_to(&mut index)
                .map_err(StoreError::io(&path, "encode field index"))?;
        }

        let size = data_end + index.len() as u64;
        let header = FileHeader::new(data_end as i64, size as i64);
        let mut header_bytes = Vec::with_capacity(FILE_HEADER_SIZE);
        header
            .write_to(&mut header_bytes)
            .map_err(StoreError::io(&path, "encode file header"))?;

        let mut handle = &file;
        handle
            .seek(SeekFrom::Start(data_end))
            .map_err(StoreError::io(&path, "seek"))?;
        handle
            .write_all(&index)
            .map_err(StoreError::io(&path, "write index"))?;
        file.set_len(size)
            .map_err(StoreError::io(&path, "truncate"))?;
        handle
            .seek(SeekFrom::Start(0))
            .map_err(StoreError::io(&path, "seek"))?;
        handle
            .write_all(&header_bytes)
            .map_err(StoreError::io(&path, "write file header"))?;

        if sync {
            file.sync_all().map_err(StoreError::io(&path, "sync"))?;
        }

        info!(
            path = %path.display(),
            fields = fields.len(),
            bytes = size,
            "Closed store file"
        );

        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The file header as last read or written.
    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    /// The in-memory field index, in append order.
    pub fn fields(&self) -> &[FieldHeader] {
        &self.fields
    }

    pub fn is_mapped(&self) -> bool {
        self.mmap.is_some()
    }

    pub fn is_writable(&self) -> bool {
        self.writable
    }

    /// Whether fields were appended since open.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}
