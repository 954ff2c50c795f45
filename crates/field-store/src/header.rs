//! Fixed-layout file and field headers.
//!
//! Every integer is little-endian. A file starts with a [`FileHeader`]
//! (32 bytes) and ends with an `i64` field count followed by that many
//! [`FieldHeader`] records (96 bytes each).
//!
//! ```text
//! +-------------+--------------------------+-------+----------------------+
//! | FileHeader  | field data, back to back | count | FieldHeader x count  |
//! +-------------+--------------------------+-------+----------------------+
//! 0             32                         ioffset                   size
//! ```

use std::io::{self, Read, Write};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use chrono::{DateTime, Utc};

use crate::error::{Result, StoreError};
use crate::time;
use crate::types::DataType;

/// Container signature.
pub const MAGIC: i32 = i32::from_le_bytes(*b"FSTR");

/// Current format revision.
pub const FORMAT_VERSION: u32 = 1;

/// Encoded size of a [`FileHeader`].
pub const FILE_HEADER_SIZE: usize = 32;

/// Encoded size of a [`FieldHeader`].
pub const FIELD_HEADER_SIZE: usize = 96;

/// Encoded size of the field count preceding the index.
pub const FIELD_COUNT_SIZE: usize = 8;

const TYPVAR_LEN: usize = 2;
const NOMVAR_LEN: usize = 4;
const ETIKET_LEN: usize = 12;

/// Header at offset 0 of every container file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader {
    /// Offset of the field count that precedes the index.
    pub ioffset: i64,
    /// Total file size once closed.
    pub size: i64,
    pub magic: i32,
    pub version: u32,
    /// Encoded size of this header.
    pub fsize: u32,
    /// Encoded size of one field header.
    pub hsize: u32,
}

impl FileHeader {
    /// Header of a closed file whose index starts at `ioffset`.
    pub fn new(ioffset: i64, size: i64) -> Self {
        Self {
            ioffset,
            size,
            magic: MAGIC,
            version: FORMAT_VERSION,
            fsize: FILE_HEADER_SIZE as u32,
            hsize: FIELD_HEADER_SIZE as u32,
        }
    }

    /// Header written while a file is open for writing.
    ///
    /// A zero size never matches a real file, so a file left in this state
    /// is rejected by the next open.
    pub fn placeholder() -> Self {
        Self::new(0, 0)
    }

    pub fn is_placeholder(&self) -> bool {
        self.size == 0
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_i64::<LittleEndian>(self.ioffset)?;
        writer.write_i64::<LittleEndian>(self.size)?;
        writer.write_i32::<LittleEndian>(self.magic)?;
        writer.write_u32::<LittleEndian>(self.version)?;
        writer.write_u32::<LittleEndian>(self.fsize)?;
        writer.write_u32::<LittleEndian>(self.hsize)?;
        Ok(())
    }

    pub fn read_from<R: Read>(reader: &mut R) -> io::Result<Self> {
        Ok(Self {
            ioffset: reader.read_i64::<LittleEndian>()?,
            size: reader.read_i64::<LittleEndian>()?,
            magic: reader.read_i32::<LittleEndian>()?,
            version: reader.read_u32::<LittleEndian>()?,
            fsize: reader.read_u32::<LittleEndian>()?,
            hsize: reader.read_u32::<LittleEndian>()?,
        })
    }

    /// Check signature, format compatibility and recorded size against the
    /// size of the file on disk.
    pub fn validate(&self, path: &Path, file_len: u64) -> Result<()> {
        if self.magic != MAGIC {
            return Err(StoreError::BadMagic {
                path: path.to_path_buf(),
                found: self.magic,
            });
        }

        if self.version != FORMAT_VERSION
            || self.fsize as usize != FILE_HEADER_SIZE
            || self.hsize as usize != FIELD_HEADER_SIZE
        {
            return Err(StoreError::IncompatibleVersion {
                path: path.to_path_buf(),
                version: self.version,
                fsize: self.fsize,
                hsize: self.hsize,
            });
        }

        if u64::try_from(self.size).ok() != Some(file_len) {
            return Err(StoreError::SizeMismatch {
                path: path.to_path_buf(),
                stored: self.size,
                actual: file_len,
            });
        }

        Ok(())
    }
}

/// Caller-supplied description of a field to write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMeta {
    /// Time origin, Unix seconds by default.
    pub dateo: i32,
    /// Step length in seconds.
    pub deet: i32,
    /// Step count.
    pub npas: i32,
    /// Level identifier.
    pub ip1: i32,
    /// Time offset identifier.
    pub ip2: i32,
    /// Realization identifier.
    pub ip3: i32,
    pub ni: i32,
    pub nj: i32,
    pub nk: i32,
    pub ig1: i32,
    pub ig2: i32,
    pub ig3: i32,
    pub ig4: i32,
    /// Type tag, at most 2 bytes.
    pub typvar: String,
    /// Name, at most 4 bytes.
    pub nomvar: String,
    /// Free label, at most 12 bytes.
    pub etiket: String,
    /// Grid type, at most 1 byte.
    pub grtyp: String,
}

impl FieldMeta {
    /// A field named `nomvar` with the given (NI, NJ, NK) shape.
    pub fn new(nomvar: impl Into<String>, shape: (i32, i32, i32)) -> Self {
        Self {
            nomvar: nomvar.into(),
            ni: shape.0,
            nj: shape.1,
            nk: shape.2,
            typvar: "P".to_string(),
            grtyp: "X".to_string(),
            ..Default::default()
        }
    }

    pub fn with_ips(mut self, ip1: i32, ip2: i32, ip3: i32) -> Self {
        self.ip1 = ip1;
        self.ip2 = ip2;
        self.ip3 = ip3;
        self
    }

    pub fn with_level(mut self, ip1: i32) -> Self {
        self.ip1 = ip1;
        self
    }

    pub fn with_time(mut self, dateo: i32, deet: i32, npas: i32) -> Self {
        self.dateo = dateo;
        self.deet = deet;
        self.npas = npas;
        self
    }

    /// Set the time origin from a timestamp. Out-of-range timestamps leave
    /// the origin unchanged.
    pub fn with_origin(mut self, origin: DateTime<Utc>) -> Self {
        if let Some(dateo) = time::stamp_from_datetime(origin) {
            self.dateo = dateo;
        }
        self
    }

    pub fn with_typvar(mut self, typvar: impl Into<String>) -> Self {
        self.typvar = typvar.into();
        self
    }

    pub fn with_etiket(mut self, etiket: impl Into<String>) -> Self {
        self.etiket = etiket.into();
        self
    }

    pub fn with_grid(mut self, grtyp: impl Into<String>, ig: [i32; 4]) -> Self {
        self.grtyp = grtyp.into();
        self.ig1 = ig[0];
        self.ig2 = ig[1];
        self.ig3 = ig[2];
        self.ig4 = ig[3];
        self
    }

    /// NI * NJ * NK, or `None` for a non-positive or overflowing shape.
    pub fn element_count(&self) -> Option<usize> {
        element_count(self.ni, self.nj, self.nk)
    }
}

/// Index record describing one stored field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldHeader {
    /// Byte offset of the field's data within its file.
    pub offset: i64,
    /// Stored (post-compression) byte length.
    pub nbytes: i64,
    pub dateo: i32,
    pub deet: i32,
    pub npas: i32,
    pub nbits: i32,
    pub datyp: DataType,
    pub ip1: i32,
    pub ip2: i32,
    pub ip3: i32,
    pub ni: i32,
    pub nj: i32,
    pub nk: i32,
    pub ig1: i32,
    pub ig2: i32,
    pub ig3: i32,
    pub ig4: i32,
    pub typvar: [u8; TYPVAR_LEN],
    pub nomvar: [u8; NOMVAR_LEN],
    pub etiket: [u8; ETIKET_LEN],
    pub grtyp: u8,
}

impl FieldHeader {
    /// Build the index record for `meta` stored as `datyp` at `offset`.
    pub fn from_meta(meta: &FieldMeta, datyp: DataType, offset: i64, nbytes: i64) -> Result<Self> {
        let [grtyp] = pad_text::<1>(&meta.grtyp, "grid type")?;
        Ok(Self {
            offset,
            nbytes,
            dateo: meta.dateo,
            deet: meta.deet,
            npas: meta.npas,
            nbits: datyp.nbits(),
            datyp,
            ip1: meta.ip1,
            ip2: meta.ip2,
            ip3: meta.ip3,
            ni: meta.ni,
            nj: meta.nj,
            nk: meta.nk,
            ig1: meta.ig1,
            ig2: meta.ig2,
            ig3: meta.ig3,
            ig4: meta.ig4,
            typvar: pad_text(&meta.typvar, "type tag")?,
            nomvar: pad_text(&meta.nomvar, "name")?,
            etiket: pad_text(&meta.etiket, "label")?,
            grtyp,
        })
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_i64::<LittleEndian>(self.offset)?;
        writer.write_i64::<LittleEndian>(self.nbytes)?;
        for value in [
            self.dateo,
            self.deet,
            self.npas,
            self.nbits,
            self.datyp.code(),
            self.ip1,
            self.ip2,
            self.ip3,
            self.ni,
            self.nj,
            self.nk,
            self.ig1,
            self.ig2,
            self.ig3,
            self.ig4,
        ] {
            writer.write_i32::<LittleEndian>(value)?;
        }
        writer.write_all(&self.typvar)?;
        writer.write_all(&self.nomvar)?;
        writer.write_all(&self.etiket)?;
        writer.write_u8(self.grtyp)?;
        writer.write_u8(0)?; // pad
        Ok(())
    }

    pub fn read_from<R: Read>(reader: &mut R) -> io::Result<Self> {
        let offset = reader.read_i64::<LittleEndian>()?;
        let nbytes = reader.read_i64::<LittleEndian>()?;
        let mut ints = [0i32; 15];
        reader.read_i32_into::<LittleEndian>(&mut ints)?;
        let datyp = DataType::from_code(ints[4]).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("unknown storage type code {}", ints[4]),
            )
        })?;

        let mut typvar = [0u8; TYPVAR_LEN];
        let mut nomvar = [0u8; NOMVAR_LEN];
        let mut etiket = [0u8; ETIKET_LEN];
        reader.read_exact(&mut typvar)?;
        reader.read_exact(&mut nomvar)?;
        reader.read_exact(&mut etiket)?;
        let grtyp = reader.read_u8()?;
        let _pad = reader.read_u8()?;

        Ok(Self {
            offset,
            nbytes,
            dateo: ints[0],
            deet: ints[1],
            npas: ints[2],
            nbits: ints[3],
            datyp,
            ip1: ints[5],
            ip2: ints[6],
            ip3: ints[7],
            ni: ints[8],
            nj: ints[9],
            nk: ints[10],
            ig1: ints[11],
            ig2: ints[12],
            ig3: ints[13],
            ig4: ints[14],
            typvar,
            nomvar,
            etiket,
            grtyp,
        })
    }

    /// NI * NJ * NK, or `None` for a non-positive or overflowing shape.
    pub fn element_count(&self) -> Option<usize> {
        element_count(self.ni, self.nj, self.nk)
    }

    pub fn typvar(&self) -> String {
        unpad_text(&self.typvar)
    }

    pub fn nomvar(&self) -> String {
        unpad_text(&self.nomvar)
    }

    pub fn etiket(&self) -> String {
        unpad_text(&self.etiket)
    }

    pub fn grtyp(&self) -> String {
        unpad_text(&[self.grtyp])
    }

    /// The metadata this header was built from.
    pub fn meta(&self) -> FieldMeta {
        FieldMeta {
            dateo: self.dateo,
            deet: self.deet,
            npas: self.npas,
            ip1: self.ip1,
            ip2: self.ip2,
            ip3: self.ip3,
            ni: self.ni,
            nj: self.nj,
            nk: self.nk,
            ig1: self.ig1,
            ig2: self.ig2,
            ig3: self.ig3,
            ig4: self.ig4,
            typvar: self.typvar(),
            nomvar: self.nomvar(),
            etiket: self.etiket(),
            grtyp: self.grtyp(),
        }
    }
}

fn element_count(ni: i32, nj: i32, nk: i32) -> Option<usize> {
    if ni <= 0 || nj <= 0 || nk <= 0 {
        return None;
    }
    (ni as usize)
        .checked_mul(nj as usize)?
        .checked_mul(nk as usize)
}

/// Space-pad `text` to exactly `N` bytes.
fn pad_text<const N: usize>(text: &str, what: &str) -> Result<[u8; N]> {
    let bytes = text.as_bytes();
    if bytes.len() > N {
        return Err(StoreError::invalid_field(format!(
            "{} '{}' is longer than {} bytes",
            what, text, N
        )));
    }
    let mut out = [b' '; N];
    out[..bytes.len()].copy_from_slice(bytes);
    Ok(out)
}

fn unpad_text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .trim_end_matches([' ', '\0'])
        .to_string()
}
