// ============================================================
// Layer 4 — MAT-File Reader
// ============================================================
// Reads numeric arrays out of MATLAB Level-5 MAT files, the
// format sat-6-full.mat is distributed in.
//
// File layout:
//
//   bytes   0-115  descriptive text ("MATLAB 5.0 MAT-file ...")
//   bytes 116-123  subsystem data offset (ignored)
//   bytes 124-125  version
//   bytes 126-127  endian indicator: "IM" little, "MI" big
//   bytes 128..    data elements, each 8-byte aligned
//
// Every data element starts with an 8-byte tag:
//
//   u32 type | u32 byte count | payload | padding to 8 bytes
//
// or, for payloads of at most 4 bytes, the "small element" form
// where the byte count sits in the upper 16 bits of the first
// word and the payload fills the second word.
//
// A top-level miMATRIX holds, in order: array flags (class and
// complex bit), dimensions (int32), name (int8) and the real
// part. miCOMPRESSED wraps a zlib stream containing exactly one
// miMATRIX element; it carries no trailing padding.
//
// Array data is column-major. The reader keeps the storage type
// it finds on disk (sat-6 stores pixels as uint8 even though the
// array class can be double) and converts on access.
//
// Reference: MATLAB "MAT-File Format" (Level 5)
//            flate2 crate documentation

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use flate2::read::ZlibDecoder;
use thiserror::Error;

// ─── Element types ────────────────────────────────────────────────────────────
const MI_INT8:       u32 = 1;
const MI_UINT8:      u32 = 2;
const MI_INT16:      u32 = 3;
const MI_UINT16:     u32 = 4;
const MI_INT32:      u32 = 5;
const MI_UINT32:     u32 = 6;
const MI_SINGLE:     u32 = 7;
const MI_DOUBLE:     u32 = 9;
const MI_INT64:      u32 = 12;
const MI_UINT64:     u32 = 13;
const MI_MATRIX:     u32 = 14;
const MI_COMPRESSED: u32 = 15;

// ─── Array classes ────────────────────────────────────────────────────────────
const MX_DOUBLE: u32 = 6;
const MX_UINT64: u32 = 15;

const COMPLEX_FLAG: u32 = 0x0800;

pub type MatResult<T> = Result<T, MatError>;

#[derive(Debug, Error)]
pub enum MatError {
    #[error("io error while reading MAT data: {0}")]
    Io(#[from] io::Error),
    #[error("invalid MAT header: {0}")]
    Header(String),
    #[error("unsupported MAT content: {0}")]
    Unsupported(String),
    #[error("malformed element in array '{array}': {msg}")]
    Malformed { array: String, msg: String },
    #[error("array '{name}' declares dims {dims:?} ({expected} values) but holds {actual}")]
    ShapeMismatch {
        name:     String,
        dims:     Vec<usize>,
        expected: usize,
        actual:   usize,
    },
    #[error("array '{0}' not found in MAT file")]
    MissingArray(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Endian {
    Little,
    Big,
}

impl Endian {
    fn u32(self, b: &[u8]) -> u32 {
        let raw = [b[0], b[1], b[2], b[3]];
        match self {
            Endian::Little => u32::from_le_bytes(raw),
            Endian::Big    => u32::from_be_bytes(raw),
        }
    }

    fn i32(self, b: &[u8]) -> i32 {
        self.u32(b) as i32
    }
}

// ─── Decoded data ─────────────────────────────────────────────────────────────
/// Real-part values of a numeric array, in on-disk storage type.
#[derive(Debug, Clone, PartialEq)]
pub enum MatData {
    I8(Vec<i8>),
    U8(Vec<u8>),
    I16(Vec<i16>),
    U16(Vec<u16>),
    I32(Vec<i32>),
    U32(Vec<u32>),
    I64(Vec<i64>),
    U64(Vec<u64>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

impl MatData {
    pub fn len(&self) -> usize {
        match self {
            MatData::I8(v)  => v.len(),
            MatData::U8(v)  => v.len(),
            MatData::I16(v) => v.len(),
            MatData::U16(v) => v.len(),
            MatData::I32(v) => v.len(),
            MatData::U32(v) => v.len(),
            MatData::I64(v) => v.len(),
            MatData::U64(v) => v.len(),
            MatData::F32(v) => v.len(),
            MatData::F64(v) => v.len(),
        }
    }

    /// Value at column-major position `index`, widened or narrowed to f32.
    ///
    /// # Panics
    /// Panics if `index` is out of bounds.
    pub fn get_f32(&self, index: usize) -> f32 {
        match self {
            MatData::I8(v)  => v[index] as f32,
            MatData::U8(v)  => v[index] as f32,
            MatData::I16(v) => v[index] as f32,
            MatData::U16(v) => v[index] as f32,
            MatData::I32(v) => v[index] as f32,
            MatData::U32(v) => v[index] as f32,
            MatData::I64(v) => v[index] as f32,
            MatData::U64(v) => v[index] as f32,
            MatData::F32(v) => v[index],
            MatData::F64(v) => v[index] as f32,
        }
    }
}

/// One named numeric array.
#[derive(Debug, Clone, PartialEq)]
pub struct MatArray {
    pub name: String,
    /// MATLAB dimensions; the first one varies fastest in `data`.
    pub dims: Vec<usize>,
    pub data: MatData,
}

/// The arrays read from one MAT file, keyed by name.
#[derive(Debug, Default)]
pub struct MatFile {
    arrays: HashMap<String, MatArray>,
}

impl MatFile {
    /// Open and parse a MAT file from disk. See [`MatFile::read`].
    pub fn open(path: &Path, wanted: &[&str]) -> MatResult<Self> {
        let file = File::open(path)?;
        Self::read(BufReader::new(file), wanted)
    }

    /// Parse a MAT file, keeping only numeric arrays named in `wanted`.
    /// An empty `wanted` list keeps every numeric array.
    ///
    /// Arrays that are not kept are skipped without decoding their data.
    pub fn read<R: Read>(mut reader: R, wanted: &[&str]) -> MatResult<Self> {
        let endian = read_header(&mut reader)?;
        let mut arrays = HashMap::new();

        loop {
            let mut raw = [0u8; 8];
            if !fill_or_eof(&mut reader, &mut raw)? {
                break;
            }
            let tag = Tag::parse(&raw, endian);
            if tag.inline.is_some() {
                // Small top-level elements carry no matrices.
                continue;
            }

            let mut body = (&mut reader).take(tag.size as u64);
            let parsed = match tag.ty {
                MI_MATRIX     => read_matrix(&mut body, endian, wanted)?,
                MI_COMPRESSED => read_compressed(&mut body, endian, wanted)?,
                _             => None,
            };
            io::copy(&mut body, &mut io::sink())?;
            if tag.ty != MI_COMPRESSED {
                skip(&mut reader, padding(tag.size))?;
            }

            if let Some(array) = parsed {
                tracing::debug!("Read MAT array '{}' with dims {:?}", array.name, array.dims);
                arrays.insert(array.name.clone(), array);
            }
        }

        Ok(Self { arrays })
    }

    /// Remove and return an array, failing if it was not present.
    pub fn take(&mut self, name: &str) -> MatResult<MatArray> {
        self.arrays
            .remove(name)
            .ok_or_else(|| MatError::MissingArray(name.to_string()))
    }
}

#[cfg(test)]
impl MatFile {
    pub fn get(&self, name: &str) -> Option<&MatArray> {
        self.arrays.get(name)
    }

    pub fn len(&self) -> usize {
        self.arrays.len()
    }
}

// ─── Tags ─────────────────────────────────────────────────────────────────────
struct Tag {
    ty:     u32,
    size:   usize,
    /// Payload of a small element, stored inside the tag itself.
    inline: Option<[u8; 4]>,
}

impl Tag {
    fn parse(raw: &[u8; 8], endian: Endian) -> Self {
        let first = endian.u32(&raw[0..4]);
        let small_size = first >> 16;
        if small_size != 0 {
            Tag {
                ty:     first & 0xFFFF,
                size:   small_size as usize,
                inline: Some([raw[4], raw[5], raw[6], raw[7]]),
            }
        } else {
            Tag {
                ty:     first,
                size:   endian.u32(&raw[4..8]) as usize,
                inline: None,
            }
        }
    }
}

fn padding(size: usize) -> usize {
    (8 - size % 8) % 8
}

/// Fill `buf` completely, or report a clean end of stream.
/// A partially filled buffer is an error.
fn fill_or_eof<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<bool> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    match filled {
        0 => Ok(false),
        n if n == buf.len() => Ok(true),
        _ => Err(io::Error::new(io::ErrorKind::UnexpectedEof, "truncated element tag")),
    }
}

fn skip<R: Read>(reader: &mut R, count: usize) -> io::Result<()> {
    io::copy(&mut reader.take(count as u64), &mut io::sink())?;
    Ok(())
}

fn read_header<R: Read>(reader: &mut R) -> MatResult<Endian> {
    let mut header = [0u8; 128];
    reader.read_exact(&mut header).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => {
            MatError::Header("file is shorter than the 128-byte header".to_string())
        }
        _ => MatError::Io(e),
    })?;

    let text = String::from_utf8_lossy(&header[..116]);
    if text.starts_with("MATLAB 7.3") {
        return Err(MatError::Unsupported(
            "v7.3 MAT files are HDF5 containers; re-save with -v7".to_string(),
        ));
    }

    match &header[126..128] {
        b"IM" => Ok(Endian::Little),
        b"MI" => Ok(Endian::Big),
        other => Err(MatError::Header(format!(
            "unknown endian indicator {:?}",
            String::from_utf8_lossy(other)
        ))),
    }
}

/// Read one sub-element of a matrix: its type and its payload bytes.
fn read_element<R: Read>(reader: &mut R, endian: Endian) -> io::Result<(u32, Vec<u8>)> {
    let mut raw = [0u8; 8];
    reader.read_exact(&mut raw)?;
    let tag = Tag::parse(&raw, endian);

    if let Some(inline) = tag.inline {
        if tag.size > 4 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("small element claims {} bytes", tag.size),
            ));
        }
        return Ok((tag.ty, inline[..tag.size].to_vec()));
    }

    let mut data = Vec::with_capacity(tag.size.min(1 << 24));
    reader.by_ref().take(tag.size as u64).read_to_end(&mut data)?;
    if data.len() != tag.size {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("element declares {} bytes but only {} remain", tag.size, data.len()),
        ));
    }
    // The last element of a compressed stream may end without padding.
    skip(reader, padding(tag.size))?;
    Ok((tag.ty, data))
}

fn read_compressed<R: Read>(reader: R, endian: Endian, wanted: &[&str]) -> MatResult<Option<MatArray>> {
    let mut inflater = ZlibDecoder::new(reader);
    let mut raw = [0u8; 8];
    if !fill_or_eof(&mut inflater, &mut raw)? {
        return Ok(None);
    }
    let tag = Tag::parse(&raw, endian);
    if tag.ty != MI_MATRIX || tag.inline.is_some() {
        return Ok(None);
    }
    let mut body = (&mut inflater).take(tag.size as u64);
    read_matrix(&mut body, endian, wanted)
}

fn read_matrix<R: Read>(reader: &mut R, endian: Endian, wanted: &[&str]) -> MatResult<Option<MatArray>> {
    let malformed = |array: &str, msg: String| MatError::Malformed { array: array.to_string(), msg };

    // ── Array flags ───────────────────────────────────────────────────────────
    let (flags_ty, flags) = read_element(reader, endian)?;
    if flags_ty != MI_UINT32 || flags.len() < 8 {
        return Err(malformed("<unnamed>", "array flags must be two uint32 words".to_string()));
    }
    let flag_word = endian.u32(&flags[0..4]);
    let class     = flag_word & 0xFF;
    let complex   = flag_word & COMPLEX_FLAG != 0;

    // ── Dimensions ────────────────────────────────────────────────────────────
    let (dims_ty, dims_raw) = read_element(reader, endian)?;
    if dims_ty != MI_INT32 || dims_raw.len() % 4 != 0 {
        return Err(malformed("<unnamed>", "dimensions must be int32".to_string()));
    }
    let dims = dims_raw
        .chunks_exact(4)
        .map(|c| usize::try_from(endian.i32(c)))
        .collect::<Result<Vec<usize>, _>>()
        .map_err(|_| malformed("<unnamed>", "negative dimension".to_string()))?;

    // ── Name ──────────────────────────────────────────────────────────────────
    let (_, name_raw) = read_element(reader, endian)?;
    let name = String::from_utf8_lossy(&name_raw)
        .trim_end_matches('\0')
        .to_string();

    let numeric = (MX_DOUBLE..=MX_UINT64).contains(&class);
    let is_wanted = wanted.is_empty() || wanted.iter().any(|w| *w == name);
    if !numeric || !is_wanted {
        return Ok(None);
    }
    if complex {
        return Err(MatError::Unsupported(format!("array '{name}' is complex")));
    }

    // ── Real part ─────────────────────────────────────────────────────────────
    let (data_ty, data_raw) = read_element(reader, endian)?;
    let data = decode(data_ty, data_raw, endian).map_err(|msg| malformed(&name, msg))?;

    let expected: usize = dims.iter().product();
    if data.len() != expected {
        return Err(MatError::ShapeMismatch { name, dims, expected, actual: data.len() });
    }

    Ok(Some(MatArray { name, dims, data }))
}

fn decode(ty: u32, bytes: Vec<u8>, endian: Endian) -> Result<MatData, String> {
    macro_rules! numbers {
        ($t:ty, $width:expr, $variant:ident) => {{
            if bytes.len() % $width != 0 {
                return Err(format!(
                    "{} bytes is not a multiple of the {}-byte element width",
                    bytes.len(), $width
                ));
            }
            MatData::$variant(
                bytes
                    .chunks_exact($width)
                    .map(|c| {
                        let mut raw = [0u8; $width];
                        raw.copy_from_slice(c);
                        match endian {
                            Endian::Little => <$t>::from_le_bytes(raw),
                            Endian::Big    => <$t>::from_be_bytes(raw),
                        }
                    })
                    .collect(),
            )
        }};
    }

    let data = match ty {
        MI_UINT8  => MatData::U8(bytes),
        MI_INT8   => MatData::I8(bytes.into_iter().map(|b| b as i8).collect()),
        MI_INT16  => numbers!(i16, 2, I16),
        MI_UINT16 => numbers!(u16, 2, U16),
        MI_INT32  => numbers!(i32, 4, I32),
        MI_UINT32 => numbers!(u32, 4, U32),
        MI_INT64  => numbers!(i64, 8, I64),
        MI_UINT64 => numbers!(u64, 8, U64),
        MI_SINGLE => numbers!(f32, 4, F32),
        MI_DOUBLE => numbers!(f64, 8, F64),
        other     => return Err(format!("unsupported storage type {other}")),
    };
    Ok(data)
}

// ─── Test Fixtures ────────────────────────────────────────────────────────────
// Hand-built Level-5 files, shared with the loader tests. The plain helpers
// write little-endian files; the `*_in` variants take the byte order.
#[cfg(test)]
pub(crate) mod fixtures {
    use std::io::Write;

    use flate2::{write::ZlibEncoder, Compression};

    pub(crate) const CLASS_DOUBLE: u32 = 6;
    pub(crate) const CLASS_UINT8:  u32 = 9;
    pub(crate) const CLASS_CELL:   u32 = 1;

    pub(crate) const TYPE_UINT8:  u32 = super::MI_UINT8;
    pub(crate) const TYPE_INT32:  u32 = super::MI_INT32;
    pub(crate) const TYPE_DOUBLE: u32 = super::MI_DOUBLE;

    #[derive(Clone, Copy)]
    pub(crate) enum Order {
        Little,
        Big,
    }

    impl Order {
        pub(crate) fn word(self, v: u32) -> [u8; 4] {
            match self {
                Order::Little => v.to_le_bytes(),
                Order::Big    => v.to_be_bytes(),
            }
        }
    }

    pub(crate) fn header() -> Vec<u8> {
        header_in(Order::Little)
    }

    pub(crate) fn header_in(order: Order) -> Vec<u8> {
        let mut text = b"MATLAB 5.0 MAT-file, written by sat6-cnn tests".to_vec();
        text.resize(116, b' ');
        text.extend_from_slice(&[0u8; 8]);
        match order {
            Order::Little => {
                text.extend_from_slice(&0x0100u16.to_le_bytes());
                text.extend_from_slice(b"IM");
            }
            Order::Big => {
                text.extend_from_slice(&0x0100u16.to_be_bytes());
                text.extend_from_slice(b"MI");
            }
        }
        text
    }

    pub(crate) fn element_in(order: Order, ty: u32, data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        if data.len() <= 4 && ty != super::MI_MATRIX {
            out.extend_from_slice(&order.word(((data.len() as u32) << 16) | ty));
            let mut inline = data.to_vec();
            inline.resize(4, 0);
            out.extend_from_slice(&inline);
            return out;
        }
        out.extend_from_slice(&order.word(ty));
        out.extend_from_slice(&order.word(data.len() as u32));
        out.extend_from_slice(data);
        out.resize(out.len() + super::padding(data.len()), 0);
        out
    }

    pub(crate) fn matrix(name: &str, class: u32, dims: &[usize], data_ty: u32, data: &[u8]) -> Vec<u8> {
        matrix_in(Order::Little, name, class, dims, data_ty, data)
    }

    /// `data` must already be encoded in `order`.
    pub(crate) fn matrix_in(
        order:   Order,
        name:    &str,
        class:   u32,
        dims:    &[usize],
        data_ty: u32,
        data:    &[u8],
    ) -> Vec<u8> {
        let mut body = Vec::new();
        let mut flags = order.word(class).to_vec();
        flags.extend_from_slice(&[0u8; 4]);
        body.extend(element_in(order, super::MI_UINT32, &flags));
        let dims: Vec<u8> = dims.iter().flat_map(|d| order.word(*d as u32)).collect();
        body.extend(element_in(order, super::MI_INT32, &dims));
        body.extend(element_in(order, super::MI_INT8, name.as_bytes()));
        body.extend(element_in(order, data_ty, data));
        element_in(order, super::MI_MATRIX, &body)
    }

    pub(crate) fn compressed(element_bytes: &[u8]) -> Vec<u8> {
        compressed_in(Order::Little, element_bytes)
    }

    pub(crate) fn compressed_in(order: Order, element_bytes: &[u8]) -> Vec<u8> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(element_bytes).unwrap();
        let payload = encoder.finish().unwrap();
        let mut out = order.word(super::MI_COMPRESSED).to_vec();
        out.extend_from_slice(&order.word(payload.len() as u32));
        out.extend_from_slice(&payload);
        out
    }
}
