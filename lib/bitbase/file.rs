use crate::bitbase::{Codec, CodecError, RandomAccessFile, Signature};
use crate::util::Int;
use byteorder::{ByteOrder, LE};
use derive_more::with_trait::{Display, Error};
use std::fs::{File, rename};
use std::io::{self, Write};
use std::path::Path;

/// The fixed ASCII tag opening every bitbase file.
pub const MAGIC: [u8; 4] = *b"TPBB";

/// The current file format version.
pub const VERSION: u16 = 1;

/// The default size of a decompressed cluster in bytes.
pub const DEFAULT_CLUSTER_SIZE: u32 = 4096;

/// Header length in bytes: magic, version, signature, size in bits, cluster
/// size, codec, cluster count.
const HEADER_LEN: u64 = 4 + 2 + 4 + 8 + 4 + 1 + 4;

/// The reason why a bitbase file was rejected.
#[derive(Debug, Display, Error, Clone, Eq, PartialEq)]
pub enum FileError {
    #[display("not a bitbase file")]
    BadMagic,
    #[display("unsupported file version {_0}")]
    #[error(ignore)]
    BadVersion(u16),
    #[display("unknown compression byte {_0}")]
    #[error(ignore)]
    BadCodec(u8),
    #[display("signature mismatch, expected {expected} found {found}")]
    SignatureMismatch {
        expected: Signature,
        found: Signature,
    },
    #[display("offsets table is truncated or not monotonic")]
    BadOffsets,
    #[display("cluster is out of range or truncated")]
    BadCluster,
    #[display("{_0}")]
    Codec(CodecError),
}

impl From<CodecError> for FileError {
    #[inline(always)]
    fn from(e: CodecError) -> Self {
        FileError::Codec(e)
    }
}

/// Parsed header and offsets table of a clustered bitbase file.
///
/// Attaching a bitbase reads only this prefix; clusters are paged in on
/// demand through the cluster cache.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct FileInfo {
    signature: Signature,
    size_in_bits: u64,
    cluster_size: u32,
    codec: Codec,
    /// `cluster_count + 1` offsets into the data section, `offsets[0] == 0`,
    /// non-decreasing.
    offsets: Vec<u64>,
}

impl FileInfo {
    /// Parses the header and offsets from the beginning of `bytes`.
    pub fn parse(bytes: &[u8]) -> Result<Self, FileError> {
        let header = bytes
            .get(..HEADER_LEN as usize)
            .ok_or(FileError::BadMagic)?;

        if header[..4] != MAGIC {
            return Err(FileError::BadMagic);
        }

        let version = LE::read_u16(&header[4..]);
        if version != VERSION {
            return Err(FileError::BadVersion(version));
        }

        let signature = Signature::from_raw(LE::read_u32(&header[6..]));
        let size_in_bits = LE::read_u64(&header[10..]);
        let cluster_size = LE::read_u32(&header[18..]);
        let codec = Codec::try_new(header[22]).ok_or(FileError::BadCodec(header[22]))?;
        let cluster_count = LE::read_u32(&header[23..]) as usize;

        if cluster_size == 0 {
            return Err(FileError::BadOffsets);
        }

        let table = bytes
            .get(HEADER_LEN as usize..HEADER_LEN as usize + (cluster_count + 1) * 8)
            .ok_or(FileError::BadOffsets)?;

        let mut offsets = Vec::with_capacity(cluster_count + 1);
        for i in 0..=cluster_count {
            offsets.push(LE::read_u64(&table[i * 8..]));
        }

        if offsets[0] != 0 || offsets.windows(2).any(|w| w[0] > w[1]) {
            return Err(FileError::BadOffsets);
        }

        let expected = size_in_bits.div_ceil(8).div_ceil(cluster_size as u64);
        if cluster_count as u64 != expected {
            return Err(FileError::BadOffsets);
        }

        Ok(FileInfo {
            signature,
            size_in_bits,
            cluster_size,
            codec,
            offsets,
        })
    }

    /// The piece signature recorded in the header.
    #[inline(always)]
    pub fn signature(&self) -> Signature {
        self.signature
    }

    /// The total number of bits stored.
    #[inline(always)]
    pub fn size_in_bits(&self) -> u64 {
        self.size_in_bits
    }

    /// The size of a decompressed cluster in bytes.
    #[inline(always)]
    pub fn cluster_size(&self) -> u32 {
        self.cluster_size
    }

    /// The compression algorithm of every cluster.
    #[inline(always)]
    pub fn codec(&self) -> Codec {
        self.codec
    }

    /// The number of clusters.
    #[inline(always)]
    pub fn cluster_count(&self) -> u32 {
        (self.offsets.len() - 1) as u32
    }

    /// The file offset where the compressed data section begins.
    #[inline(always)]
    pub fn data_start(&self) -> u64 {
        HEADER_LEN + self.offsets.len() as u64 * 8
    }

    /// The decompressed length of cluster `index` in bytes.
    fn decompressed_len(&self, index: u32) -> u64 {
        let total = self.size_in_bits.div_ceil(8);
        let start = index as u64 * self.cluster_size as u64;
        (total - start).min(self.cluster_size as u64)
    }

    /// Reads and decompresses cluster `index` from `raf`.
    pub fn read_cluster(&self, raf: &RandomAccessFile, index: u32) -> Result<Vec<u8>, FileError> {
        if index >= self.cluster_count() {
            return Err(FileError::BadCluster);
        }

        let start = self.data_start() + self.offsets[index as usize];
        let end = self.data_start() + self.offsets[index as usize + 1];
        let compressed = raf.read(start..end).ok_or(FileError::BadCluster)?;

        let expected = self.decompressed_len(index) as usize;
        Ok(self.codec.decompress(compressed, expected)?)
    }

    /// Decompresses cluster `index` out of a complete in-memory file image.
    pub fn read_cluster_bytes(&self, image: &[u8], index: u32) -> Result<Vec<u8>, FileError> {
        if index >= self.cluster_count() {
            return Err(FileError::BadCluster);
        }

        let start = (self.data_start() + self.offsets[index as usize]) as usize;
        let end = (self.data_start() + self.offsets[index as usize + 1]) as usize;
        let compressed = image.get(start..end).ok_or(FileError::BadCluster)?;

        let expected = self.decompressed_len(index) as usize;
        Ok(self.codec.decompress(compressed, expected)?)
    }

    /// Reads and decompresses the entire bitbase.
    pub fn read_all(&self, raf: &RandomAccessFile) -> Result<Vec<u8>, FileError> {
        let mut out = Vec::with_capacity(self.size_in_bits.div_ceil(8) as usize);
        for index in 0..self.cluster_count() {
            out.extend_from_slice(&self.read_cluster(raf, index)?);
        }

        Ok(out)
    }
}

/// Renders the complete file image: header, offsets, compressed clusters.
pub fn write_image(
    signature: Signature,
    size_in_bits: u64,
    data: &[u8],
    cluster_size: u32,
    codec: Codec,
) -> Vec<u8> {
    debug_assert_eq!(data.len() as u64, size_in_bits.div_ceil(8));
    debug_assert!(cluster_size > 0);

    let clusters: Vec<Vec<u8>> = data
        .chunks(cluster_size as usize)
        .map(|chunk| codec.compress(chunk))
        .collect();

    let mut header = [0u8; HEADER_LEN as usize];
    header[..4].copy_from_slice(&MAGIC);
    LE::write_u16(&mut header[4..], VERSION);
    LE::write_u32(&mut header[6..], signature.get());
    LE::write_u64(&mut header[10..], size_in_bits);
    LE::write_u32(&mut header[18..], cluster_size);
    header[22] = codec.get();
    LE::write_u32(&mut header[23..], clusters.len() as u32);

    let mut image = Vec::with_capacity(data.len() / 4 + 64);
    image.extend_from_slice(&header);

    let mut offset = 0u64;
    image.extend_from_slice(&offset.to_le_bytes());
    for cluster in &clusters {
        offset += cluster.len() as u64;
        image.extend_from_slice(&offset.to_le_bytes());
    }

    for cluster in &clusters {
        image.extend_from_slice(cluster);
    }

    image
}

/// Writes a bitbase file, going through a temporary file renamed into place.
pub fn write(
    path: &Path,
    signature: Signature,
    size_in_bits: u64,
    data: &[u8],
    cluster_size: u32,
    codec: Codec,
) -> io::Result<()> {
    let image = write_image(signature, size_in_bits, data, cluster_size, codec);

    let tmp = path.with_extension("tmp");
    File::create(&tmp)?.write_all(&image)?;
    rename(&tmp, path)
}
