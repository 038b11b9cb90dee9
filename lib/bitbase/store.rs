use crate::bitbase::{
    BitVector, ClusterCache, Codec, FileError, FileInfo, RandomAccessFile, Signature, file,
};
use derive_more::with_trait::Debug;
use log::warn;
use std::path::Path;
use std::{io, sync::Arc};

/// One endgame's win bits, either resident in memory or paged in from a
/// clustered file through the cluster cache.
#[derive(Debug)]
pub struct Bitbase {
    size_in_bits: u64,
    repr: Repr,
}

#[derive(Debug)]
enum Repr {
    Vector(BitVector),
    Clustered {
        #[debug(skip)]
        raf: RandomAccessFile,
        info: FileInfo,
        #[debug(skip)]
        cache: Arc<ClusterCache>,
    },
}

impl Bitbase {
    /// Wraps a fully resident bit vector.
    pub fn from_vector(bits: BitVector) -> Self {
        Bitbase {
            size_in_bits: bits.len(),
            repr: Repr::Vector(bits),
        }
    }

    /// Attaches a clustered file, reading only its header and offsets.
    ///
    /// Bits are decompressed cluster by cluster on demand and kept in the
    /// process-wide [`ClusterCache`].
    pub fn attach(path: &Path, expected: Signature) -> io::Result<Self> {
        Self::attach_with(path, expected, ClusterCache::shared())
    }

    /// Attaches a clustered file backed by a caller-provided cache.
    pub fn attach_with(
        path: &Path,
        expected: Signature,
        cache: Arc<ClusterCache>,
    ) -> io::Result<Self> {
        let raf = RandomAccessFile::open(path)?;
        let prefix = raf.read(0..raf.len()).unwrap_or(&[]);
        let info = FileInfo::parse(prefix).map_err(io_invalid)?;

        if info.signature() != expected {
            return Err(io_invalid(FileError::SignatureMismatch {
                expected,
                found: info.signature(),
            }));
        }

        Ok(Bitbase {
            size_in_bits: info.size_in_bits(),
            repr: Repr::Clustered { raf, info, cache },
        })
    }

    /// Reads a clustered file fully into memory.
    pub fn read_resident(path: &Path, expected: Signature) -> io::Result<Self> {
        let attached = Self::attach(path, expected)?;
        match &attached.repr {
            Repr::Vector(_) => Ok(attached),
            Repr::Clustered { raf, info, .. } => {
                let bytes = info.read_all(raf).map_err(io_invalid)?;
                Ok(Bitbase {
                    size_in_bits: info.size_in_bits(),
                    repr: Repr::Vector(BitVector::from_bytes(&bytes, info.size_in_bits())),
                })
            }
        }
    }

    /// Rebuilds a bitbase from an embedded file image.
    ///
    /// The image layout is identical to the on-disk format; embedded
    /// bitbases are decompressed fully.
    pub fn from_image(image: &[u8]) -> Result<Self, FileError> {
        let info = FileInfo::parse(image)?;
        let mut bytes = Vec::with_capacity(info.size_in_bits().div_ceil(8) as usize);
        for cluster in 0..info.cluster_count() {
            bytes.extend_from_slice(&info.read_cluster_bytes(image, cluster)?);
        }

        Ok(Bitbase {
            size_in_bits: info.size_in_bits(),
            repr: Repr::Vector(BitVector::from_bytes(&bytes, info.size_in_bits())),
        })
    }

    /// The number of addressable bits.
    #[inline(always)]
    pub fn size_in_bits(&self) -> u64 {
        self.size_in_bits
    }

    /// Whether all bits are resident in memory.
    #[inline(always)]
    pub fn is_resident(&self) -> bool {
        matches!(self.repr, Repr::Vector(_))
    }

    /// The bit at `index`.
    ///
    /// `None` on out-of-range indices and on any cluster that fails to load
    /// or decompress; callers degrade to an unknown probe result.
    pub fn get(&self, index: u64) -> Option<bool> {
        if index >= self.size_in_bits {
            return None;
        }

        match &self.repr {
            Repr::Vector(bits) => Some(bits.get(index)),
            Repr::Clustered { raf, info, cache } => {
                let byte = index / 8;
                let cluster = (byte / info.cluster_size() as u64) as u32;
                let id = info.signature().get();

                let bytes = cache
                    .get(id, cluster, || info.read_cluster(raf, cluster))
                    .map_err(|e| warn!("bitbase cluster {cluster} unavailable, {e}"))
                    .ok()?;

                let offset = (byte % info.cluster_size() as u64) as usize;
                Some(bytes.get(offset)? & (1 << (index % 8)) != 0)
            }
        }
    }

    /// Sets the bit at `index`.
    ///
    /// Only resident bitbases are writable; file-backed ones are read-only
    /// by construction.
    pub fn set(&mut self, index: u64) {
        if let Repr::Vector(bits) = &mut self.repr {
            bits.set(index);
        }
    }

    /// Clears the bit at `index` of a resident bitbase.
    pub fn clear(&mut self, index: u64) {
        if let Repr::Vector(bits) = &mut self.repr {
            bits.clear(index);
        }
    }

    /// Counts set bits from `begin` to the end.
    ///
    /// Only resident bitbases support this; it is a generation-side
    /// statistic.
    pub fn count_wins(&self, begin: u64) -> Option<u64> {
        match &self.repr {
            Repr::Vector(bits) => Some(bits.count_ones(begin)),
            Repr::Clustered { .. } => None,
        }
    }

    /// Appends to `out` every index set here and clear in `and_not`; both
    /// bitbases must be resident.
    pub fn ones_and_not(&self, and_not: &Bitbase, out: &mut Vec<u64>) {
        if let (Repr::Vector(a), Repr::Vector(b)) = (&self.repr, &and_not.repr) {
            a.ones_and_not(b, out);
        }
    }

    /// Stores the bits in the clustered format.
    pub fn store(
        &self,
        path: &Path,
        signature: Signature,
        cluster_size: u32,
        codec: Codec,
    ) -> io::Result<()> {
        match &self.repr {
            Repr::Clustered { .. } => Err(io::Error::from(io::ErrorKind::Unsupported)),
            Repr::Vector(bits) => file::write(
                path,
                signature,
                self.size_in_bits,
                &bits.to_bytes(),
                cluster_size,
                codec,
            ),
        }
    }

    /// Renders the complete file image of the bits.
    pub fn to_image(
        &self,
        signature: Signature,
        cluster_size: u32,
        codec: Codec,
    ) -> Option<Vec<u8>> {
        match &self.repr {
            Repr::Clustered { .. } => None,
            Repr::Vector(bits) => Some(file::write_image(
                signature,
                self.size_in_bits,
                &bits.to_bytes(),
                cluster_size,
                codec,
            )),
        }
    }
}

fn io_invalid(e: FileError) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitbase::{DEFAULT_CLUSTER_SIZE, Roster};
    use std::fmt::Debug;
    use proptest::collection::vec;
    use tempfile::TempDir;
    use test_strategy::proptest;

    fn signature() -> Signature {
        "KQKR".parse::<Roster>().unwrap().signature()
    }

    fn cache() -> Arc<ClusterCache> {
        Arc::new(ClusterCache::with_capacity(64))
    }

    fn bits_from(indexes: &[u64], len: u64) -> BitVector {
        let mut bits = BitVector::new(len);
        for &i in indexes {
            bits.set(i % len);
        }

        bits
    }

    #[proptest(cases = 32)]
    fn clustered_probe_equals_resident_probe(
        codec: Codec,
        #[strategy(vec(0u64..100_000, 0..256))] indexes: Vec<u64>,
    ) {
        let bits = bits_from(&indexes, 100_000);
        let resident = Bitbase::from_vector(bits);

        let tmp = TempDir::new()?;
        let path = tmp.path().join("KQKR.btb");
        resident.store(&path, signature(), 512, codec)?;

        let attached = Bitbase::attach_with(&path, signature(), cache())?;
        assert!(!attached.is_resident());
        assert_eq!(attached.size_in_bits(), resident.size_in_bits());

        for i in (0..100_000).step_by(997) {
            assert_eq!(attached.get(i), resident.get(i));
        }

        for &i in &indexes {
            assert_eq!(attached.get(i % 100_000), Some(true));
        }
    }

    #[proptest(cases = 16)]
    fn read_resident_equals_original(
        codec: Codec,
        #[strategy(vec(0u64..50_000, 0..128))] indexes: Vec<u64>,
    ) {
        let bits = bits_from(&indexes, 50_000);
        let original = Bitbase::from_vector(bits);

        let tmp = TempDir::new()?;
        let path = tmp.path().join("KQKR.btb");
        original.store(&path, signature(), DEFAULT_CLUSTER_SIZE, codec)?;

        let resident = Bitbase::read_resident(&path, signature())?;
        assert!(resident.is_resident());
        assert_eq!(resident.count_wins(0), original.count_wins(0));
        for i in 0..50_000 {
            assert_eq!(resident.get(i), original.get(i));
        }
    }

    #[test]
    fn signature_mismatch_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("KQKR.btb");

        let bitbase = Bitbase::from_vector(bits_from(&[1, 2, 3], 1024));
        bitbase.store(&path, signature(), 512, Codec::Rle).unwrap();

        let other = "KRK".parse::<Roster>().unwrap().signature();
        assert!(Bitbase::attach_with(&path, other, cache()).is_err());
    }

    #[test]
    fn out_of_range_probe_is_none() {
        let bitbase = Bitbase::from_vector(BitVector::new(100));
        assert_eq!(bitbase.get(99), Some(false));
        assert_eq!(bitbase.get(100), None);
    }

    #[proptest(cases = 8)]
    fn image_roundtrips(codec: Codec, #[strategy(vec(0u64..10_000, 0..64))] indexes: Vec<u64>) {
        let original = Bitbase::from_vector(bits_from(&indexes, 10_000));
        let image = original.to_image(signature(), 256, codec).unwrap();

        let rebuilt = Bitbase::from_image(&image)?;
        assert_eq!(rebuilt.size_in_bits(), original.size_in_bits());
        for i in 0..10_000 {
            assert_eq!(rebuilt.get(i), original.get(i));
        }
    }

    #[test]
    fn concurrent_clustered_probes_agree_with_resident() {
        let indexes: Vec<u64> = (0..4096).map(|i| i * 37 % 65_536).collect();
        let resident = Bitbase::from_vector(bits_from(&indexes, 65_536));

        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("KQKR.btb");
        resident.store(&path, signature(), 256, Codec::Lz).unwrap();

        let attached = Bitbase::attach_with(&path, signature(), cache()).unwrap();

        std::thread::scope(|scope| {
            for t in 0..4u64 {
                let attached = &attached;
                let resident = &resident;
                scope.spawn(move || {
                    for i in 0..8192 {
                        let index = (i * 31 + t * 7919) % 65_536;
                        assert_eq!(attached.get(index), resident.get(index));
                    }
                });
            }
        });
    }
}
