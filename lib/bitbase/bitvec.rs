use std::sync::atomic::{AtomicU64, Ordering};

const BITS: u64 = u64::BITS as u64;

#[inline(always)]
fn words_for(len: u64) -> usize {
    len.div_ceil(BITS) as usize
}

/// A packed flat array of bits addressable by index.
///
/// Bits are little-endian within each 64-bit element, so the byte view
/// matches the on-disk layout on every platform after a little-endian word
/// store.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct BitVector {
    words: Vec<u64>,
    len: u64,
}

impl BitVector {
    /// A vector of `len` clear bits.
    pub fn new(len: u64) -> Self {
        BitVector {
            words: vec![0; words_for(len)],
            len,
        }
    }

    /// Reconstructs a vector from its little-endian byte image.
    pub fn from_bytes(bytes: &[u8], len: u64) -> Self {
        let mut words = vec![0u64; words_for(len)];
        for (i, chunk) in bytes.chunks(8).enumerate().take(words.len()) {
            let mut word = [0u8; 8];
            word[..chunk.len()].copy_from_slice(chunk);
            words[i] = u64::from_le_bytes(word);
        }

        BitVector { words, len }
    }

    /// The number of addressable bits.
    #[inline(always)]
    pub fn len(&self) -> u64 {
        self.len
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The bit at `index`, or `false` out of range.
    #[inline(always)]
    pub fn get(&self, index: u64) -> bool {
        index < self.len && self.words[(index / BITS) as usize] & (1 << (index % BITS)) != 0
    }

    /// Sets the bit at `index`.
    #[inline(always)]
    pub fn set(&mut self, index: u64) {
        if index < self.len {
            self.words[(index / BITS) as usize] |= 1 << (index % BITS);
        }
    }

    /// Clears the bit at `index`.
    #[inline(always)]
    pub fn clear(&mut self, index: u64) {
        if index < self.len {
            self.words[(index / BITS) as usize] &= !(1 << (index % BITS));
        }
    }

    /// Counts set bits from bit `begin` to the end.
    pub fn count_ones(&self, begin: u64) -> u64 {
        if begin >= self.len {
            return 0;
        }

        let first = (begin / BITS) as usize;
        let mut total = (self.words[first] >> (begin % BITS)).count_ones() as u64;
        for word in &self.words[first + 1..] {
            total += word.count_ones() as u64;
        }

        total
    }

    /// Appends to `out` every index set here and clear in `and_not`.
    pub fn ones_and_not(&self, and_not: &BitVector, out: &mut Vec<u64>) {
        debug_assert_eq!(self.len, and_not.len);
        for (i, (&a, &b)) in self.words.iter().zip(&and_not.words).enumerate() {
            let mut word = a & !b;
            while word != 0 {
                let bit = word.trailing_zeros() as u64;
                out.push(i as u64 * BITS + bit);
                word &= word - 1;
            }
        }
    }

    /// The little-endian byte image, `ceil(len / 8)` bytes long.
    pub fn to_bytes(&self) -> Vec<u8> {
        let len = self.len.div_ceil(8) as usize;
        let mut bytes = Vec::with_capacity(len);
        for word in &self.words {
            bytes.extend_from_slice(&word.to_le_bytes());
        }

        bytes.truncate(len);
        bytes
    }
}

/// A bit vector shared between generation workers.
///
/// Set is a monotone `fetch_or`; a stale read can only delay a decision by
/// one iteration, never fabricate one. Release/acquire pairs make sure a
/// worker that consumes a freshly queued candidate also observes the win
/// that queued it; the join barrier between iterations orders everything
/// else.
#[derive(Debug, Default)]
pub struct AtomicBits {
    words: Vec<AtomicU64>,
    len: u64,
}

impl AtomicBits {
    /// A vector of `len` clear bits.
    pub fn new(len: u64) -> Self {
        let mut words = Vec::with_capacity(words_for(len));
        words.resize_with(words_for(len), AtomicU64::default);
        AtomicBits { words, len }
    }

    /// The number of addressable bits.
    #[inline(always)]
    pub fn len(&self) -> u64 {
        self.len
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The bit at `index`, or `false` out of range.
    #[inline(always)]
    pub fn get(&self, index: u64) -> bool {
        index < self.len
            && self.words[(index / BITS) as usize].load(Ordering::Acquire) & (1 << (index % BITS))
                != 0
    }

    /// Sets the bit at `index`.
    #[inline(always)]
    pub fn set(&self, index: u64) {
        if index < self.len {
            self.words[(index / BITS) as usize].fetch_or(1 << (index % BITS), Ordering::Release);
        }
    }

    /// Clears the bit at `index`.
    #[inline(always)]
    pub fn clear(&self, index: u64) {
        if index < self.len {
            self.words[(index / BITS) as usize].fetch_and(!(1 << (index % BITS)), Ordering::AcqRel);
        }
    }

    /// Clears all bits.
    pub fn clear_all(&self) {
        for word in &self.words {
            word.store(0, Ordering::Release);
        }
    }

    /// A plain copy of the current contents.
    pub fn snapshot(&self) -> BitVector {
        BitVector {
            words: self.words.iter().map(|w| w.load(Ordering::Acquire)).collect(),
            len: self.len,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::collection::vec;
    use test_strategy::proptest;

    #[proptest]
    fn set_then_get(#[strategy(1u64..1000)] len: u64, #[strategy(0u64..1000)] index: u64) {
        let mut bits = BitVector::new(len);
        bits.set(index);
        assert_eq!(bits.get(index), index < len);
    }

    #[proptest]
    fn clear_undoes_set(#[strategy(1u64..1000)] len: u64, #[strategy(0u64..1000)] index: u64) {
        let mut bits = BitVector::new(len);
        bits.set(index);
        bits.clear(index);
        assert!(!bits.get(index));
    }

    #[proptest]
    fn out_of_range_get_is_false(#[strategy(1u64..1000)] len: u64) {
        let bits = BitVector::new(len);
        assert!(!bits.get(len));
        assert!(!bits.get(u64::MAX));
    }

    #[proptest]
    fn count_ones_counts_from_begin(
        #[strategy(vec(0u64..500, 0..32))] indexes: Vec<u64>,
        #[strategy(0u64..500)] begin: u64,
    ) {
        let mut bits = BitVector::new(500);
        for &i in &indexes {
            bits.set(i);
        }

        let mut sorted = indexes;
        sorted.sort_unstable();
        sorted.dedup();
        let expected = sorted.iter().filter(|&&i| i >= begin).count() as u64;
        assert_eq!(bits.count_ones(begin), expected);
    }

    #[proptest]
    fn byte_image_roundtrips(#[strategy(vec(0u64..321, 0..32))] indexes: Vec<u64>) {
        let mut bits = BitVector::new(321);
        for &i in &indexes {
            bits.set(i);
        }

        assert_eq!(BitVector::from_bytes(&bits.to_bytes(), 321), bits);
        assert_eq!(bits.to_bytes().len(), 41);
    }

    #[proptest]
    fn ones_and_not_excludes_mask(
        #[strategy(vec(0u64..300, 0..32))] set: Vec<u64>,
        #[strategy(vec(0u64..300, 0..32))] mask: Vec<u64>,
    ) {
        let mut a = BitVector::new(300);
        let mut b = BitVector::new(300);
        for &i in &set {
            a.set(i);
        }
        for &i in &mask {
            b.set(i);
        }

        let mut out = Vec::new();
        a.ones_and_not(&b, &mut out);
        for &i in &out {
            assert!(a.get(i) && !b.get(i));
        }

        for i in 0..300 {
            assert_eq!(out.contains(&i), a.get(i) && !b.get(i));
        }
    }

    #[proptest]
    fn atomic_bits_snapshot_matches(#[strategy(vec(0u64..300, 0..32))] set: Vec<u64>) {
        let bits = AtomicBits::new(300);
        for &i in &set {
            bits.set(i);
        }

        let snapshot = bits.snapshot();
        for i in 0..300 {
            assert_eq!(snapshot.get(i), bits.get(i));
        }
    }
}
