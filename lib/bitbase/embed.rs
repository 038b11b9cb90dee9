use crate::bitbase::{Bitbase, FileError};
use std::io::{self, Write};

/// Packs a file image into little-endian 32-bit words, zero padded.
pub fn pack_words(image: &[u8]) -> Vec<u32> {
    image
        .chunks(4)
        .map(|chunk| {
            let mut word = [0u8; 4];
            word[..chunk.len()].copy_from_slice(chunk);
            u32::from_le_bytes(word)
        })
        .collect()
}

/// Recovers the first `len` bytes of a packed file image.
pub fn unpack_words(words: &[u32], len: usize) -> Vec<u8> {
    let mut image = Vec::with_capacity(words.len() * 4);
    for word in words {
        image.extend_from_slice(&word.to_le_bytes());
    }

    image.truncate(len);
    image
}

/// Rebuilds a bitbase from words emitted by [`write_rust_source`].
pub fn load_embedded(words: &[u32], len: usize) -> Result<Bitbase, FileError> {
    Bitbase::from_image(&unpack_words(words, len))
}

/// Emits a complete bitbase file image as compilable Rust source.
///
/// The array layout is identical to the on-disk format, so the embedded
/// table and the `.btb` file are interchangeable.
pub fn write_rust_source(out: &mut impl Write, name: &str, image: &[u8]) -> io::Result<()> {
    let words = pack_words(image);

    writeln!(out, "// Generated bitbase table; do not edit.")?;
    writeln!(out)?;
    writeln!(out, "pub const {name}_LEN: usize = {};", image.len())?;
    writeln!(out)?;
    writeln!(out, "pub static {name}: [u32; {}] = [", words.len())?;

    for line in words.chunks(8) {
        let mut row = String::from("   ");
        for word in line {
            row.push_str(&format!(" 0x{word:08X},"));
        }

        writeln!(out, "{row}")?;
    }

    writeln!(out, "];")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitbase::{BitVector, Codec, Roster, write_image};
    use proptest::collection::vec;
    use test_strategy::proptest;

    #[proptest]
    fn words_roundtrip(#[strategy(vec(0u8.., 0..512))] image: Vec<u8>) {
        let words = pack_words(&image);
        assert_eq!(unpack_words(&words, image.len()), image);
    }

    #[proptest(cases = 8)]
    fn embedded_table_equals_file_image(codec: Codec) {
        let mut bits = BitVector::new(10_000);
        for i in (0..10_000).step_by(7) {
            bits.set(i);
        }

        let signature = "KPK".parse::<Roster>().unwrap().signature();
        let image = write_image(signature, 10_000, &bits.to_bytes(), 256, codec);

        let words = pack_words(&image);
        let bitbase = load_embedded(&words, image.len())?;
        assert_eq!(bitbase.size_in_bits(), 10_000);

        for i in 0..10_000 {
            assert_eq!(bitbase.get(i), Some(bits.get(i)));
        }
    }

    #[test]
    fn emitted_source_declares_the_table() {
        let mut out = Vec::new();
        write_rust_source(&mut out, "KPK", &[1, 2, 3, 4, 5]).unwrap();

        let source = String::from_utf8(out).unwrap();
        assert!(source.contains("pub const KPK_LEN: usize = 5;"));
        assert!(source.contains("pub static KPK: [u32; 2] = ["));
        assert!(source.contains("0x04030201"));
        assert!(source.contains("0x00000005"));
    }
}
