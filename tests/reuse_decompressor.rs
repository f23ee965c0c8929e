//! A decompressor must stay usable across calls, including after failures.

use flate2::write::DeflateEncoder;
use flate2::Compression;
use libinflate::decompress::{DecompressError, Decompressor};

use std::io::Write;

fn deflate(data: &[u8], level: u32) -> Vec<u8> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::new(level));
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

#[test]
fn reuse_across_block_types() {
    let mut decompressor = Decompressor::new();

    // Dynamic, then stored, then static-ish small input, then dynamic again.
    let texts: [&[u8]; 4] = [
        b"first payload first payload first payload",
        b"x",
        b"second payload entirely different in content",
        b"third third third third third third third third",
    ];
    let levels = [6, 0, 1, 9];

    for (data, level) in texts.iter().zip(levels) {
        let compressed = deflate(data, level);
        let mut output = vec![0u8; data.len()];
        let n = decompressor.decompress(&compressed, &mut output).unwrap();
        assert_eq!(&output[..n], *data);
    }
}

#[test]
fn reuse_after_bad_data() {
    let mut decompressor = Decompressor::new();
    let mut output = vec![0u8; 64];

    // Reserved block type.
    assert_eq!(
        decompressor.decompress(&[0x07, 0x00], &mut output),
        Err(DecompressError::BadData)
    );

    let data = b"recovers after an error";
    let compressed = deflate(data, 6);
    let n = decompressor.decompress(&compressed, &mut output).unwrap();
    assert_eq!(&output[..n], data);
}

#[test]
fn reuse_after_short_output() {
    let mut decompressor = Decompressor::new();
    let data = b"some reasonably long data that will not fit in four bytes";
    let compressed = deflate(data, 6);

    let mut small = [0u8; 4];
    assert!(decompressor.decompress(&compressed, &mut small).is_err());

    let mut output = vec![0u8; data.len()];
    let n = decompressor.decompress(&compressed, &mut output).unwrap();
    assert_eq!(&output[..n], data);
}

#[test]
fn dynamic_tables_do_not_leak_into_static_blocks() {
    let mut decompressor = Decompressor::new();

    // A dynamic stream overwrites the decode tables...
    let dynamic_data: Vec<u8> = (0..4000u32).map(|i| (i % 7) as u8 + b'a').collect();
    let compressed = deflate(&dynamic_data, 9);
    let mut output = vec![0u8; dynamic_data.len()];
    let n = decompressor.decompress(&compressed, &mut output).unwrap();
    assert_eq!(&output[..n], &dynamic_data[..]);

    // ...and a handcrafted static block must still decode afterwards.
    let static_block = [0x73, 0x04, 0x00]; // fixed Huffman, literal 'A'
    let mut out2 = [0u8; 4];
    let n = decompressor.decompress(&static_block, &mut out2).unwrap();
    assert_eq!(&out2[..n], b"A");
}
