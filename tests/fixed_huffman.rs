//! Static/fixed Huffman (BTYPE=01) blocks, driven by handcrafted streams.

use libinflate::decompress::{DecompressError, Decompressor};

fn decompress(input: &[u8], out_cap: usize) -> Result<Vec<u8>, DecompressError> {
    let mut decompressor = Decompressor::new();
    let mut output = vec![0u8; out_cap];
    let size = decompressor.decompress(input, &mut output)?;
    output.truncate(size);
    Ok(output)
}

#[test]
fn empty_fixed_block() {
    // BFINAL=1, BTYPE=01, end-of-block (7-bit codeword 0000000).
    let input = [0x03, 0x00];
    assert_eq!(decompress(&input, 16).unwrap(), b"");
}

#[test]
fn single_literal() {
    // 'A' is litlen symbol 65, fixed codeword 0x30 + 65 = 0b01110001,
    // followed by end-of-block.
    let input = [0x73, 0x04, 0x00];
    assert_eq!(decompress(&input, 16).unwrap(), b"A");
}

#[test]
fn rle_match_with_offset_one() {
    // Literal 'x', then a length-5/offset-1 match (litlen symbol 259,
    // offset symbol 0), then end-of-block.
    let input = [0xAB, 0x00, 0x03, 0x00];
    assert_eq!(decompress(&input, 16).unwrap(), b"xxxxxx");
}

#[test]
fn match_before_any_output_is_bad_data() {
    // The first symbol is already a match (litlen symbol 257, codeword
    // 0b0000001): there is no history for its back-reference.
    let input = [0x03, 0x02, 0x00];
    assert_eq!(decompress(&input, 16), Err(DecompressError::BadData));
}

#[test]
fn consecutive_static_blocks_reuse_cached_tables() {
    // Two static blocks back to back, each holding one 'A'.
    // Block 1 (BFINAL=0): bits 0,10, 'A', EOB = 18 bits.
    // Block 2 (BFINAL=1) starts at bit 18.
    let input = [0x72, 0x04, 0xCC, 0x11, 0x00];
    assert_eq!(decompress(&input, 16).unwrap(), b"AA");
}

#[test]
fn literal_overflowing_output_is_short_output() {
    let input = [0x73, 0x04, 0x00];
    assert_eq!(decompress(&input, 0), Err(DecompressError::ShortOutput));
}

#[test]
fn match_overflowing_output_is_short_output() {
    // "xxxxxx" needs six bytes.
    let input = [0xAB, 0x00, 0x03, 0x00];
    assert_eq!(decompress(&input, 3), Err(DecompressError::ShortOutput));
}
