//! Whole-buffer DEFLATE decompression.
//!
//! The decompressor state holds only the decode tables and the scratch
//! arrays that are too large to keep on the stack; everything else lives in
//! locals for the duration of one [`Decompressor::decompress`] call. The
//! full compressed input must be available up front: there is no support
//! for suspending and resuming mid-stream.

mod bitstream;
mod tables;
mod window;

use self::bitstream::InputBitStream;
use self::tables::*;
use self::window::DeflateWindow;
use crate::common::*;
use std::sync::OnceLock;
use thiserror::Error;

pub use self::tables::{
    LITLEN_ENOUGH, LITLEN_TABLEBITS, OFFSET_ENOUGH, OFFSET_TABLEBITS, PRECODE_ENOUGH,
    PRECODE_TABLEBITS,
};

/// Decompression failure. The decompressor state remains valid and
/// reusable after any error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecompressError {
    /// The compressed data is invalid.
    #[error("malformed DEFLATE stream")]
    BadData,
    /// A decoded literal or match did not fit the output buffer.
    #[error("output buffer exhausted mid-stream")]
    ShortOutput,
    /// A stored block's contents did not fit the output buffer.
    #[error("insufficient space in output buffer")]
    InsufficientSpace,
}

/// The order in which the precode codeword lengths are transmitted.
const DEFLATE_PRECODE_LENS_PERMUTATION: [u8; DEFLATE_NUM_PRECODE_SYMS] = [
    16, 17, 18, 0, 8, 7, 9, 6, 10, 5, 11, 4, 12, 3, 13, 2, 14, 1, 15,
];

/// A DEFLATE decompressor.
///
/// The struct is large (roughly 8 KiB of decode tables and scratch); prefer
/// allocating it once and reusing it across calls.
#[derive(Clone)]
pub struct Decompressor {
    precode_decode_table: [u32; PRECODE_ENOUGH],
    litlen_decode_table: [u32; LITLEN_ENOUGH],
    offset_decode_table: [u32; OFFSET_ENOUGH],

    precode_lens: [u8; DEFLATE_NUM_PRECODE_SYMS],
    lens: [u8; DEFLATE_NUM_LITLEN_SYMS + DEFLATE_NUM_OFFSET_SYMS + DEFLATE_MAX_LENS_OVERRUN],
    sorted_syms: [u16; DEFLATE_MAX_NUM_SYMS],

    static_codes_loaded: bool,
}

struct StaticHuffmanData {
    litlen_decode_table: [u32; LITLEN_ENOUGH],
    offset_decode_table: [u32; OFFSET_ENOUGH],
}

static STATIC_HUFFMAN_DATA: OnceLock<StaticHuffmanData> = OnceLock::new();

impl Decompressor {
    pub fn new() -> Self {
        Self {
            precode_decode_table: [0; PRECODE_ENOUGH],
            litlen_decode_table: [0; LITLEN_ENOUGH],
            offset_decode_table: [0; OFFSET_ENOUGH],
            precode_lens: [0; DEFLATE_NUM_PRECODE_SYMS],
            lens: [0; DEFLATE_NUM_LITLEN_SYMS + DEFLATE_NUM_OFFSET_SYMS + DEFLATE_MAX_LENS_OVERRUN],
            sorted_syms: [0; DEFLATE_MAX_NUM_SYMS],
            static_codes_loaded: false,
        }
    }

    /// Decompress a complete raw DEFLATE stream from `input` into `output`.
    ///
    /// Returns the number of bytes written on success. No zlib or gzip
    /// framing is parsed and no checksum is verified; callers wanting
    /// corruption detection should wrap the stream in an envelope that
    /// carries one.
    pub fn decompress(
        &mut self,
        input: &[u8],
        output: &mut [u8],
    ) -> Result<usize, DecompressError> {
        let mut stream = InputBitStream::new(input);
        let mut window = DeflateWindow::new(output);

        loop {
            let is_final_block = self.decompress_block(&mut stream, &mut window)?;
            if is_final_block {
                break;
            }
        }

        Ok(window.filled())
    }

    fn decompress_block(
        &mut self,
        stream: &mut InputBitStream<'_>,
        window: &mut DeflateWindow<'_>,
    ) -> Result<bool, DecompressError> {
        // Block header, and for dynamic blocks the three symbol counts:
        // BFINAL (1), BTYPE (2), HLIT (5), HDIST (5), HCLEN (4).
        stream.ensure_bits(1 + 2 + 5 + 5 + 4);

        let is_final_block = stream.pop_bits(1) != 0;
        match stream.pop_bits(2) as u8 {
            DEFLATE_BLOCKTYPE_UNCOMPRESSED => decompress_stored_block(stream, window)?,
            DEFLATE_BLOCKTYPE_STATIC_HUFFMAN => {
                self.load_static_huffman_codes();
                self.decompress_huffman_block(stream, window)?;
            }
            DEFLATE_BLOCKTYPE_DYNAMIC_HUFFMAN => {
                self.read_dynamic_huffman_header(stream)?;
                self.decompress_huffman_block(stream, window)?;
            }
            _ => return Err(DecompressError::BadData),
        }
        Ok(is_final_block)
    }

    /// Install the decode tables for the fixed codes of RFC 1951 section
    /// 3.2.6. They are built once per process and then copied; a flag skips
    /// even the copy across consecutive static blocks.
    fn load_static_huffman_codes(&mut self) {
        if self.static_codes_loaded {
            return;
        }

        let data = STATIC_HUFFMAN_DATA.get_or_init(|| {
            let mut d = Decompressor::new();
            d.lens[..144].fill(8);
            d.lens[144..256].fill(9);
            d.lens[256..280].fill(7);
            d.lens[280..DEFLATE_NUM_LITLEN_SYMS].fill(8);
            d.lens[DEFLATE_NUM_LITLEN_SYMS..DEFLATE_NUM_LITLEN_SYMS + DEFLATE_NUM_OFFSET_SYMS]
                .fill(5);

            let ok = d.build_offset_decode_table(DEFLATE_NUM_LITLEN_SYMS, DEFLATE_NUM_OFFSET_SYMS)
                && d.build_litlen_decode_table(DEFLATE_NUM_LITLEN_SYMS);
            assert!(ok, "the fixed DEFLATE codes are complete by construction");

            StaticHuffmanData {
                litlen_decode_table: d.litlen_decode_table,
                offset_decode_table: d.offset_decode_table,
            }
        });

        self.litlen_decode_table.copy_from_slice(&data.litlen_decode_table);
        self.offset_decode_table.copy_from_slice(&data.offset_decode_table);
        self.static_codes_loaded = true;
    }

    /// Read the header of a dynamic Huffman block and build the litlen and
    /// offset decode tables it describes.
    fn read_dynamic_huffman_header(
        &mut self,
        stream: &mut InputBitStream<'_>,
    ) -> Result<(), DecompressError> {
        // The 14 count bits were ensured along with the block header.
        let num_litlen_syms = stream.pop_bits(5) as usize + 257;
        let num_offset_syms = stream.pop_bits(5) as usize + 1;
        let num_explicit_precode_lens = stream.pop_bits(4) as usize + 4;

        if num_litlen_syms > 286 || num_offset_syms > 30 {
            return Err(DecompressError::BadData);
        }

        self.static_codes_loaded = false;

        // One refill covers all 19 3-bit precode lengths.
        stream.ensure_bits((DEFLATE_NUM_PRECODE_SYMS * 3) as u32);
        for i in 0..num_explicit_precode_lens {
            self.precode_lens[DEFLATE_PRECODE_LENS_PERMUTATION[i] as usize] =
                stream.pop_bits(3) as u8;
        }
        for i in num_explicit_precode_lens..DEFLATE_NUM_PRECODE_SYMS {
            self.precode_lens[DEFLATE_PRECODE_LENS_PERMUTATION[i] as usize] = 0;
        }

        if !self.build_precode_decode_table() {
            return Err(DecompressError::BadData);
        }

        // Expand the joined litlen+offset codeword-length vector.
        let total_syms = num_litlen_syms + num_offset_syms;
        let mut i = 0;
        while i < total_syms {
            stream.ensure_bits((DEFLATE_MAX_PRE_CODEWORD_LEN + 7) as u32);

            // The precode table never has subtables: PRECODE_TABLEBITS
            // equals the maximum precode codeword length.
            let entry =
                self.precode_decode_table[stream.bits(DEFLATE_MAX_PRE_CODEWORD_LEN as u32) as usize];
            stream.remove_bits(entry & HUFFDEC_LENGTH_MASK);
            let presym = entry >> HUFFDEC_RESULT_SHIFT;

            if presym < 16 {
                // Explicit codeword length.
                self.lens[i] = presym as u8;
                i += 1;
                continue;
            }

            // Run-length encoded lengths. Repeat counts are not clamped per
            // element; the vector's slack absorbs the worst-case overrun
            // (a 138-zero run with one slot remaining) and the exact-fill
            // check below rejects any stream that overruns. For the short
            // runs it is fastest to always store the maximum repeat count.
            if presym == 16 {
                // Repeat the previous length 3..=6 times.
                if i == 0 {
                    return Err(DecompressError::BadData);
                }
                let rep_val = self.lens[i - 1];
                let rep_count = 3 + stream.pop_bits(2) as usize;
                self.lens[i..i + 6].fill(rep_val);
                i += rep_count;
            } else if presym == 17 {
                // Repeat zero 3..=10 times.
                let rep_count = 3 + stream.pop_bits(3) as usize;
                self.lens[i..i + 10].fill(0);
                i += rep_count;
            } else {
                // Repeat zero 11..=138 times.
                let rep_count = 11 + stream.pop_bits(7) as usize;
                self.lens[i..i + rep_count].fill(0);
                i += rep_count;
            }
        }
        if i != total_syms {
            return Err(DecompressError::BadData);
        }

        // The offset table is built before the litlen table.
        if !self.build_offset_decode_table(num_litlen_syms, num_offset_syms) {
            return Err(DecompressError::BadData);
        }
        if !self.build_litlen_decode_table(num_litlen_syms) {
            return Err(DecompressError::BadData);
        }
        Ok(())
    }

    /// The main decode loop, shared by static and dynamic blocks. Runs
    /// until the end-of-block symbol.
    fn decompress_huffman_block(
        &self,
        stream: &mut InputBitStream<'_>,
        window: &mut DeflateWindow<'_>,
    ) -> Result<(), DecompressError> {
        loop {
            // Decode a litlen symbol.
            stream.ensure_bits(DEFLATE_MAX_LITLEN_CODEWORD_LEN as u32);
            let mut entry = self.litlen_decode_table[stream.bits(LITLEN_TABLEBITS as u32) as usize];
            if entry & HUFFDEC_SUBTABLE_POINTER != 0 {
                stream.remove_bits(LITLEN_TABLEBITS as u32);
                let subtable_start = ((entry >> HUFFDEC_RESULT_SHIFT) & 0xFFFF) as usize;
                entry = self.litlen_decode_table
                    [subtable_start + stream.bits(entry & HUFFDEC_LENGTH_MASK) as usize];
            }
            stream.remove_bits(entry & HUFFDEC_LENGTH_MASK);

            if entry & HUFFDEC_LITERAL != 0 {
                if window.available() == 0 {
                    return Err(DecompressError::ShortOutput);
                }
                window.push((entry >> HUFFDEC_RESULT_SHIFT) as u8);
                continue;
            }

            // Match or end-of-block. A single refill covers the extra
            // length bits, the offset codeword and the extra offset bits.
            let result = entry >> HUFFDEC_RESULT_SHIFT;
            stream.ensure_bits(bitstream::MAX_ENSURE);
            let length = (result >> HUFFDEC_LENGTH_BASE_SHIFT) as usize
                + stream.pop_bits(result & HUFFDEC_EXTRA_LENGTH_BITS_MASK) as usize;

            if length == HUFFDEC_END_OF_BLOCK_LENGTH as usize {
                return Ok(());
            }
            if length > window.available() {
                return Err(DecompressError::ShortOutput);
            }

            // Decode the match offset.
            let mut entry = self.offset_decode_table[stream.bits(OFFSET_TABLEBITS as u32) as usize];
            if entry & HUFFDEC_SUBTABLE_POINTER != 0 {
                stream.remove_bits(OFFSET_TABLEBITS as u32);
                let subtable_start = ((entry >> HUFFDEC_RESULT_SHIFT) & 0xFFFF) as usize;
                entry = self.offset_decode_table
                    [subtable_start + stream.bits(entry & HUFFDEC_LENGTH_MASK) as usize];
            }
            stream.remove_bits(entry & HUFFDEC_LENGTH_MASK);

            let result = entry >> HUFFDEC_RESULT_SHIFT;
            let offset = (result & HUFFDEC_OFFSET_BASE_MASK) as usize
                + stream.pop_bits(result >> HUFFDEC_EXTRA_OFFSET_BITS_SHIFT) as usize;

            // The match source may not begin before the start of the output.
            if offset > window.filled() {
                return Err(DecompressError::BadData);
            }
            window.copy_match(length, offset);
        }
    }

    fn build_precode_decode_table(&mut self) -> bool {
        build_decode_table(
            &mut self.precode_decode_table,
            &self.precode_lens,
            &PRECODE_DECODE_RESULTS,
            PRECODE_TABLEBITS,
            DEFLATE_MAX_PRE_CODEWORD_LEN,
            &mut self.sorted_syms,
        )
    }

    fn build_litlen_decode_table(&mut self, num_litlen_syms: usize) -> bool {
        build_decode_table(
            &mut self.litlen_decode_table,
            &self.lens[..num_litlen_syms],
            &LITLEN_DECODE_RESULTS,
            LITLEN_TABLEBITS,
            DEFLATE_MAX_LITLEN_CODEWORD_LEN,
            &mut self.sorted_syms,
        )
    }

    fn build_offset_decode_table(&mut self, num_litlen_syms: usize, num_offset_syms: usize) -> bool {
        build_decode_table(
            &mut self.offset_decode_table,
            &self.lens[num_litlen_syms..num_litlen_syms + num_offset_syms],
            &OFFSET_DECODE_RESULTS,
            OFFSET_TABLEBITS,
            DEFLATE_MAX_OFFSET_CODEWORD_LEN,
            &mut self.sorted_syms,
        )
    }
}

impl Default for Decompressor {
    fn default() -> Self {
        Self::new()
    }
}

/// Stored block: copy LEN bytes verbatim from the (byte-aligned) input.
fn decompress_stored_block(
    stream: &mut InputBitStream<'_>,
    window: &mut DeflateWindow<'_>,
) -> Result<(), DecompressError> {
    stream.align_input();

    if stream.bytes_remaining() < 4 {
        return Err(DecompressError::BadData);
    }
    let len = stream.read_u16_le() as usize;
    let nlen = stream.read_u16_le() as usize;
    if len != (!nlen & 0xFFFF) {
        return Err(DecompressError::BadData);
    }
    if len > stream.bytes_remaining() {
        return Err(DecompressError::BadData);
    }
    if len > window.available() {
        return Err(DecompressError::InsufficientSpace);
    }
    window.copy_from_input(stream, len);
    Ok(())
}
