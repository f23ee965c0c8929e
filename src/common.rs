pub const DEFLATE_BLOCKTYPE_UNCOMPRESSED: u8 = 0;
pub const DEFLATE_BLOCKTYPE_STATIC_HUFFMAN: u8 = 1;
pub const DEFLATE_BLOCKTYPE_DYNAMIC_HUFFMAN: u8 = 2;

pub const DEFLATE_MIN_MATCH_LEN: usize = 3;
pub const DEFLATE_MAX_MATCH_LEN: usize = 258;

pub const DEFLATE_MAX_MATCH_OFFSET: usize = 32768;
pub const DEFLATE_WINDOW_ORDER: usize = 15;

pub const DEFLATE_NUM_PRECODE_SYMS: usize = 19;
pub const DEFLATE_NUM_LITLEN_SYMS: usize = 288;
pub const DEFLATE_NUM_OFFSET_SYMS: usize = 32;

pub const DEFLATE_MAX_NUM_SYMS: usize = 288;

pub const DEFLATE_NUM_LITERALS: usize = 256;
pub const DEFLATE_END_OF_BLOCK: usize = 256;
pub const DEFLATE_FIRST_LEN_SYM: usize = 257;

pub const DEFLATE_MAX_PRE_CODEWORD_LEN: usize = 7;
pub const DEFLATE_MAX_LITLEN_CODEWORD_LEN: usize = 15;
pub const DEFLATE_MAX_OFFSET_CODEWORD_LEN: usize = 15;

pub const DEFLATE_MAX_CODEWORD_LEN: usize = 15;

/// Worst-case overrun of the joined codeword-length vector: a run of 138
/// zeros written when only one length remained to be filled.
pub const DEFLATE_MAX_LENS_OVERRUN: usize = 137;

pub const DEFLATE_MAX_EXTRA_LENGTH_BITS: usize = 5;
pub const DEFLATE_MAX_EXTRA_OFFSET_BITS: usize = 13;
