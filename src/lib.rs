//! A whole-buffer DEFLATE (RFC 1951) decompressor.
//!
//! The decoder reads a complete raw DEFLATE bitstream from memory and
//! writes the reconstructed bytes into a caller-provided buffer, using
//! libdeflate-style direct-lookup Huffman tables with subtables for long
//! codewords, a word-sized input bit buffer, and word-at-a-time match
//! copies. Container formats (zlib/gzip) and checksums are out of scope.

pub mod api;
pub mod batch;
pub mod common;
pub mod decompress;

pub use api::Decompressor;
pub use decompress::DecompressError;
