use crate::decompress::{DecompressError, Decompressor as InternalDecompressor};
use std::io;

/// High-level decompression interface that owns its output allocation and
/// reports failures as [`io::Error`].
pub struct Decompressor {
    inner: InternalDecompressor,
    max_memory_limit: usize,
    limit_ratio: usize,
}

impl Decompressor {
    pub fn new() -> Self {
        Self {
            inner: InternalDecompressor::new(),
            max_memory_limit: usize::MAX,
            limit_ratio: 2000,
        }
    }

    /// Cap the output allocation a single call may make.
    pub fn set_max_memory_limit(&mut self, limit: usize) {
        self.max_memory_limit = limit;
    }

    /// Cap the accepted `expected_size`-to-input ratio.
    pub fn set_limit_ratio(&mut self, ratio: usize) {
        self.limit_ratio = ratio;
    }

    /// Decompress a raw DEFLATE stream into a freshly allocated `Vec`.
    /// `expected_size` is the caller's upper bound on the decompressed
    /// size; the returned vector is truncated to the actual size.
    pub fn decompress_deflate(&mut self, data: &[u8], expected_size: usize) -> io::Result<Vec<u8>> {
        // Refuse to allocate wildly more than the input could possibly
        // expand to (DEFLATE tops out near 1032:1), so a tiny corrupt or
        // hostile input cannot request gigabytes up front.
        let limit = data
            .len()
            .saturating_mul(self.limit_ratio)
            .saturating_add(4096);
        if expected_size > limit {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "Expected size {} exceeds safety limit for input size {}",
                    expected_size,
                    data.len()
                ),
            ));
        }

        if expected_size > self.max_memory_limit {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "Expected size {} exceeds maximum memory limit {}",
                    expected_size, self.max_memory_limit
                ),
            ));
        }

        let mut output = Vec::new();
        output
            .try_reserve_exact(expected_size)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        output.resize(expected_size, 0);

        let size = self
            .inner
            .decompress(data, &mut output)
            .map_err(into_io_error)?;
        output.truncate(size);
        Ok(output)
    }

    /// Decompress a raw DEFLATE stream into a caller-provided buffer,
    /// returning the number of bytes written.
    pub fn decompress_deflate_into(&mut self, data: &[u8], output: &mut [u8]) -> io::Result<usize> {
        self.inner.decompress(data, output).map_err(into_io_error)
    }
}

impl Default for Decompressor {
    fn default() -> Self {
        Self::new()
    }
}

fn into_io_error(err: DecompressError) -> io::Error {
    let kind = match err {
        DecompressError::BadData => io::ErrorKind::InvalidData,
        DecompressError::ShortOutput | DecompressError::InsufficientSpace => {
            io::ErrorKind::WriteZero
        }
    };
    io::Error::new(kind, err)
}
