//! Call contracts for the external image codecs used by data representation
//! templates 40 (JPEG2000) and 41 (PNG). The codecs themselves live outside
//! this crate; bind any implementation (openjpeg, jasper, libpng, a pure-Rust
//! decoder) behind these traits.

/// Decodes a JPEG2000 code stream into one integer per encoded grid point.
///
/// `bit_depth` is the declared number of bits per packed value from the data
/// representation template; the returned vector length must match the number
/// of points the producer encoded.
pub trait Jpeg2000Codec {
    fn decode(&self, buf: &[u8], bit_depth: u32) -> Result<Vec<i32>, CodecError>;
}

/// Decodes a PNG stream into its raster samples in row-major order, one
/// integer per pixel.
///
/// `bit_depth` is the declared number of bits per packed value; producers
/// emit grayscale images whose pixel size matches it, and an implementation
/// may log a disagreement but should still return the samples it decoded.
pub trait PngCodec {
    fn decode(&self, buf: &[u8], bit_depth: u32) -> Result<Vec<i32>, CodecError>;
}

#[derive(thiserror::Error, Debug)]
pub enum CodecError {
    #[error("TruncatedStream({0})")]
    TruncatedStream(String),

    #[error("UnsupportedBitDepth({0})")]
    UnsupportedBitDepth(u32),

    #[error("CodecFailure({0})")]
    CodecFailure(String),
}
