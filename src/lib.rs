//! Unpacks the grid-point data section of a GRIB2 record into a dense
//! row-major `f32` raster, `NaN` standing for missing points.
//!
//! The surrounding message envelope is the caller's business: this crate is
//! handed the parsed Data Representation Template ([`sect5::Data`]), the
//! bit-map section content ([`BitMap`]), the point counts and scan mode from
//! the grid definition, and the section 7 payload bytes (everything after the
//! five section-header octets). It gives back `total_points` values in
//! normalized scan order, whatever packing the producer chose.

use log::error;

pub mod codec;
pub mod sect5;

mod bitmap;
mod scan;
mod sect7;
mod utils;

pub use bitmap::BitMap;
pub use codec::{CodecError, Jpeg2000Codec, PngCodec};

use sect5::{Data, DataRepresentationDefinition};
use sect7::complex::GridPointDataComplexPackingDecoder;
use sect7::complex_spacial_diff::GridPointDataComplexPackingSpacialDiffDecoder;
use sect7::jpeg2000::GridPointDataJpeg2000Decoder;
use sect7::png::GridPointDataPngDecoder;
use sect7::second_order::GridPointDataSecondOrderDecoder;
use sect7::simple::GridPointDataSimplePackingDecoder;
use sect7::Grib2DataDecoder;

/// External image codecs the caller binds in. Templates 40 and 41 refuse to
/// decode when their codec is absent; every other template ignores this.
#[derive(Default, Clone, Copy)]
pub struct Codecs<'a> {
    pub jpeg2000: Option<&'a dyn Jpeg2000Codec>,
    pub png: Option<&'a dyn PngCodec>,
}

/// Reads the packed values of one record.
///
/// `total_points` is the grid size from the grid definition section;
/// `data_points` the number of explicitly packed values, which is smaller
/// when a bitmap thins the grid. `nx` is the effective row length used only
/// to normalize the scan order (the caller resolves quasi-regular grids to an
/// effective value). `start_pos` is the absolute byte offset of the data
/// section, carried for diagnostics.
pub struct Grib2DataReader {
    pub(crate) data_template: u16,
    pub(crate) total_points: usize,
    pub(crate) data_points: usize,
    pub(crate) scan_mode: u8,
    pub(crate) nx: usize,
    pub(crate) start_pos: u64,
    pub(crate) data_length: usize,
}

impl Grib2DataReader {
    pub fn new(
        data_template: u16,
        total_points: usize,
        data_points: usize,
        scan_mode: u8,
        nx: usize,
        start_pos: u64,
        data_length: usize,
    ) -> Self {
        Self {
            data_template,
            total_points,
            data_points,
            scan_mode,
            nx,
            start_pos,
            data_length,
        }
    }

    /// Decodes the payload into `total_points` floats in canonical raster
    /// order. `slice` holds the section 7 body, i.e. the bytes starting 5
    /// past the section start. The codecs are only consulted for the
    /// image-packed templates.
    pub fn read(
        &self,
        slice: &[u8],
        data_repr_def: &DataRepresentationDefinition,
        bitmap_section: &BitMap,
        codecs: &Codecs<'_>,
    ) -> Result<Box<[f32]>> {
        if self.data_template != data_repr_def.template_number {
            return Err(Grib2Error::ParseError(format!(
                "data representation template {} does not match the declared template {}",
                data_repr_def.template_number, self.data_template
            )));
        }

        let bitmap = bitmap_section.resolve(self.total_points)?;

        let mut data = match &data_repr_def.data {
            Data::Data0(_) => {
                GridPointDataSimplePackingDecoder {}.decode(data_repr_def, self, bitmap, slice)?
            }
            Data::Data2(_) => {
                GridPointDataComplexPackingDecoder {}.decode(data_repr_def, self, bitmap, slice)?
            }
            Data::Data3(_) => GridPointDataComplexPackingSpacialDiffDecoder {}.decode(
                data_repr_def,
                self,
                bitmap,
                slice,
            )?,
            Data::Data40(_) => {
                let codec = codecs.jpeg2000.ok_or(Grib2Error::MissingCodec(40))?;
                GridPointDataJpeg2000Decoder { codec }.decode(data_repr_def, self, bitmap, slice)?
            }
            Data::Data41(_) => {
                let codec = codecs.png.ok_or(Grib2Error::MissingCodec(41))?;
                GridPointDataPngDecoder { codec }.decode(data_repr_def, self, bitmap, slice)?
            }
            Data::Data50002(_) => {
                GridPointDataSecondOrderDecoder {}.decode(data_repr_def, self, bitmap, slice)?
            }
            Data::Unknown(_) => {
                error!(
                    "no decoder for data representation template {} at offset {}",
                    data_repr_def.template_number, self.start_pos
                );
                return Err(Grib2Error::UnsupportedTemplate(data_repr_def.template_number));
            }
        };

        scan::scanning_mode_check(&mut data, self.scan_mode, self.nx);

        Ok(data)
    }

    /// Extracts the entropy-decoded integers of a template 40 record without
    /// applying the scale and reference value. Missing points carry the
    /// sentinel `2^num_bits - 1`. Values keep the encoded scan order.
    pub fn read_raw(
        &self,
        slice: &[u8],
        data_repr_def: &DataRepresentationDefinition,
        bitmap_section: &BitMap,
        codec: &dyn Jpeg2000Codec,
    ) -> Result<Vec<i32>> {
        let bitmap = bitmap_section.resolve(self.total_points)?;

        match &data_repr_def.data {
            Data::Data40(data) => {
                GridPointDataJpeg2000Decoder { codec }.decode_raw(data, self, bitmap, slice)
            }
            _ => Err(Grib2Error::UnsupportedTemplate(data_repr_def.template_number)),
        }
    }
}

pub type Result<T, E = Grib2Error> = std::result::Result<T, E>;

#[derive(thiserror::Error, Debug)]
pub enum Grib2Error {
    #[error("UnsupportedTemplate({0})")]
    UnsupportedTemplate(u16),

    #[error("PredeterminedBitmap({0})")]
    PredeterminedBitmap(u8),

    #[error("BitmapLength({bytes} bytes for {total_points} points)")]
    BitmapLength { bytes: usize, total_points: usize },

    #[error("ReadOverflow({num_bits} bits at byte {pos}, record at offset {record_offset})")]
    ReadOverflow {
        pos: usize,
        num_bits: usize,
        record_offset: u64,
    },

    #[error("LengthMismatch(expected {expected}, got {actual})")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("MissingCodec({0})")]
    MissingCodec(u16),

    #[error("CodecError({0})")]
    Codec(#[from] CodecError),

    #[error("ParseError({0})")]
    ParseError(String),

    #[error("DecodeError({0})")]
    DecodeError(String),
}
