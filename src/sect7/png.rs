use log::warn;

use crate::codec::PngCodec;
use crate::sect5::{Data, DataRepresentationDefinition};
use crate::sect7::{code_stream, Grib2DataDecoder, ScaleParams};
use crate::Grib2Error::{LengthMismatch, ParseError};
use crate::{bitmap, Grib2DataReader, Result};

pub(crate) struct GridPointDataPngDecoder<'a> {
    pub(crate) codec: &'a dyn PngCodec,
}

impl Grib2DataDecoder for GridPointDataPngDecoder<'_> {
    fn decode(
        &self,
        data_repr_def: &DataRepresentationDefinition,
        reader: &Grib2DataReader,
        bitmap: Option<&[u8]>,
        slice: &[u8],
    ) -> Result<Box<[f32]>> {
        let data = match &data_repr_def.data {
            Data::Data41(data) => data,
            _ => {
                return Err(ParseError(String::from("Wrong decoder")));
            }
        };

        let scale = ScaleParams::new(
            data.common.reference_value,
            data.common.binary_scale_factor,
            data.common.decimal_scale_factor,
        );
        let total_points = reader.total_points;

        // Nothing packed: the whole grid sits at the reference value and the
        // codec is never invoked.
        if data.common.num_bits == 0 {
            let decoded = vec![scale.reference_quotient(); total_points];
            return Ok(decoded.into_boxed_slice());
        }

        let idata = self
            .codec
            .decode(code_stream(slice, reader.data_length), data.common.num_bits as u32)?;

        match bitmap {
            None => {
                // The raster must cover every expected data point; a padded
                // image may carry surplus samples, which are ignored.
                if idata.len() < reader.data_points {
                    return Err(LengthMismatch {
                        expected: reader.data_points,
                        actual: idata.len(),
                    });
                }
                let mut decoded = vec![f32::NAN; total_points];
                for (out, &v) in decoded.iter_mut().zip(&idata).take(reader.data_points) {
                    *out = scale.apply(v);
                }
                Ok(decoded.into_boxed_slice())
            }
            Some(mask) => {
                let mut decoded = vec![f32::NAN; total_points];
                let mut next = 0;
                for (i, out) in decoded.iter_mut().enumerate() {
                    if !bitmap::is_set(mask, i) {
                        continue;
                    }
                    if next >= idata.len() {
                        warn!(
                            "raster holds {} samples but the bitmap marks more points present, record at offset {}",
                            idata.len(),
                            reader.start_pos
                        );
                        break;
                    }
                    *out = scale.apply(idata[next]);
                    next += 1;
                }
                Ok(decoded.into_boxed_slice())
            }
        }
    }
}
