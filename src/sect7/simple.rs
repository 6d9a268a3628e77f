use crate::sect5::{Data, DataRepresentationDefinition};
use crate::sect7::{Grib2DataDecoder, ScaleParams};
use crate::utils::BitReader;
use crate::Grib2Error::ParseError;
use crate::{bitmap, Grib2DataReader, Result};

pub(crate) struct GridPointDataSimplePackingDecoder {}

impl Grib2DataDecoder for GridPointDataSimplePackingDecoder {
    fn decode(
        &self,
        data_repr_def: &DataRepresentationDefinition,
        reader: &Grib2DataReader,
        bitmap: Option<&[u8]>,
        slice: &[u8],
    ) -> Result<Box<[f32]>> {
        let data = match &data_repr_def.data {
            Data::Data0(data) => data,
            _ => {
                return Err(ParseError(String::from("Wrong decoder")));
            }
        };

        let scale = ScaleParams::new(
            data.reference_value,
            data.binary_scale_factor,
            data.decimal_scale_factor,
        );
        let total_points = reader.total_points;

        if data.num_bits == 0 {
            let decoded = vec![scale.reference_quotient(); total_points];
            return Ok(decoded.into_boxed_slice());
        }

        let mut bits = BitReader::new_at(slice, reader.start_pos);
        let mut decoded = Vec::with_capacity(total_points);

        match bitmap {
            None => {
                for _ in 0..total_points {
                    decoded.push(scale.apply(bits.read(data.num_bits)?));
                }
            }
            Some(mask) => {
                for i in 0..total_points {
                    if bitmap::is_set(mask, i) {
                        decoded.push(scale.apply(bits.read(data.num_bits)?));
                    } else {
                        decoded.push(f32::NAN);
                    }
                }
            }
        }

        Ok(decoded.into_boxed_slice())
    }
}
