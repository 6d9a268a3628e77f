use crate::sect5::{Data, DataRepresentationDefinition};
use crate::sect7::Grib2DataDecoder;
use crate::utils::BitReader;
use crate::Grib2Error::{DecodeError, ParseError};
use crate::{Grib2DataReader, Result};

/// Second-order general extended packing (template 50002). The group
/// descriptors and first-order values form one continuous bitstream with no
/// re-alignment between the arrays, unlike the WMO complex templates. The
/// final scaling is `Y = (X * 2^E + R) * 10^D`; the decimal factor really is
/// multiplicative here, the opposite convention from every other template.
pub(crate) struct GridPointDataSecondOrderDecoder {}

impl Grib2DataDecoder for GridPointDataSecondOrderDecoder {
    fn decode(
        &self,
        data_repr_def: &DataRepresentationDefinition,
        reader: &Grib2DataReader,
        _bitmap: Option<&[u8]>,
        slice: &[u8],
    ) -> Result<Box<[f32]>> {
        let data = match &data_repr_def.data {
            Data::Data50002(data) => data,
            _ => {
                return Err(ParseError(String::from("Wrong decoder")));
            }
        };

        let total_points = reader.total_points;
        let p1 = data.p1 as usize;
        let mut bits = BitReader::new_at(slice, reader.start_pos);

        let mut group_widths = vec![0usize; p1];
        for width in group_widths.iter_mut() {
            *width = bits.read(data.width_of_width)? as usize;
        }

        let mut group_lengths = vec![0usize; p1];
        for length in group_lengths.iter_mut() {
            *length = bits.read(data.width_of_length)? as usize;
        }

        let mut first_order_values = vec![0i64; p1];
        for value in first_order_values.iter_mut() {
            *value = bits.read(data.width_of_first_order_values)? as i64;
        }

        let order = data.order_of_spd;
        let bias = if order > 0 {
            i64::from(data.spd[order])
        } else {
            0
        };

        // The first `order` slots are reserved for the header seeds; groups
        // fill the rest.
        let mut values = vec![0i64; total_points];
        let mut count = order;
        for i in 0..p1 {
            for _ in 0..group_lengths[i] {
                if count >= total_points {
                    return Err(DecodeError(format!(
                        "group lengths exceed the grid size {}",
                        total_points
                    )));
                }
                values[count] = if group_widths[i] > 0 {
                    bits.read(group_widths[i])? as i64 + first_order_values[i]
                } else {
                    first_order_values[i]
                };
                count += 1;
            }
        }

        for i in 0..order.min(total_points) {
            values[i] = i64::from(data.spd[i]);
        }

        match order {
            1 if total_points > 1 => {
                let mut y = values[0];
                for value in values.iter_mut().skip(1) {
                    y += *value + bias;
                    *value = y;
                }
            }
            2 if total_points > 2 => {
                let mut y = values[1] - values[0];
                let mut z = values[1];
                for value in values.iter_mut().skip(2) {
                    y += *value + bias;
                    z += y;
                    *value = z;
                }
            }
            3 if total_points > 3 => {
                let mut y = values[2] - values[1];
                let mut z = y - (values[1] - values[0]);
                let mut w = values[2];
                for value in values.iter_mut().skip(3) {
                    z += *value + bias;
                    y += z;
                    w += y;
                    *value = w;
                }
            }
            _ => {}
        }

        let ee = 2_f32.powi(data.binary_scale_factor as i32);
        let dd = 10_f32.powi(data.decimal_scale_factor as i32);
        let r = data.reference_value;

        let decoded: Vec<f32> = values.iter().map(|&v| (v as f32 * ee + r) * dd).collect();
        Ok(decoded.into_boxed_slice())
    }
}
