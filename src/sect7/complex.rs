use log::warn;

use crate::sect5::{Data, DataRepresentationDefinition};
use crate::sect7::{groups, reference_fill, Grib2DataDecoder, ScaleParams, ALL_ONES};
use crate::utils::BitReader;
use crate::Grib2Error::ParseError;
use crate::{bitmap, Grib2DataReader, Result};

pub(crate) struct GridPointDataComplexPackingDecoder {}

impl Grib2DataDecoder for GridPointDataComplexPackingDecoder {
    fn decode(
        &self,
        data_repr_def: &DataRepresentationDefinition,
        reader: &Grib2DataReader,
        bitmap: Option<&[u8]>,
        slice: &[u8],
    ) -> Result<Box<[f32]>> {
        let data = match &data_repr_def.data {
            Data::Data2(data) => data,
            _ => {
                return Err(ParseError(String::from("Wrong decoder")));
            }
        };

        let mvm = data.missing_value_management;
        let missing = f32::NAN;
        let scale = ScaleParams::new(
            data.common.reference_value,
            data.common.binary_scale_factor,
            data.common.decimal_scale_factor,
        );
        let total_points = reader.total_points;

        if data.group_definition.num_groups == 0 {
            let filled = reference_fill(bitmap, total_points, scale.reference_quotient(), missing);
            return Ok(filled.into_boxed_slice());
        }

        let mut bits = BitReader::new_at(slice, reader.start_pos);
        let groups = groups::read_groups(&mut bits, data.common.num_bits, &data.group_definition)?;

        // The group lengths must account for every decoded point; a record
        // violating that degrades to all-missing instead of failing the batch.
        let total_length = groups::total_length(&groups);
        let expected = if mvm != 0 {
            total_points
        } else {
            reader.data_points
        };
        if total_length != expected {
            warn!(
                "group lengths sum to {} but expected {} points, degrading record at offset {} to missing",
                total_length, expected, reader.start_pos
            );
            return Ok(vec![missing; total_points].into_boxed_slice());
        }

        let mut decoded = Vec::with_capacity(total_length);
        for group in &groups {
            if group.width == 0 {
                // No deviations packed: the group is constant, or entirely
                // missing under missing-value management.
                let value = if mvm == 0 {
                    scale.apply(group.reference)
                } else {
                    missing
                };
                decoded.resize(decoded.len() + group.length, value);
            } else {
                let primary = ALL_ONES[group.width];
                let secondary = primary - 1;
                for _ in 0..group.length {
                    let x2 = bits.read(group.width)? as u32;
                    if mvm != 0 && (x2 == primary || (mvm == 2 && x2 == secondary)) {
                        decoded.push(missing);
                    } else {
                        decoded.push(scale.apply(u64::from(group.reference) + u64::from(x2)));
                    }
                }
            }
        }

        let decoded = match bitmap {
            Some(mask) => bitmap::scatter(&decoded, mask, total_points, missing),
            None => {
                decoded.resize(total_points, missing);
                decoded
            }
        };

        Ok(decoded.into_boxed_slice())
    }
}
