use log::warn;

use crate::sect5::{Data, DataRepresentationDefinition};
use crate::sect7::{groups, reference_fill, Grib2DataDecoder, ScaleParams, ALL_ONES};
use crate::utils::BitReader;
use crate::Grib2Error::ParseError;
use crate::{bitmap, Grib2DataReader, Result};

pub(crate) struct GridPointDataComplexPackingSpacialDiffDecoder {}

impl Grib2DataDecoder for GridPointDataComplexPackingSpacialDiffDecoder {
    fn decode(
        &self,
        data_repr_def: &DataRepresentationDefinition,
        reader: &Grib2DataReader,
        bitmap: Option<&[u8]>,
        slice: &[u8],
    ) -> Result<Box<[f32]>> {
        let data = match &data_repr_def.data {
            Data::Data3(data) => data,
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

        // First value(s) of the undifferenced field, then the overall minimum
        // of the differences, each at the descriptor width with a sign bit.
        let descriptor_bits = data.spacial_difference_size as usize * 8;
        if descriptor_bits == 0 {
            warn!(
                "spatial differencing descriptor size is zero at offset {}, degrading record to missing",
                reader.start_pos
            );
            return Ok(vec![missing; total_points].into_boxed_slice());
        }
        let ival1 = bits.read_signed(descriptor_bits)? as i64;
        let ival2 = if data.spacial_difference_order == 2 {
            bits.read_signed(descriptor_bits)? as i64
        } else {
            0
        };
        let minsd = bits.read_signed(descriptor_bits)? as i64;

        let groups = groups::read_groups(&mut bits, data.common.num_bits, &data.group_definition)?;

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

        // Residuals come out as a dense sequence; under missing-value
        // management the missing slots are kept aside so the recurrence only
        // walks real values.
        let mut residuals: Vec<i64> = Vec::with_capacity(total_length);
        let mut present: Vec<bool> = Vec::new();
        if mvm == 0 {
            for group in &groups {
                if group.width == 0 {
                    residuals.resize(residuals.len() + group.length, i64::from(group.reference));
                } else {
                    for _ in 0..group.length {
                        let x2 = bits.read(group.width)?;
                        residuals.push(x2 as i64 + i64::from(group.reference));
                    }
                }
            }
        } else {
            present = Vec::with_capacity(total_length);
            for group in &groups {
                if group.width == 0 {
                    // Constant group: the reference itself may be the
                    // sentinel, judged at the record's field width.
                    let primary = ALL_ONES[data.common.num_bits];
                    let secondary = primary.wrapping_sub(1);
                    let group_missing = group.reference == primary
                        || (mvm == 2 && group.reference == secondary);
                    for _ in 0..group.length {
                        present.push(!group_missing);
                        if !group_missing {
                            residuals.push(i64::from(group.reference));
                        }
                    }
                } else {
                    let primary = ALL_ONES[group.width];
                    let secondary = primary - 1;
                    for _ in 0..group.length {
                        let x2 = bits.read(group.width)? as u32;
                        if x2 == primary || (mvm == 2 && x2 == secondary) {
                            present.push(false);
                        } else {
                            present.push(true);
                            residuals.push(i64::from(x2) + i64::from(group.reference));
                        }
                    }
                }
            }
        }

        undifference(
            &mut residuals,
            data.spacial_difference_order,
            ival1,
            ival2,
            minsd,
        );

        let decoded: Vec<f32> = if mvm == 0 {
            residuals.iter().map(|&v| scale.apply(v)).collect()
        } else {
            let mut values = residuals.iter();
            present
                .iter()
                .map(|&ok| {
                    if ok {
                        values.next().map(|&v| scale.apply(v)).unwrap_or(missing)
                    } else {
                        missing
                    }
                })
                .collect()
        };

        let decoded = match bitmap {
            Some(mask) => bitmap::scatter(&decoded, mask, total_points, missing),
            None => {
                let mut decoded = decoded;
                decoded.resize(total_points, missing);
                decoded
            }
        };

        Ok(decoded.into_boxed_slice())
    }
}

/// Reverses the spatial differencing applied before packing. At order 1 the
/// stream holds G(n) = F(n) - F(n-1) with the overall minimum removed; at
/// order 2 it holds the second differences.
fn undifference(values: &mut [i64], order: u8, ival1: i64, ival2: i64, minsd: i64) {
    if values.is_empty() {
        return;
    }
    match order {
        1 => {
            values[0] = ival1;
            for i in 1..values.len() {
                values[i] += minsd + values[i - 1];
            }
        }
        2 => {
            values[0] = ival1;
            if values.len() > 1 {
                values[1] = ival2;
            }
            for i in 2..values.len() {
                values[i] += minsd + 2 * values[i - 1] - values[i - 2];
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sect5::{Data0, Data3, GroupDefinition};

    fn definition(
        num_bits: usize,
        mvm: u8,
        order: u8,
        descriptor_size: u8,
        groups: GroupDefinition,
        num_points: usize,
    ) -> DataRepresentationDefinition {
        DataRepresentationDefinition {
            num_points,
            template_number: 3,
            data: Data::Data3(Data3 {
                common: Data0 {
                    reference_value: 0.0,
                    binary_scale_factor: 0,
                    decimal_scale_factor: 0,
                    num_bits,
                    values_type: 0,
                },
                group_method: 1,
                missing_value_management: mvm,
                missing_substitute_primary: 0.0,
                missing_substitute_secondary: 0.0,
                group_definition: groups,
                spacial_difference_order: order,
                spacial_difference_size: descriptor_size,
            }),
        }
    }

    fn one_group(last_length: u32, widths_num_bits: usize) -> GroupDefinition {
        GroupDefinition {
            num_groups: 1,
            group_widths_reference: 0,
            group_widths_num_bits: widths_num_bits,
            group_lengths_reference: 0,
            group_lengths_increment: 1,
            group_lengths_last: last_length,
            group_scaled_lengths_num_bits: 0,
        }
    }

    fn reader(total: usize, data_points: usize) -> Grib2DataReader {
        Grib2DataReader::new(3, total, data_points, 0, total, 0, 0)
    }

    #[test]
    fn first_order_recurrence_accumulates_residuals() {
        // g1 = 10, overall minimum 0, residuals [_, 3, 3] -> [10, 13, 16].
        let drd = definition(4, 0, 1, 1, one_group(3, 3), 3);
        let payload = [
            0b0000_1010, // g1 = +10
            0b0000_0000, // minimum = 0
            0b0000_0000, // group reference X1 = 0
            0b0100_0000, // group width = 2
            0b0011_1100, // residuals 0, 3, 3 at 2 bits, padded
        ];
        let out = GridPointDataComplexPackingSpacialDiffDecoder {}
            .decode(&drd, &reader(3, 3), None, &payload)
            .unwrap();
        assert_eq!(&out[..], &[10.0, 13.0, 16.0]);
    }

    #[test]
    fn second_order_recurrence_restores_the_field() {
        // h1 = 1, h2 = 3, minimum 0, third residual 2:
        // f[2] = 2 + 2*3 - 1 = 7.
        let drd = definition(4, 0, 2, 1, one_group(3, 3), 3);
        let payload = [
            0b0000_0001, // h1 = +1
            0b0000_0011, // h2 = +3
            0b0000_0000, // minimum = 0
            0b0000_0000, // X1 = 0
            0b0100_0000, // width = 2
            0b0000_1000, // residuals 0, 0, 2
        ];
        let out = GridPointDataComplexPackingSpacialDiffDecoder {}
            .decode(&drd, &reader(3, 3), None, &payload)
            .unwrap();
        assert_eq!(&out[..], &[1.0, 3.0, 7.0]);
    }

    #[test]
    fn negative_overall_minimum_is_sign_magnitude() {
        // g1 = 10, minimum = -1, residuals [_, 3, 3] -> [10, 12, 14].
        let drd = definition(4, 0, 1, 1, one_group(3, 3), 3);
        let payload = [
            0b0000_1010,
            0b1000_0001, // sign bit set, magnitude 1
            0b0000_0000,
            0b0100_0000,
            0b0011_1100,
        ];
        let out = GridPointDataComplexPackingSpacialDiffDecoder {}
            .decode(&drd, &reader(3, 3), None, &payload)
            .unwrap();
        assert_eq!(&out[..], &[10.0, 12.0, 14.0]);
    }

    #[test]
    fn missing_points_do_not_enter_the_recurrence() {
        // Width 2: 0b11 is the primary sentinel. Residual stream is
        // [_, 3(missing), 1, 1]; the recurrence walks [10, 11, 12] and the
        // missing slot is refilled afterwards.
        let drd = definition(4, 1, 1, 1, one_group(4, 3), 4);
        let payload = [
            0b0000_1010, // g1 = +10
            0b0000_0000, // minimum = 0
            0b0000_0000, // X1 = 0
            0b0100_0000, // width = 2
            0b0011_0101, // residuals 0, 3, 1, 1
        ];
        let out = GridPointDataComplexPackingSpacialDiffDecoder {}
            .decode(&drd, &reader(4, 4), None, &payload)
            .unwrap();
        assert_eq!(out[0], 10.0);
        assert!(out[1].is_nan());
        assert_eq!(out[2], 11.0);
        assert_eq!(out[3], 12.0);
    }

    #[test]
    fn zero_descriptor_size_degrades_to_all_missing() {
        let _ = env_logger::builder().is_test(true).try_init();
        let drd = definition(4, 0, 1, 0, one_group(3, 3), 3);
        let out = GridPointDataComplexPackingSpacialDiffDecoder {}
            .decode(&drd, &reader(3, 3), None, &[])
            .unwrap();
        assert!(out.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn group_sum_mismatch_degrades_to_all_missing() {
        let _ = env_logger::builder().is_test(true).try_init();
        let drd = definition(4, 0, 1, 1, one_group(5, 3), 3);
        let payload = [
            0b0000_1010,
            0b0000_0000,
            0b0000_0000,
            0b0100_0000,
            0b0011_1100,
        ];
        let out = GridPointDataComplexPackingSpacialDiffDecoder {}
            .decode(&drd, &reader(3, 3), None, &payload)
            .unwrap();
        assert_eq!(out.len(), 3);
        assert!(out.iter().all(|v| v.is_nan()));
    }
}
