//! Group descriptor decoding shared by the complex packing templates: the
//! reference value, bit width and length of each run of grid points. Each of
//! the three descriptor arrays is padded with zero bits to end on an octet
//! boundary.

use crate::sect5::GroupDefinition;
use crate::utils::BitReader;
use crate::{Grib2Error, Result};

pub(crate) struct Group {
    /// Local reference value, X1 in the reconstruction formula.
    pub(crate) reference: u32,
    /// Bits per packed deviation; zero means the whole group is constant.
    pub(crate) width: usize,
    /// Number of grid points in the group.
    pub(crate) length: usize,
}

pub(crate) fn read_groups(
    reader: &mut BitReader<'_>,
    num_bits: usize,
    group_definition: &GroupDefinition,
) -> Result<Vec<Group>> {
    let ng = group_definition.num_groups;

    // NG group reference values at the field width of the whole record.
    let mut references = vec![0u32; ng];
    if num_bits != 0 {
        for reference in references.iter_mut() {
            *reference = reader.read(num_bits)? as u32;
        }
    }
    reader.align_to_byte();

    // NG group widths, offset by the reference width.
    let width_reference = group_definition.group_widths_reference as usize;
    let mut widths = vec![0usize; ng];
    for width in widths.iter_mut() {
        *width = reader.read(group_definition.group_widths_num_bits)? as usize + width_reference;
        if *width > 32 {
            return Err(Grib2Error::DecodeError(format!(
                "group width {} exceeds 32 bits",
                width
            )));
        }
    }
    reader.align_to_byte();

    // NG scaled group lengths, Ln = ref + Kn * len_inc. The last group does
    // not follow the increment rule; its true length comes from the template.
    let length_reference = group_definition.group_lengths_reference;
    let length_increment = u32::from(group_definition.group_lengths_increment);
    let mut lengths = vec![0u32; ng];
    for length in lengths.iter_mut() {
        *length = reader.read(group_definition.group_scaled_lengths_num_bits)? as u32
            * length_increment
            + length_reference;
    }
    if ng > 0 {
        lengths[ng - 1] = group_definition.group_lengths_last;
    }
    reader.align_to_byte();

    Ok(references
        .into_iter()
        .zip(widths)
        .zip(lengths)
        .map(|((reference, width), length)| Group {
            reference,
            width,
            length: length as usize,
        })
        .collect())
}

pub(crate) fn total_length(groups: &[Group]) -> usize {
    groups.iter().map(|g| g.length).sum()
}
