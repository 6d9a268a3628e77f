use num::ToPrimitive;

use crate::sect5::DataRepresentationDefinition;
use crate::{bitmap, Grib2DataReader, Result};

pub(crate) mod complex;
pub(crate) mod complex_spacial_diff;
mod groups;
pub(crate) mod jpeg2000;
pub(crate) mod png;
pub(crate) mod second_order;
pub(crate) mod simple;

pub(crate) trait Grib2DataDecoder {
    fn decode(
        &self,
        data_repr_def: &DataRepresentationDefinition,
        reader: &Grib2DataReader,
        bitmap: Option<&[u8]>,
        slice: &[u8],
    ) -> Result<Box<[f32]>>;
}

/// All-ones pattern for each bit width, `ALL_ONES[n] == 2^n - 1`. The
/// missing-value sentinels of the complex templates compare packed values
/// against these.
pub(crate) const ALL_ONES: [u32; 33] = {
    let mut table = [0u32; 33];
    let mut i = 0;
    while i < 33 {
        table[i] = ((1u64 << i) - 1) as u32;
        i += 1;
    }
    table
};

/// Shared reconstruction parameters: `Y = (R + X * 2^E) / 10^D`, carried as
/// precomputed factors the way the encoder regulation states them.
pub(crate) struct ScaleParams {
    reference_value: f32,
    binary_scale: f32,
    decimal_scale: f32,
}

impl ScaleParams {
    pub(crate) fn new(
        reference_value: f32,
        binary_scale_factor: i16,
        decimal_scale_factor: i16,
    ) -> Self {
        Self {
            reference_value,
            binary_scale: 2_f32.powi(binary_scale_factor as i32),
            decimal_scale: 10_f32.powi(-(decimal_scale_factor as i32)),
        }
    }

    pub(crate) fn apply<N: ToPrimitive>(&self, encoded: N) -> f32 {
        (self.reference_value + encoded.to_f32().expect("integer fits f32") * self.binary_scale)
            * self.decimal_scale
    }

    /// `R / 10^D`: the value of a point whose packed residual is absent.
    pub(crate) fn reference_quotient(&self) -> f32 {
        self.reference_value * self.decimal_scale
    }
}

/// The code stream of the image templates occupies the whole section body:
/// `data_length` counts the five section-header octets the caller already
/// stripped.
pub(crate) fn code_stream(slice: &[u8], data_length: usize) -> &[u8] {
    let declared = data_length.saturating_sub(5);
    if declared > 0 && declared < slice.len() {
        &slice[..declared]
    } else {
        slice
    }
}

/// Zero-group short circuit shared by the complex templates: the whole grid
/// sits at the reference value, thinned by the bitmap when one is present.
pub(crate) fn reference_fill(
    bitmap: Option<&[u8]>,
    total_points: usize,
    reference: f32,
    missing: f32,
) -> Vec<f32> {
    match bitmap {
        None => vec![reference; total_points],
        Some(bits) => (0..total_points)
            .map(|i| {
                if bitmap::is_set(bits, i) {
                    reference
                } else {
                    missing
                }
            })
            .collect(),
    }
}
