use crate::{Grib2Error, Result};

/// Bit-map section content: a presence mask marking which grid points carry
/// an explicitly packed value.
///
/// Indicator 0 means `bitmap` applies to this record, 254 means the caller
/// re-supplied the bitmap of a previous record, 255 means every point is
/// present. Any other value declares a producer-predetermined bitmap that was
/// never transmitted, which this crate cannot decode.
pub struct BitMap {
    pub bitmap_indicator: u8,
    pub bitmap: Vec<u8>,
}

impl BitMap {
    pub fn new(bitmap_indicator: u8, bitmap: Vec<u8>) -> Self {
        Self {
            bitmap_indicator,
            bitmap,
        }
    }

    /// A record without a bit-map section: all points present.
    pub fn none() -> Self {
        Self {
            bitmap_indicator: 255,
            bitmap: Vec::new(),
        }
    }

    pub(crate) fn resolve(&self, total_points: usize) -> Result<Option<&[u8]>> {
        match self.bitmap_indicator {
            255 => Ok(None),
            0 | 254 => {
                if self.bitmap.len() * 8 < total_points {
                    return Err(Grib2Error::BitmapLength {
                        bytes: self.bitmap.len(),
                        total_points,
                    });
                }
                Ok(Some(&self.bitmap))
            }
            n => Err(Grib2Error::PredeterminedBitmap(n)),
        }
    }
}

#[inline]
pub(crate) fn is_set(bitmap: &[u8], i: usize) -> bool {
    bitmap[i / 8] & (0x80 >> (i % 8)) != 0
}

/// Scatters a compact sequence into a full-grid sequence: set bits consume
/// the next compact value, clear bits emit `missing`.
pub(crate) fn scatter(compact: &[f32], bitmap: &[u8], total_points: usize, missing: f32) -> Vec<f32> {
    let mut values = compact.iter();
    (0..total_points)
        .map(|i| {
            if is_set(bitmap, i) {
                values.next().copied().unwrap_or(missing)
            } else {
                missing
            }
        })
        .collect()
}
