use log::warn;

use crate::codec::Jpeg2000Codec;
use crate::sect5::{Data, Data40, DataRepresentationDefinition};
use crate::sect7::{code_stream, Grib2DataDecoder, ScaleParams, ALL_ONES};
use crate::Grib2Error::{LengthMismatch, ParseError};
use crate::{bitmap, Grib2DataReader, Result};

pub(crate) struct GridPointDataJpeg2000Decoder<'a> {
    pub(crate) codec: &'a dyn Jpeg2000Codec,
}

impl Grib2DataDecoder for GridPointDataJpeg2000Decoder<'_> {
    fn decode(
        &self,
        data_repr_def: &DataRepresentationDefinition,
        reader: &Grib2DataReader,
        bitmap: Option<&[u8]>,
        slice: &[u8],
    ) -> Result<Box<[f32]>> {
        let data = match &data_repr_def.data {
            Data::Data40(data) => data,
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
                // One decoded integer for every expected data point.
                if idata.len() != reader.data_points {
                    return Err(LengthMismatch {
                        expected: reader.data_points,
                        actual: idata.len(),
                    });
                }
                let mut decoded = vec![f32::NAN; total_points];
                for (out, &v) in decoded.iter_mut().zip(&idata) {
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
                            "codec returned {} values but the bitmap marks more points present, record at offset {}",
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

impl GridPointDataJpeg2000Decoder<'_> {
    /// Raw extraction: the entropy-decoded integers without the scale and
    /// reference applied, with `2^num_bits - 1` standing for missing points.
    pub(crate) fn decode_raw(
        &self,
        data: &Data40,
        reader: &Grib2DataReader,
        bitmap: Option<&[u8]>,
        slice: &[u8],
    ) -> Result<Vec<i32>> {
        let num_bits = data.common.num_bits;
        if num_bits == 0 || num_bits > 32 {
            return Err(crate::Grib2Error::DecodeError(format!(
                "cannot extract raw values at a bit depth of {}",
                num_bits
            )));
        }
        let missing = ALL_ONES[num_bits] as i32;

        let idata = self
            .codec
            .decode(code_stream(slice, reader.data_length), num_bits as u32)?;

        match bitmap {
            None => {
                if idata.len() != reader.total_points {
                    return Err(LengthMismatch {
                        expected: reader.total_points,
                        actual: idata.len(),
                    });
                }
                Ok(idata)
            }
            Some(mask) => {
                let mut result = vec![missing; reader.total_points];
                let mut next = 0;
                for (i, out) in result.iter_mut().enumerate() {
                    if !bitmap::is_set(mask, i) {
                        continue;
                    }
                    if next >= idata.len() {
                        warn!(
                            "codec returned {} values but the bitmap marks more points present, record at offset {}",
                            idata.len(),
                            reader.start_pos
                        );
                        break;
                    }
                    *out = idata[next];
                    next += 1;
                }
                Ok(result)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::CodecError;
    use crate::sect5::Data0;

    struct FixedCodec(Vec<i32>);

    impl Jpeg2000Codec for FixedCodec {
        fn decode(&self, _buf: &[u8], _bit_depth: u32) -> std::result::Result<Vec<i32>, CodecError> {
            Ok(self.0.clone())
        }
    }

    struct FailingCodec;

    impl Jpeg2000Codec for FailingCodec {
        fn decode(&self, buf: &[u8], bit_depth: u32) -> std::result::Result<Vec<i32>, CodecError> {
            let _ = (buf, bit_depth);
            Err(CodecError::TruncatedStream(String::from(
                "buffer too short for declared rate",
            )))
        }
    }

    fn definition(reference: f32, e: i16, d: i16, num_bits: usize) -> DataRepresentationDefinition {
        DataRepresentationDefinition {
            num_points: 0,
            template_number: 40,
            data: Data::Data40(Data40 {
                common: Data0 {
                    reference_value: reference,
                    binary_scale_factor: e,
                    decimal_scale_factor: d,
                    num_bits,
                    values_type: 0,
                },
                compression_type: 0,
                compression_ratio: 255,
            }),
        }
    }

    fn reader(total: usize, data_points: usize) -> Grib2DataReader {
        Grib2DataReader::new(40, total, data_points, 0, total, 0, 0)
    }

    #[test]
    fn scales_codec_output() {
        let codec = FixedCodec(vec![2, 4, 6]);
        let drd = definition(10.0, 1, 1, 8);
        let out = GridPointDataJpeg2000Decoder { codec: &codec }
            .decode(&drd, &reader(3, 3), None, &[])
            .unwrap();
        assert!((out[0] - 1.4).abs() < 1e-6);
        assert!((out[1] - 1.8).abs() < 1e-6);
        assert!((out[2] - 2.2).abs() < 1e-6);
    }

    #[test]
    fn zero_bit_width_never_invokes_the_codec() {
        let codec = FailingCodec;
        let drd = definition(30.0, 0, 1, 0);
        let out = GridPointDataJpeg2000Decoder { codec: &codec }
            .decode(&drd, &reader(2, 2), None, &[])
            .unwrap();
        assert_eq!(&out[..], &[3.0, 3.0]);
    }

    #[test]
    fn count_mismatch_without_bitmap_is_fatal() {
        let codec = FixedCodec(vec![1, 2]);
        let drd = definition(0.0, 0, 0, 8);
        let result = GridPointDataJpeg2000Decoder { codec: &codec }.decode(
            &drd,
            &reader(3, 3),
            None,
            &[],
        );
        assert!(matches!(
            result,
            Err(LengthMismatch { expected: 3, actual: 2 })
        ));
    }

    #[test]
    fn codec_failures_propagate() {
        let codec = FailingCodec;
        let drd = definition(0.0, 0, 0, 8);
        let result = GridPointDataJpeg2000Decoder { codec: &codec }.decode(
            &drd,
            &reader(3, 3),
            None,
            &[],
        );
        assert!(matches!(result, Err(crate::Grib2Error::Codec(_))));
    }

    #[test]
    fn bitmap_scatters_codec_output() {
        let codec = FixedCodec(vec![5, 7]);
        let drd = definition(0.0, 0, 0, 8);
        let out = GridPointDataJpeg2000Decoder { codec: &codec }
            .decode(&drd, &reader(4, 2), Some(&[0b1010_0000]), &[])
            .unwrap();
        assert_eq!(out[0], 5.0);
        assert!(out[1].is_nan());
        assert_eq!(out[2], 7.0);
        assert!(out[3].is_nan());
    }

    #[test]
    fn raw_mode_uses_the_all_ones_sentinel() {
        let codec = FixedCodec(vec![5, 7]);
        let drd = definition(0.0, 0, 0, 8);
        let data = match &drd.data {
            Data::Data40(d) => d,
            _ => unreachable!(),
        };
        let out = GridPointDataJpeg2000Decoder { codec: &codec }
            .decode_raw(data, &reader(4, 2), Some(&[0b1010_0000]), &[])
            .unwrap();
        assert_eq!(out, vec![5, 255, 7, 255]);
    }

    #[test]
    fn raw_mode_without_bitmap_passes_through() {
        let codec = FixedCodec(vec![1, 2, 3]);
        let drd = definition(0.0, 0, 0, 12);
        let data = match &drd.data {
            Data::Data40(d) => d,
            _ => unreachable!(),
        };
        let out = GridPointDataJpeg2000Decoder { codec: &codec }
            .decode_raw(data, &reader(3, 3), None, &[])
            .unwrap();
        assert_eq!(out, vec![1, 2, 3]);
    }
}
