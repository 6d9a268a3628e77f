//! Data Representation Section: the fixed-layout template header that
//! precedes the packed payload. Octet numbers in the comments are the WMO
//! ones; the byte buffer handed to [`Data::from_template`] starts at octet 12
//! (everything before that belongs to the caller's envelope parser).

use crate::utils::{BitReader, Buffer, GribInt};
use crate::Result;

pub struct DataRepresentationDefinition {
    pub num_points: usize,
    pub template_number: u16,
    pub data: Data,
}

pub enum Data {
    Data0(Data0),
    Data2(Data2),
    Data3(Data3),
    Data40(Data40),
    Data41(Data41),
    Data50002(Data50002),
    Unknown(Vec<u8>),
}

impl Data {
    pub fn from_template(template_number: u16, bytes: Vec<u8>) -> Result<Self> {
        let mut buf = Buffer::new(bytes);

        match template_number {
            0 => Ok(Data::Data0(Data0::read(&mut buf)?)),
            2 => Ok(Data::Data2(Data2 {
                common: Data0::read(&mut buf)?,
                group_method: buf.read()?,
                missing_value_management: buf.read()?,
                missing_substitute_primary: buf.read()?,
                missing_substitute_secondary: buf.read()?,
                group_definition: GroupDefinition::read(&mut buf)?,
            })),
            3 => Ok(Data::Data3(Data3 {
                common: Data0::read(&mut buf)?,
                group_method: buf.read()?,
                missing_value_management: buf.read()?,
                missing_substitute_primary: buf.read()?,
                missing_substitute_secondary: buf.read()?,
                group_definition: GroupDefinition::read(&mut buf)?,
                spacial_difference_order: buf.read()?,
                spacial_difference_size: buf.read()?,
            })),
            40 => Ok(Data::Data40(Data40 {
                common: Data0::read(&mut buf)?,
                compression_type: buf.read()?,
                compression_ratio: buf.read()?,
            })),
            41 => Ok(Data::Data41(Data41 {
                common: Data0::read(&mut buf)?,
            })),
            50002 => Data50002::read(buf).map(Data::Data50002),
            _ => Ok(Data::Unknown(buf.remaining())),
        }
    }
}

/// Common header of the grid-point templates: octets 12-21 of template 5.0.
pub struct Data0 {
    pub reference_value: f32,
    pub binary_scale_factor: i16,
    pub decimal_scale_factor: i16,
    pub num_bits: usize,
    pub values_type: u8,
}

impl Data0 {
    fn read(buf: &mut Buffer) -> Result<Self> {
        Ok(Self {
            reference_value: buf.read()?,                      // octet 12-15
            binary_scale_factor: buf.read::<u16>()?.as_grib_int(), // 16-17
            decimal_scale_factor: buf.read::<u16>()?.as_grib_int(), // 18-19
            num_bits: buf.read::<u8>()? as usize,              // 20
            values_type: buf.read()?,                          // 21
        })
    }
}

pub struct GroupDefinition {
    pub num_groups: usize,
    pub group_widths_reference: u8,
    pub group_widths_num_bits: usize,
    pub group_lengths_reference: u32,
    pub group_lengths_increment: u8,
    pub group_lengths_last: u32,
    pub group_scaled_lengths_num_bits: usize,
}

impl GroupDefinition {
    fn read(buf: &mut Buffer) -> Result<Self> {
        Ok(Self {
            num_groups: buf.read::<u32>()? as usize,            // octet 32-35
            group_widths_reference: buf.read()?,                // 36
            group_widths_num_bits: buf.read::<u8>()? as usize,  // 37
            group_lengths_reference: buf.read()?,               // 38-41
            group_lengths_increment: buf.read()?,               // 42
            group_lengths_last: buf.read()?,                    // 43-46
            group_scaled_lengths_num_bits: buf.read::<u8>()? as usize, // 47
        })
    }
}

pub struct Data2 {
    pub common: Data0,
    pub group_method: u8,
    pub missing_value_management: u8,
    pub missing_substitute_primary: f32,
    pub missing_substitute_secondary: f32,
    pub group_definition: GroupDefinition,
}

pub struct Data3 {
    pub common: Data0,
    pub group_method: u8,
    pub missing_value_management: u8,
    pub missing_substitute_primary: f32,
    pub missing_substitute_secondary: f32,
    pub group_definition: GroupDefinition,
    pub spacial_difference_order: u8,
    pub spacial_difference_size: u8,
}

pub struct Data40 {
    pub common: Data0,
    pub compression_type: u8,
    pub compression_ratio: u8,
}

/// Template 5.41 carries nothing beyond the common header; the PNG stream in
/// the data section holds all the packing structure.
pub struct Data41 {
    pub common: Data0,
}

/// Second-order general extended packing (grib_api template 5.50002). The
/// spatial-differencing seeds and the overall bias travel in the header
/// itself, packed back to back at `width_of_spd` bits each.
pub struct Data50002 {
    pub reference_value: f32,
    pub binary_scale_factor: i16,
    pub decimal_scale_factor: i16,
    pub num_bits: usize,
    pub width_of_first_order_values: usize,
    pub p1: u32,
    pub p2: u32,
    pub width_of_width: usize,
    pub width_of_length: usize,
    pub boustrophedonic: u8,
    pub order_of_spd: usize,
    pub width_of_spd: usize,
    /// `order_of_spd` seed values followed by the overall bias.
    pub spd: Vec<i32>,
}

impl Data50002 {
    fn read(mut buf: Buffer) -> Result<Self> {
        let reference_value = buf.read()?;                             // octet 12-15
        let binary_scale_factor = buf.read::<u16>()?.as_grib_int();    // 16-17
        let decimal_scale_factor = buf.read::<u16>()?.as_grib_int();   // 18-19
        let num_bits = buf.read::<u8>()? as usize;                     // 20
        let width_of_first_order_values = buf.read::<u8>()? as usize;  // 21
        let p1 = buf.read()?;                                          // 22-25
        let p2 = buf.read()?;                                          // 26-29
        let width_of_width = buf.read::<u8>()? as usize;               // 30
        let width_of_length = buf.read::<u8>()? as usize;              // 31
        let boustrophedonic = buf.read()?;                             // 32
        let order_of_spd = buf.read::<u8>()? as usize;                 // 33
        let width_of_spd = buf.read::<u8>()? as usize;                 // 34

        let spd_bytes = buf.remaining();
        let mut reader = BitReader::new(&spd_bytes);
        let mut spd = Vec::with_capacity(order_of_spd + 1);
        for _ in 0..=order_of_spd {
            spd.push(reader.read_signed(width_of_spd)?);
        }

        Ok(Self {
            reference_value,
            binary_scale_factor,
            decimal_scale_factor,
            num_bits,
            width_of_first_order_values,
            p1,
            p2,
            width_of_width,
            width_of_length,
            boustrophedonic,
            order_of_spd,
            width_of_spd,
            spd,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn common_bytes() -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&10.0f32.to_be_bytes()); // R
        bytes.extend_from_slice(&[0x00, 0x01]); // E = 1
        bytes.extend_from_slice(&[0x80, 0x01]); // D = -1, sign-magnitude
        bytes.push(12); // bits per value
        bytes.push(0); // floating point originals
        bytes
    }

    #[test]
    fn parses_simple_packing_header() {
        let data = Data::from_template(0, common_bytes()).unwrap();
        let d = match data {
            Data::Data0(d) => d,
            _ => panic!("wrong variant"),
        };
        assert_eq!(d.reference_value, 10.0);
        assert_eq!(d.binary_scale_factor, 1);
        assert_eq!(d.decimal_scale_factor, -1);
        assert_eq!(d.num_bits, 12);
        assert_eq!(d.values_type, 0);
    }

    #[test]
    fn parses_complex_packing_header() {
        let mut bytes = common_bytes();
        bytes.push(1); // general group splitting
        bytes.push(2); // missing value management
        bytes.extend_from_slice(&9999.0f32.to_be_bytes());
        bytes.extend_from_slice(&8888.0f32.to_be_bytes());
        bytes.extend_from_slice(&0x0001_0000u32.to_be_bytes()); // NG
        bytes.push(3); // group widths reference
        bytes.push(4); // bits per group width
        bytes.extend_from_slice(&17u32.to_be_bytes()); // group length reference
        bytes.push(2); // length increment
        bytes.extend_from_slice(&23u32.to_be_bytes()); // last group length
        bytes.push(7); // bits per scaled group length

        let d = match Data::from_template(2, bytes).unwrap() {
            Data::Data2(d) => d,
            _ => panic!("wrong variant"),
        };
        assert_eq!(d.missing_value_management, 2);
        assert_eq!(d.missing_substitute_primary, 9999.0);
        assert_eq!(d.missing_substitute_secondary, 8888.0);
        assert_eq!(d.group_definition.num_groups, 65536);
        assert_eq!(d.group_definition.group_widths_reference, 3);
        assert_eq!(d.group_definition.group_widths_num_bits, 4);
        assert_eq!(d.group_definition.group_lengths_reference, 17);
        assert_eq!(d.group_definition.group_lengths_increment, 2);
        assert_eq!(d.group_definition.group_lengths_last, 23);
        assert_eq!(d.group_definition.group_scaled_lengths_num_bits, 7);
    }

    #[test]
    fn parses_spatial_differencing_header() {
        let mut bytes = common_bytes();
        bytes.extend_from_slice(&[1, 1]);
        bytes.extend_from_slice(&0.0f32.to_be_bytes());
        bytes.extend_from_slice(&0.0f32.to_be_bytes());
        bytes.extend_from_slice(&2u32.to_be_bytes());
        bytes.extend_from_slice(&[0, 5]);
        bytes.extend_from_slice(&1u32.to_be_bytes());
        bytes.push(1);
        bytes.extend_from_slice(&4u32.to_be_bytes());
        bytes.push(6);
        bytes.push(2); // second order differencing
        bytes.push(2); // two bytes per descriptor value

        let d = match Data::from_template(3, bytes).unwrap() {
            Data::Data3(d) => d,
            _ => panic!("wrong variant"),
        };
        assert_eq!(d.spacial_difference_order, 2);
        assert_eq!(d.spacial_difference_size, 2);
        assert_eq!(d.group_definition.num_groups, 2);
    }

    #[test]
    fn parses_jpeg2000_header() {
        let mut bytes = common_bytes();
        bytes.push(0); // lossless
        bytes.push(255); // ratio undefined

        let d = match Data::from_template(40, bytes).unwrap() {
            Data::Data40(d) => d,
            _ => panic!("wrong variant"),
        };
        assert_eq!(d.compression_type, 0);
        assert_eq!(d.compression_ratio, 255);
        assert_eq!(d.common.num_bits, 12);
    }

    #[test]
    fn parses_second_order_header_with_spd_values() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&0.0f32.to_be_bytes());
        bytes.extend_from_slice(&[0x00, 0x00]); // E
        bytes.extend_from_slice(&[0x00, 0x01]); // D
        bytes.push(16); // num bits
        bytes.push(8); // width of first order values
        bytes.extend_from_slice(&3u32.to_be_bytes()); // p1
        bytes.extend_from_slice(&9u32.to_be_bytes()); // p2
        bytes.push(8); // width of width
        bytes.push(8); // width of length
        bytes.push(0); // not boustrophedonic
        bytes.push(1); // first order spatial differencing
        bytes.push(8); // width of spd
        bytes.push(0b0000_0101); // seed = 5
        bytes.push(0b1000_0010); // bias = -2

        let d = match Data::from_template(50002, bytes).unwrap() {
            Data::Data50002(d) => d,
            _ => panic!("wrong variant"),
        };
        assert_eq!(d.p1, 3);
        assert_eq!(d.order_of_spd, 1);
        assert_eq!(d.spd, vec![5, -2]);
        assert_eq!(d.decimal_scale_factor, 1);
    }

    #[test]
    fn parses_png_header() {
        let d = match Data::from_template(41, common_bytes()).unwrap() {
            Data::Data41(d) => d,
            _ => panic!("wrong variant"),
        };
        assert_eq!(d.common.reference_value, 10.0);
        assert_eq!(d.common.num_bits, 12);
    }

    #[test]
    fn unknown_template_keeps_raw_bytes() {
        match Data::from_template(61, vec![1, 2, 3]).unwrap() {
            Data::Unknown(bytes) => assert_eq!(bytes, vec![1, 2, 3]),
            _ => panic!("wrong variant"),
        }
    }
}
