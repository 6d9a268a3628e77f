use crate::{Grib2Error, Result};

pub(crate) trait GribInt<I> {
    fn as_grib_int(&self) -> I;
}

macro_rules! add_impl_for_ints {
    ($(($ty_src:ty, $ty_dst:ty),)*) => ($(
        impl GribInt<$ty_dst> for $ty_src {
            fn as_grib_int(&self) -> $ty_dst {
                if self.leading_zeros() == 0 {
                    let abs = (self << 1 >> 1) as $ty_dst;
                    -abs
                } else {
                    *self as $ty_dst
                }
            }
        }
    )*);
}

add_impl_for_ints! {
    (u16, i16),
    (u32, i32),
}

/// Reads unsigned and sign-magnitude integers of arbitrary bit width from a
/// byte slice, most significant bit first. Several packed sub-arrays are
/// required to start on an octet boundary; `align_to_byte` discards the
/// partial byte between them.
pub(crate) struct BitReader<'a> {
    slice: &'a [u8],
    pos: usize,
    offset: usize,
    record_start: u64,
}

impl<'a> BitReader<'a> {
    pub(crate) fn new(slice: &'a [u8]) -> Self {
        Self::new_at(slice, 0)
    }

    /// `record_start` is the absolute byte offset of the record the slice was
    /// cut from; overflow errors carry it so a failing record can be located
    /// in the source file.
    pub(crate) fn new_at(slice: &'a [u8], record_start: u64) -> Self {
        Self {
            slice,
            pos: 0,
            offset: 0,
            record_start,
        }
    }

    /// Consumes `num_bits` bits (0..=32) and returns them as an unsigned
    /// integer. A zero width reads nothing and yields zero.
    pub(crate) fn read(&mut self, num_bits: usize) -> Result<u64> {
        if num_bits == 0 {
            return Ok(0);
        }
        if num_bits > 32 {
            return Err(Grib2Error::DecodeError(format!(
                "unsupported bit width {}",
                num_bits
            )));
        }

        let total_num_bits = self.offset + num_bits;
        let (new_pos, new_offset) = (self.pos + total_num_bits / 8, total_num_bits % 8);

        if new_pos > self.slice.len() || (new_pos == self.slice.len() && new_offset > 0) {
            return Err(Grib2Error::ReadOverflow {
                pos: self.pos,
                num_bits,
                record_offset: self.record_start,
            });
        }

        let mut val = u64::from(self.slice[self.pos] << self.offset >> self.offset);
        if new_pos == self.pos {
            val >>= 8 - new_offset; // 00_____# -> 000_____
        } else {
            for pos in (self.pos + 1)..new_pos {
                val = (val << 8) | u64::from(self.slice[pos]);
            }

            if new_offset > 0 {
                let last_val = u64::from(self.slice[new_pos] >> (8 - new_offset));
                val = (val << new_offset) | last_val; // 0000____ and -####### -> 000____-
            }
        }

        self.pos = new_pos;
        self.offset = new_offset;

        Ok(val)
    }

    /// Reads one sign bit followed by `num_bits - 1` magnitude bits. This is
    /// sign-magnitude, not two's complement: a set sign bit negates the
    /// magnitude.
    pub(crate) fn read_signed(&mut self, num_bits: usize) -> Result<i32> {
        if num_bits == 0 {
            return Ok(0);
        }

        let sign = self.read(1)?;
        let magnitude = self.read(num_bits - 1)? as i32;

        Ok(if sign == 1 { -magnitude } else { magnitude })
    }

    /// Moves to the next octet boundary, discarding any partially consumed
    /// byte.
    pub(crate) fn align_to_byte(&mut self) {
        if self.offset > 0 {
            self.pos += 1;
            self.offset = 0;
        }
    }
}

pub(crate) struct Buffer {
    bytes: Vec<u8>,
    pos: usize,
}

impl Buffer {
    pub(crate) fn new(buf: Vec<u8>) -> Self {
        Self { bytes: buf, pos: 0 }
    }

    pub(crate) fn read<T: EndianRead>(&mut self) -> Result<T> {
        let end = self.pos + std::mem::size_of::<T>();
        if end > self.bytes.len() {
            return Err(Grib2Error::ReadOverflow {
                pos: self.pos,
                num_bits: std::mem::size_of::<T>() * 8,
                record_offset: 0,
            });
        }
        let val = T::from_be_bytes(&self.bytes[self.pos..end]);
        self.pos = end;

        Ok(val)
    }

    pub(crate) fn remaining(self) -> Vec<u8> {
        let Self { bytes, pos } = self;
        bytes[pos..].to_vec()
    }
}

pub(crate) trait EndianRead: Sized {
    fn from_be_bytes(bytes: &[u8]) -> Self;
}

macro_rules! uint_impl {
    ($ty:ty) => {
        impl EndianRead for $ty {
            fn from_be_bytes(bytes: &[u8]) -> Self {
                <$ty>::from_be_bytes(bytes.try_into().expect("sized slice"))
            }
        }
    };
}

uint_impl! { u8 }
uint_impl! { u16 }
uint_impl! { u32 }

uint_impl! { f32 }
