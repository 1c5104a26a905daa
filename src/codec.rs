//! Fixed-layout record codec.
//!
//! Every Mach-O record this crate touches is a flat run of unsigned 32-bit
//! words. [`record!`] declares such a struct together with its field order,
//! its byte length and the byte-order aware [`Record`] implementation.

use std::fmt;

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use crate::Result;

/// Byte order of an image, chosen from its magic number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Little,
    Big,
}

impl Endian {
    pub fn read_u32(self, buf: &[u8]) -> u32 {
        match self {
            Endian::Little => LittleEndian::read_u32(buf),
            Endian::Big => BigEndian::read_u32(buf),
        }
    }

    pub fn write_u32(self, buf: &mut [u8], n: u32) {
        match self {
            Endian::Little => LittleEndian::write_u32(buf, n),
            Endian::Big => BigEndian::write_u32(buf, n),
        }
    }
}

impl fmt::Display for Endian {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endian::Little => f.write_str("little-endian"),
            Endian::Big => f.write_str("big-endian"),
        }
    }
}

/// A fixed-size record made of unsigned 32-bit fields.
pub trait Record: Sized {
    const NAME: &'static str;
    /// Field names in on-disk order.
    const FIELDS: &'static [&'static str];
    const SIZE: usize;

    /// Decode from a slice of exactly [`Record::SIZE`] bytes.
    fn decode(buf: &[u8], endian: Endian) -> Result<Self>;

    fn encode(&self, endian: Endian) -> Vec<u8>;
}

macro_rules! record {
    (
        $(#[$meta:meta])*
        pub struct $name:ident {
            $( $(#[$field_meta:meta])* $field:ident, )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
        pub struct $name {
            $( $(#[$field_meta])* pub $field: u32, )+
        }

        impl $crate::codec::Record for $name {
            const NAME: &'static str = stringify!($name);
            const FIELDS: &'static [&'static str] = &[$( stringify!($field) ),+];
            const SIZE: usize = Self::FIELDS.len() * 4;

            #[allow(unused_assignments)]
            fn decode(buf: &[u8], endian: $crate::codec::Endian) -> $crate::Result<Self> {
                if buf.len() != Self::SIZE {
                    return Err($crate::Error::SizeMismatch {
                        record: Self::NAME,
                        expected: Self::SIZE,
                        actual: buf.len(),
                    });
                }
                let mut at = 0;
                $(
                    let $field = endian.read_u32(&buf[at..at + 4]);
                    at += 4;
                )+
                Ok(Self { $( $field, )+ })
            }

            #[allow(unused_assignments)]
            fn encode(&self, endian: $crate::codec::Endian) -> Vec<u8> {
                let mut buf = vec![0u8; Self::SIZE];
                let mut at = 0;
                $(
                    endian.write_u32(&mut buf[at..at + 4], self.$field);
                    at += 4;
                )+
                buf
            }
        }
    };
}

pub(crate) use record;
