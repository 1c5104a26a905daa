//! Bounds-checked access to the bytes of a Mach-O image.
//!
//! Offsets passed to [`Image`] are relative to the image start, which may sit
//! anywhere inside the backing buffer.

use std::ops::Range;

use crate::codec::{Endian, Record};
use crate::{Error, Result};

pub struct Image<'a> {
    data: &'a mut [u8],
    base: usize,
}

impl<'a> Image<'a> {
    /// View the image that starts `base` bytes into `data`.
    pub fn new(data: &'a mut [u8], base: usize) -> Result<Self> {
        if base > data.len() {
            return Err(Error::OutOfBounds {
                offset: base,
                len: 0,
                size: data.len(),
            });
        }
        Ok(Self { data, base })
    }

    pub fn len(&self) -> usize {
        self.data.len() - self.base
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn base(&self) -> usize {
        self.base
    }

    fn span(&self, offset: usize, len: usize) -> Result<Range<usize>> {
        let out_of_bounds = || Error::OutOfBounds {
            offset: self.base.saturating_add(offset),
            len,
            size: self.data.len(),
        };
        let start = self.base.checked_add(offset).ok_or_else(out_of_bounds)?;
        let end = start.checked_add(len).ok_or_else(out_of_bounds)?;
        if end > self.data.len() {
            return Err(out_of_bounds());
        }
        Ok(start..end)
    }

    pub fn check(&self, offset: usize, len: usize) -> Result<()> {
        self.span(offset, len).map(|_| ())
    }

    pub fn read_at(&self, offset: usize, len: usize) -> Result<&[u8]> {
        let range = self.span(offset, len)?;
        Ok(&self.data[range])
    }

    pub fn write_at(&mut self, offset: usize, bytes: &[u8]) -> Result<()> {
        let range = self.span(offset, bytes.len())?;
        self.data[range].copy_from_slice(bytes);
        Ok(())
    }

    pub fn zero(&mut self, offset: usize, len: usize) -> Result<()> {
        let range = self.span(offset, len)?;
        self.data[range].fill(0);
        Ok(())
    }

    /// Move `len` bytes from `src` to `dst`; the regions may overlap.
    pub fn shift(&mut self, src: usize, dst: usize, len: usize) -> Result<()> {
        let from = self.span(src, len)?;
        let to = self.span(dst, len)?;
        self.data.copy_within(from, to.start);
        Ok(())
    }

    pub fn decode<R: Record>(&self, offset: usize, endian: Endian) -> Result<R> {
        R::decode(self.read_at(offset, R::SIZE)?, endian)
    }

    pub fn encode<R: Record>(&mut self, offset: usize, record: &R, endian: Endian) -> Result<()> {
        self.write_at(offset, &record.encode(endian))
    }
}
