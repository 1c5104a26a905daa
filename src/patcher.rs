//! Remove `LC_CODE_SIGNATURE` from a thin Mach-O image.
//!
//! The patch runs in two passes. The first decodes the header and walks the
//! load-command table, validating every extent it will later touch. Only
//! then does the second pass write: the header counts, the compacted table
//! and the zeroed signature payload. An image rejected by the first pass is
//! left untouched, and the file never changes length.

use std::fs::{File, OpenOptions};
use std::path::Path;

use log::{debug, info, trace, warn};
use memmap2::MmapMut;

use crate::codec::Record;
use crate::image::Image;
use crate::macho::{Header, LinkeditDataCommand, LoadCommand, Magic, LC_CODE_SIGNATURE};
use crate::{Error, Result};

/// What a successful removal changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Removal {
    pub magic: Magic,
    /// Position of the removed command in the original table.
    pub index: u32,
    /// Absolute file offset the removed command occupied.
    pub command_offset: usize,
    pub dataoff: u32,
    pub datasize: u32,
    pub ncmds: u32,
    pub sizeofcmds: u32,
    /// Absolute offset where the walk over the original commands stopped.
    pub end_of_commands: usize,
}

/// Outcome of a patch that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Unsigned(Removal),
    /// No signature command in the table; nothing was written.
    SignatureNotFound { magic: Magic, end_of_commands: usize },
}

impl Status {
    pub fn magic(&self) -> Magic {
        match self {
            Status::Unsigned(removal) => removal.magic,
            Status::SignatureNotFound { magic, .. } => *magic,
        }
    }

    pub fn end_of_commands(&self) -> usize {
        match self {
            Status::Unsigned(removal) => removal.end_of_commands,
            Status::SignatureNotFound {
                end_of_commands, ..
            } => *end_of_commands,
        }
    }
}

struct Signature {
    index: u32,
    offset: usize,
    command: LinkeditDataCommand,
}

struct Scan {
    magic: Magic,
    header: Header,
    /// Where the walk over the commands stopped, relative to the image start.
    end: usize,
    signature: Option<Signature>,
}

/// Patch the image that starts `offset` bytes into `data`.
pub fn unsign_bytes(data: &mut [u8], offset: usize) -> Result<Status> {
    let mut image = Image::new(data, offset)?;
    let scan = scan(&image)?;
    let end_of_commands = image.base() + scan.end;

    match scan.signature {
        Some(ref signature) => remove(&mut image, &scan, signature).map(Status::Unsigned),
        None => {
            warn!(
                "No code signature in the {} at {:#x}, leaving it unchanged",
                scan.magic,
                image.base()
            );
            Ok(Status::SignatureNotFound {
                magic: scan.magic,
                end_of_commands,
            })
        }
    }
}

/// Patch the image at `offset` inside an open, writable file.
///
/// The file is mapped for the duration of the call and flushed before
/// returning, whether or not the patch succeeded.
pub fn unsign_file(file: &File, offset: u64) -> Result<Status> {
    let size = file.metadata()?.len();
    let base = usize::try_from(offset).map_err(|_| Error::OutOfBounds {
        offset: usize::MAX,
        len: 0,
        size: size as usize,
    })?;
    if size == 0 {
        // an empty file cannot be mapped
        return Err(Error::OutOfBounds {
            offset: base,
            len: 4,
            size: 0,
        });
    }

    // SAFETY: the file is a private copy made for this patch and is not
    // resized while the mapping is alive.
    let mut map = unsafe { MmapMut::map_mut(file)? };
    let status = unsign_bytes(&mut map[..], base);
    let flushed = map.flush();
    let status = status?;
    flushed?;
    trace!("Flushed {size} bytes");
    Ok(status)
}

pub fn unsign_path(path: impl AsRef<Path>, offset: u64) -> Result<Status> {
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .open(path.as_ref())?;
    unsign_file(&file, offset)
}

fn scan(image: &Image) -> Result<Scan> {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(image.read_at(0, 4)?);
    let magic = Magic::detect(raw)?;
    let endian = magic.endian();
    debug!("Matched {} at {:#x}", magic, image.base());

    let header = Header::decode(image.read_at(0, magic.header_size())?, magic)?;
    let start = header.size();
    let declared = start
        .checked_add(header.sizeofcmds() as usize)
        .ok_or_else(|| Error::Malformed(format!("sizeofcmds {:#x}", header.sizeofcmds())))?;
    image.check(0, declared)?;
    trace!(
        "Header loaded: {} commands, sizeofcmds {:#x}",
        header.ncmds(),
        header.sizeofcmds()
    );

    // The walk, not sizeofcmds, decides where the table ends.
    let mut cursor = start;
    let mut signature = None;
    for index in 0..header.ncmds() {
        let command: LoadCommand = image.decode(cursor, endian)?;
        debug!(
            "Load command {index}: cmd {:#x}, cmdsize {} at {cursor:#x}",
            command.cmd, command.cmdsize
        );

        let cmdsize = command.cmdsize as usize;
        if cmdsize < LoadCommand::SIZE {
            return Err(Error::Malformed(format!(
                "load command {index} at {cursor:#x} has cmdsize {cmdsize}"
            )));
        }
        image.check(cursor, cmdsize)?;

        if command.cmd == LC_CODE_SIGNATURE {
            if cmdsize != LinkeditDataCommand::SIZE {
                return Err(Error::Malformed(format!(
                    "code signature command has cmdsize {cmdsize}"
                )));
            }
            if signature.is_some() {
                return Err(Error::Malformed(
                    "more than one code signature command".to_string(),
                ));
            }
            let command: LinkeditDataCommand = image.decode(cursor, endian)?;
            info!(
                "Found code signature command {index} at {:#x}, data {:#x}+{:#x}",
                image.base() + cursor,
                command.dataoff,
                command.datasize
            );
            signature = Some(Signature {
                index,
                offset: cursor,
                command,
            });
        }
        cursor += cmdsize;
    }

    let end = cursor;
    if end != declared {
        warn!(
            "Load commands span {:#x} bytes but sizeofcmds is {:#x}",
            end - start,
            declared - start
        );
    }

    if let Some(Signature { command, .. }) = &signature {
        let dataoff = command.dataoff as usize;
        let datasize = command.datasize as usize;
        image.check(dataoff, datasize)?;
        if datasize > 0 && dataoff < end {
            return Err(Error::Malformed(format!(
                "code signature data at {dataoff:#x} overlaps the load commands"
            )));
        }
    }

    Ok(Scan {
        magic,
        header,
        end,
        signature,
    })
}

fn remove(image: &mut Image, scan: &Scan, signature: &Signature) -> Result<Removal> {
    let endian = scan.magic.endian();
    let size = LinkeditDataCommand::SIZE;

    let mut header = scan.header;
    header.remove_command(signature.command.cmdsize)?;
    image.write_at(0, &header.encode(endian))?;

    let tail = signature.offset + size;
    image.shift(tail, signature.offset, scan.end - tail)?;
    image.zero(scan.end - size, size)?;
    trace!("Compacted {:#x}..{:#x}", signature.offset, scan.end);

    image.zero(
        signature.command.dataoff as usize,
        signature.command.datasize as usize,
    )?;
    info!(
        "Removed code signature, {} commands in {:#x} bytes remain",
        header.ncmds(),
        header.sizeofcmds()
    );

    Ok(Removal {
        magic: scan.magic,
        index: signature.index,
        command_offset: image.base() + signature.offset,
        dataoff: signature.command.dataoff,
        datasize: signature.command.datasize,
        ncmds: header.ncmds(),
        sizeofcmds: header.sizeofcmds(),
        end_of_commands: image.base() + scan.end,
    })
}
