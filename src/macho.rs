//! Mach-O records touched while removing a code signature.

use std::fmt;

use crate::codec::{record, Endian, Record};
use crate::{Error, Result};

pub const MH_MAGIC: u32 = 0xfeedface;
pub const MH_CIGAM: u32 = 0xcefaedfe;
pub const MH_MAGIC_64: u32 = 0xfeedfacf;
pub const MH_CIGAM_64: u32 = 0xcffaedfe;

pub const LC_SYMTAB: u32 = 0x02;
pub const LC_SEGMENT_64: u32 = 0x19;
pub const LC_CODE_SIGNATURE: u32 = 0x1d;

record! {
    /// `struct mach_header`
    pub struct MachHeader {
        magic,
        cputype,
        cpusubtype,
        filetype,
        ncmds,
        sizeofcmds,
        flags,
    }
}

record! {
    /// `struct mach_header_64`
    pub struct MachHeader64 {
        magic,
        cputype,
        cpusubtype,
        filetype,
        ncmds,
        sizeofcmds,
        flags,
        reserved,
    }
}

record! {
    /// `struct load_command`, the prefix shared by every load command.
    pub struct LoadCommand {
        cmd,
        /// total size of the command, prefix included
        cmdsize,
    }
}

record! {
    /// `struct linkedit_data_command`
    pub struct LinkeditDataCommand {
        cmd,
        cmdsize,
        /// file offset of the data, relative to the start of the image
        dataoff,
        datasize,
    }
}

/// The four thin Mach-O magics, each fixing word size and byte order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Magic {
    Mach32Le,
    Mach64Le,
    Mach32Be,
    Mach64Be,
}

impl Magic {
    /// Identify the image from its first four bytes.
    pub fn detect(bytes: [u8; 4]) -> Result<Self> {
        // Read as little-endian, so a byte-swapped image shows up as CIGAM.
        match u32::from_le_bytes(bytes) {
            MH_MAGIC => Ok(Magic::Mach32Le),
            MH_MAGIC_64 => Ok(Magic::Mach64Le),
            MH_CIGAM => Ok(Magic::Mach32Be),
            MH_CIGAM_64 => Ok(Magic::Mach64Be),
            _ => Err(Error::UnsupportedMagic(u32::from_be_bytes(bytes))),
        }
    }

    pub fn is_64(self) -> bool {
        matches!(self, Magic::Mach64Le | Magic::Mach64Be)
    }

    pub fn word_size(self) -> u32 {
        if self.is_64() {
            64
        } else {
            32
        }
    }

    pub fn endian(self) -> Endian {
        match self {
            Magic::Mach32Le | Magic::Mach64Le => Endian::Little,
            Magic::Mach32Be | Magic::Mach64Be => Endian::Big,
        }
    }

    /// Length of the header that precedes the load-command table.
    pub fn header_size(self) -> usize {
        if self.is_64() {
            MachHeader64::SIZE
        } else {
            MachHeader::SIZE
        }
    }
}

impl fmt::Display for Magic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-bit {} Mach-O", self.word_size(), self.endian())
    }
}

/// Either header shape, decoded with the layout its magic selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Header {
    Mach32(MachHeader),
    Mach64(MachHeader64),
}

impl Header {
    pub fn decode(buf: &[u8], magic: Magic) -> Result<Self> {
        if magic.is_64() {
            MachHeader64::decode(buf, magic.endian()).map(Header::Mach64)
        } else {
            MachHeader::decode(buf, magic.endian()).map(Header::Mach32)
        }
    }

    pub fn encode(&self, endian: Endian) -> Vec<u8> {
        match self {
            Header::Mach32(h) => h.encode(endian),
            Header::Mach64(h) => h.encode(endian),
        }
    }

    pub fn size(&self) -> usize {
        match self {
            Header::Mach32(_) => MachHeader::SIZE,
            Header::Mach64(_) => MachHeader64::SIZE,
        }
    }

    pub fn ncmds(&self) -> u32 {
        match self {
            Header::Mach32(h) => h.ncmds,
            Header::Mach64(h) => h.ncmds,
        }
    }

    pub fn sizeofcmds(&self) -> u32 {
        match self {
            Header::Mach32(h) => h.sizeofcmds,
            Header::Mach64(h) => h.sizeofcmds,
        }
    }

    pub fn remove_command(&mut self, cmdsize: u32) -> Result<()> {
        let (ncmds, sizeofcmds) = match self {
            Header::Mach32(h) => (&mut h.ncmds, &mut h.sizeofcmds),
            Header::Mach64(h) => (&mut h.ncmds, &mut h.sizeofcmds),
        };
        match (ncmds.checked_sub(1), sizeofcmds.checked_sub(cmdsize)) {
            (Some(n), Some(size)) => {
                *ncmds = n;
                *sizeofcmds = size;
                Ok(())
            }
            _ => Err(Error::Malformed(format!(
                "cannot remove a {cmdsize} byte command from {} commands totalling {} bytes",
                ncmds, sizeofcmds
            ))),
        }
    }
}
