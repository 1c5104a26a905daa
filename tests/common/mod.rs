//! Synthetic Mach-O images for the integration tests.
#![allow(dead_code)]

use unsign::codec::{Endian, Record};
use unsign::macho::{
    Header, LinkeditDataCommand, LoadCommand, MachHeader, MachHeader64, Magic,
    LC_CODE_SIGNATURE, LC_SEGMENT_64, LC_SYMTAB, MH_MAGIC, MH_MAGIC_64,
};

/// Byte used for everything outside the header, commands and payload.
pub const FILL: u8 = 0xee;
/// Byte the signature payload is filled with.
pub const PAYLOAD: u8 = 0xcc;

pub struct Builder {
    magic: Magic,
    commands: Vec<Vec<u8>>,
    payload: Option<(usize, usize)>,
    sizeofcmds: Option<u32>,
}

impl Builder {
    pub fn new(magic: Magic) -> Self {
        Self {
            magic,
            commands: Vec::new(),
            payload: None,
            sizeofcmds: None,
        }
    }

    pub fn command(mut self, cmd: u32, cmdsize: u32, fill: u8) -> Self {
        let mut bytes = LoadCommand { cmd, cmdsize }.encode(self.magic.endian());
        bytes.resize(cmdsize as usize, fill);
        self.commands.push(bytes);
        self
    }

    pub fn signature(mut self, dataoff: u32, datasize: u32) -> Self {
        let command = LinkeditDataCommand {
            cmd: LC_CODE_SIGNATURE,
            cmdsize: LinkeditDataCommand::SIZE as u32,
            dataoff,
            datasize,
        };
        self.commands.push(command.encode(self.magic.endian()));
        self.payload = Some((dataoff as usize, datasize as usize));
        self
    }

    /// Declare `sizeofcmds` instead of the length of the commands.
    pub fn sizeofcmds(mut self, sizeofcmds: u32) -> Self {
        self.sizeofcmds = Some(sizeofcmds);
        self
    }

    /// Image of `len` bytes placed `base` bytes into the returned buffer.
    pub fn build_at(&self, base: usize, len: usize) -> Vec<u8> {
        let endian = self.magic.endian();
        let table = self.commands.concat();
        let ncmds = self.commands.len() as u32;
        let sizeofcmds = self.sizeofcmds.unwrap_or(table.len() as u32);
        let header = if self.magic.is_64() {
            Header::Mach64(MachHeader64 {
                magic: MH_MAGIC_64,
                cputype: 0x0100000c,
                filetype: 2,
                ncmds,
                sizeofcmds,
                flags: 0x00200085,
                ..Default::default()
            })
        } else {
            Header::Mach32(MachHeader {
                magic: MH_MAGIC,
                cputype: 7,
                filetype: 2,
                ncmds,
                sizeofcmds,
                flags: 0x85,
                ..Default::default()
            })
        };

        let mut data = vec![FILL; base + len];
        let header = header.encode(endian);
        data[base..base + header.len()].copy_from_slice(&header);
        let start = base + header.len();
        data[start..start + table.len()].copy_from_slice(&table);
        if let Some((off, size)) = self.payload {
            data[base + off..base + off + size].fill(PAYLOAD);
        }
        data
    }

    pub fn build(&self, len: usize) -> Vec<u8> {
        self.build_at(0, len)
    }
}

/// Segment, signature at 0x2000+0x400, symtab; 0x2400 bytes long.
pub fn signed(magic: Magic) -> Builder {
    Builder::new(magic)
        .command(LC_SEGMENT_64, 72, 0x11)
        .signature(0x2000, 0x400)
        .command(LC_SYMTAB, 24, 0x22)
}

/// Commands in table order as `(cmd, bytes)`.
pub fn commands(data: &[u8], base: usize, magic: Magic) -> Vec<(u32, Vec<u8>)> {
    let endian: Endian = magic.endian();
    let header = Header::decode(&data[base..base + magic.header_size()], magic).unwrap();
    let mut cursor = base + header.size();
    let mut out = Vec::new();
    for _ in 0..header.ncmds() {
        let command = LoadCommand::decode(&data[cursor..cursor + LoadCommand::SIZE], endian).unwrap();
        let end = cursor + command.cmdsize as usize;
        out.push((command.cmd, data[cursor..end].to_vec()));
        cursor = end;
    }
    out
}
