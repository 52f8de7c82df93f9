use crate::lr35902::sm83::{Opcode, Operand};
use snafu::prelude::*;
use std::path::PathBuf;

#[derive(Debug, Snafu)]
pub enum DotboyError {
    #[snafu(display("Failed to decode instruction ({:02x}) at address: ${:04x}", opcode, address))]
    DecoderFailure { opcode: u8, address: u16 },
    #[snafu(display("Illegal opcode ({:02x}) at address: ${:04x}", opcode, address))]
    IllegalOpcode { opcode: u8, address: u16 },
    #[snafu(display("Unknown condition bits: {:08b}", data))]
    UnknownConditionBits { data: u8 },
    #[snafu(display("Unknown register bits: {:08b}", data))]
    UnknownRegisterBits { data: u8 },
    #[snafu(display("Missing operand for {:?}", opcode))]
    MalformedInstruction { opcode: Opcode },
    #[snafu(display("Unresolved operand: {:?}", operand))]
    UnresolvedOperand { operand: Operand },
    #[snafu(display("ROM image too small to carry a cartridge header: {} bytes", len))]
    RomTooSmall { len: usize },
    #[snafu(display("Failed to read ROM from {}: {}", path.display(), source))]
    RomIo { path: PathBuf, source: std::io::Error },
}
