use crate::error::DotboyError;
use crate::memory::{CARTRIDGE_TYPE_OFFSET, RAM_SIZE_OFFSET, ROM_SIZE_OFFSET};
use dyn_clone::DynClone;
use log::{info, warn};

pub mod mbc1;
pub mod mbc2;
pub mod mbc3;
pub mod mbc5;
pub mod rom;

/// Cartridge-side address decoding. Reads cover the two ROM windows and the
/// external RAM window; writes below 0x8000 are bank-control commands and
/// never touch backing memory.
pub trait Mapper: DynClone {
    fn read(&self, addr: u16) -> u8;
    fn write(&mut self, addr: u16, data: u8);
    fn rom_bank(&self) -> u16;
    fn ram_bank(&self) -> u8;
    fn ram_enabled(&self) -> bool;
    fn name(&self) -> String;
}

dyn_clone::clone_trait_object!(Mapper);

/// Selects a bank controller from the cartridge-type byte at 0x147.
///
/// Unsupported controller families load fine but keep banking inert, so a
/// ROM with an exotic mapper still boots as far as its fixed bank allows.
pub fn for_cartridge(rom: Vec<u8>) -> Result<Box<dyn Mapper>, DotboyError> {
    if rom.len() <= RAM_SIZE_OFFSET {
        return Err(DotboyError::RomTooSmall { len: rom.len() });
    }

    let cartridge_type = rom[CARTRIDGE_TYPE_OFFSET];
    info!(
        "Cartridge type ${:02x}, ROM size code ${:02x}, RAM size code ${:02x}, {} bytes of ROM",
        cartridge_type,
        rom[ROM_SIZE_OFFSET],
        rom[RAM_SIZE_OFFSET],
        rom.len()
    );

    let mapper: Box<dyn Mapper> = match cartridge_type {
        0x00 => Box::new(rom::Rom::new(rom)),
        0x01..=0x03 => Box::new(mbc1::Mbc1::new(rom)),
        0x05 | 0x06 => Box::new(mbc2::Mbc2::new(rom)),
        0x0f..=0x13 => Box::new(mbc3::Mbc3::new(rom)),
        0x19..=0x1b => Box::new(mbc5::Mbc5::new(rom)),
        _ => {
            warn!(
                "Unsupported cartridge type ${:02x}, banking will be inert",
                cartridge_type
            );
            Box::new(rom::Rom::new(rom))
        }
    };

    info!("Mapped cartridge as {}", mapper.name());
    Ok(mapper)
}
