use crate::memory::mapper::Mapper;
use crate::memory::{EXTERNAL_RAM_END, EXTERNAL_RAM_START, OPEN_BUS};
use log::{trace, warn};

/// Unbanked cartridge: up to 32 KiB of ROM mapped flat, no external RAM.
/// Also stands in for unsupported controller types, whose bank-control
/// writes are accepted but change nothing.
#[derive(Clone)]
pub struct Rom {
    rom: Vec<u8>,
}

impl Rom {
    pub fn new(rom: Vec<u8>) -> Rom {
        Rom { rom }
    }
}

impl Mapper for Rom {
    #[inline]
    fn read(&self, addr: u16) -> u8 {
        match addr {
            0x0000..=0x7fff => self.rom.get(addr as usize).copied().unwrap_or(OPEN_BUS),
            addr if (EXTERNAL_RAM_START..=EXTERNAL_RAM_END).contains(&addr) => {
                warn!("ROM: read from absent external RAM at ${:04x}", addr);
                OPEN_BUS
            }
            _ => OPEN_BUS,
        }
    }

    #[inline]
    fn write(&mut self, addr: u16, data: u8) {
        // Bank-control traffic lands here on unbanked carts; there is
        // nothing to switch.
        trace!("ROM: ignored write of ${:02x} to ${:04x}", data, addr);
    }

    #[inline]
    fn rom_bank(&self) -> u16 {
        1
    }

    #[inline]
    fn ram_bank(&self) -> u8 {
        0
    }

    #[inline]
    fn ram_enabled(&self) -> bool {
        false
    }

    #[inline]
    fn name(&self) -> String {
        String::from("ROM")
    }
}
