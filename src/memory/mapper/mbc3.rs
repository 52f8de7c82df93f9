use crate::memory::mapper::Mapper;
use crate::memory::{EXTERNAL_RAM_START, OPEN_BUS, RAM_BANK_SIZE, ROM_BANK_SIZE};
use log::{debug, warn};

#[derive(Clone)]
pub struct Mbc3 {
    rom: Vec<u8>,
    ram: Vec<u8>,
    rom_bank: u16,
    ram_bank: u8,
    ram_enabled: bool,
}

impl Mbc3 {
    pub fn new(rom: Vec<u8>) -> Mbc3 {
        Mbc3 {
            rom,
            ram: vec![0; 4 * RAM_BANK_SIZE],
            rom_bank: 1,
            ram_bank: 0,
            ram_enabled: false,
        }
    }

    fn rom_index(&self, addr: u16) -> usize {
        ((self.rom_bank.max(1) as usize - 1) * ROM_BANK_SIZE + addr as usize) % self.rom.len()
    }

    fn ram_index(&self, addr: u16) -> usize {
        ((addr - EXTERNAL_RAM_START) as usize + self.ram_bank as usize * RAM_BANK_SIZE)
            % self.ram.len()
    }
}

impl Mapper for Mbc3 {
    #[inline]
    fn read(&self, addr: u16) -> u8 {
        match addr {
            0x0000..=0x3fff => self.rom.get(addr as usize).copied().unwrap_or(OPEN_BUS),
            0x4000..=0x7fff => self.rom[self.rom_index(addr)],
            0xa000..=0xbfff if self.ram_enabled => self.ram[self.ram_index(addr)],
            0xa000..=0xbfff => {
                warn!("MBC3: read from disabled external RAM at ${:04x}", addr);
                OPEN_BUS
            }
            _ => OPEN_BUS,
        }
    }

    #[inline]
    fn write(&mut self, addr: u16, data: u8) {
        match addr {
            0x0000..=0x1fff => {
                // also gates the RTC registers, which this core leaves out
                self.ram_enabled = data & 0x0f == 0x0a;
                debug!("MBC3: RAM enabled: {}", self.ram_enabled);
            }
            0x2000..=0x3fff => {
                let bank = (data & 0b0111_1111) as u16;
                self.rom_bank = if bank == 0 { 1 } else { bank };
                debug!("MBC3: Switched to ROM bank {}", self.rom_bank);
            }
            0x4000..=0x5fff => {
                if data < 8 {
                    self.ram_bank = data;
                    debug!("MBC3: Switched to RAM bank {}", self.ram_bank);
                } else {
                    // 0x08-0x0c select RTC registers
                    debug!("MBC3: ignored RTC register select ${:02x}", data);
                }
            }
            0x6000..=0x7fff => {
                debug!("MBC3: ignored RTC latch write ${:02x}", data);
            }
            0xa000..=0xbfff if self.ram_enabled => {
                let index = self.ram_index(addr);
                self.ram[index] = data;
            }
            0xa000..=0xbfff => {
                warn!(
                    "MBC3: dropped write of ${:02x} to disabled external RAM at ${:04x}",
                    data, addr
                );
            }
            _ => {}
        }
    }

    #[inline]
    fn rom_bank(&self) -> u16 {
        self.rom_bank.max(1)
    }

    #[inline]
    fn ram_bank(&self) -> u8 {
        self.ram_bank
    }

    #[inline]
    fn ram_enabled(&self) -> bool {
        self.ram_enabled
    }

    #[inline]
    fn name(&self) -> String {
        String::from("MBC3")
    }
}
