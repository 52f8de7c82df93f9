use crate::memory::mapper::Mapper;
use crate::memory::{
    DIV_REGISTER, ECHO_RAM_END, ECHO_RAM_OFFSET, ECHO_RAM_START, EXTERNAL_RAM_END,
    EXTERNAL_RAM_START, JOYPAD_REGISTER, TAC_REGISTER,
};

/// The memory bus. Cartridge windows are delegated to the bank controller,
/// echo RAM aliases work RAM, and everything else lives in one flat 64 KiB
/// array (WRAM, OAM, the I/O window and HRAM).
#[derive(Clone)]
pub struct Mmu {
    cartridge: Box<dyn Mapper>,
    memory: Vec<u8>,
    tac_written: bool,
}

impl Mmu {
    pub fn new(cartridge: Box<dyn Mapper>) -> Mmu {
        Mmu {
            cartridge,
            memory: vec![0; 0x10000],
            tac_written: false,
        }
    }

    pub fn read(&self, addr: u16) -> u8 {
        match addr {
            0x0000..=0x7fff => self.cartridge.read(addr),
            EXTERNAL_RAM_START..=EXTERNAL_RAM_END => self.cartridge.read(addr),
            ECHO_RAM_START..=ECHO_RAM_END => self.memory[(addr - ECHO_RAM_OFFSET) as usize],
            // input polling is out of scope; spoof "no buttons pressed"
            JOYPAD_REGISTER => self.memory[addr as usize] | 0x0f,
            _ => self.memory[addr as usize],
        }
    }

    pub fn write(&mut self, addr: u16, data: u8) {
        match addr {
            // bank-control commands, never a memory write
            0x0000..=0x7fff => self.cartridge.write(addr, data),
            EXTERNAL_RAM_START..=EXTERNAL_RAM_END => self.cartridge.write(addr, data),
            ECHO_RAM_START..=ECHO_RAM_END => self.memory[(addr - ECHO_RAM_OFFSET) as usize] = data,
            DIV_REGISTER => self.memory[addr as usize] = 0,
            TAC_REGISTER => {
                self.memory[addr as usize] = data;
                self.tac_written = true;
            }
            _ => self.memory[addr as usize] = data,
        }
    }

    pub fn read16(&self, addr: u16) -> u16 {
        let lo = self.read(addr) as u16;
        let hi = self.read(addr.wrapping_add(1)) as u16;
        (hi << 8) | lo
    }

    pub fn write16(&mut self, addr: u16, data: u16) {
        self.write(addr, data as u8);
        self.write(addr.wrapping_add(1), (data >> 8) as u8);
    }

    pub fn read_as<T>(&self, addr: u16) -> T
    where
        T: From<u8>,
    {
        T::from(self.read(addr))
    }

    /// Raw access into the backing array for the timer/interrupt units,
    /// bypassing the DIV write-reset and TAC notification paths.
    pub(crate) fn read_io(&self, addr: u16) -> u8 {
        self.memory[addr as usize]
    }

    pub(crate) fn write_io(&mut self, addr: u16, data: u8) {
        self.memory[addr as usize] = data;
    }

    /// True once per TAC store; consumed by the timer to reload its scaler.
    pub(crate) fn take_tac_write(&mut self) -> bool {
        std::mem::take(&mut self.tac_written)
    }

    pub fn replace_cartridge(&mut self, cartridge: Box<dyn Mapper>) {
        self.cartridge = cartridge;
    }

    pub fn clear(&mut self) {
        self.memory.fill(0);
        self.tac_written = false;
    }

    pub fn rom_bank(&self) -> u16 {
        self.cartridge.rom_bank()
    }

    pub fn ram_bank(&self) -> u8 {
        self.cartridge.ram_bank()
    }

    pub fn ram_enabled(&self) -> bool {
        self.cartridge.ram_enabled()
    }

    pub fn mapper_name(&self) -> String {
        self.cartridge.name()
    }
}
