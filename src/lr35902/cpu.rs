use crate::error::DotboyError;
use crate::lr35902::handlers::Handlers;
use crate::lr35902::irq::{Ime, Vector, INTERRUPT_DISPATCH_CYCLES};
use crate::lr35902::registers::{Flags, Registers};
use crate::lr35902::sm83::{Instruction, Opcode, Register, Sm83};
use crate::memory::mmu::Mmu;
use crate::memory::registers::{InterruptEnable, InterruptFlags};
use crate::memory::{INTERRUPT_ENABLE_REGISTER, INTERRUPT_FLAGS_REGISTER};
use log::{debug, trace};

/// Nominal cost of one tick while halted, so the timer keeps advancing.
pub const HALTED_TICK_CYCLES: usize = 4;

#[derive(Clone)]
pub struct Cpu {
    sm83: Sm83,
    registers: Registers,
    pub(crate) ime: Ime,
    pub(crate) halted: bool,
    cycles: usize,
}

impl Cpu {
    pub fn new() -> Cpu {
        Cpu {
            sm83: Sm83::new(),
            registers: Registers::post_boot(),
            ime: Ime::default(),
            halted: false,
            cycles: 0,
        }
    }

    pub fn reset(&mut self) {
        self.registers = Registers::post_boot();
        self.ime = Ime::default();
        self.halted = false;
        self.cycles = 0;
    }

    /// Execute one instruction: fetch, decode, advance PC past the encoding,
    /// run the handler. Returns the cycle cost. While halted, charges a
    /// nominal tick instead of fetching.
    pub fn step(&mut self, mmu: &mut Mmu) -> Result<usize, DotboyError> {
        if self.halted {
            self.cycles += HALTED_TICK_CYCLES;
            return Ok(HALTED_TICK_CYCLES);
        }

        let enable_armed = self.ime.enable_pending;

        let instruction = self.sm83.decode(mmu, self.registers.pc)?;
        trace!("[{:#06x}] {}", self.registers.pc, instruction);

        // Control-flow handlers overwrite PC afterwards, so call/rst push
        // the address of the next instruction and jr offsets are relative
        // to it.
        self.registers.pc = self.registers.pc.wrapping_add(instruction.length as u16);

        let cycles = self.execute(mmu, &instruction)?;

        // ei arms the master enable for the end of the following instruction
        if enable_armed && instruction.opcode != Opcode::Ei {
            self.ime.enabled = true;
            self.ime.enable_pending = false;
        }

        self.cycles += cycles;
        Ok(cycles)
    }

    fn execute(&mut self, mmu: &mut Mmu, instruction: &Instruction) -> Result<usize, DotboyError> {
        match instruction.opcode {
            Opcode::Nop => Handlers::nop(self, mmu, instruction),
            Opcode::Ld | Opcode::Ldh => Handlers::load(self, mmu, instruction),
            Opcode::Add => Handlers::add(self, mmu, instruction),
            Opcode::Adc => Handlers::add_with_carry(self, mmu, instruction),
            Opcode::Sub => Handlers::sub(self, mmu, instruction),
            Opcode::Sbc => Handlers::sub_with_carry(self, mmu, instruction),
            Opcode::And => Handlers::and(self, mmu, instruction),
            Opcode::Or => Handlers::or(self, mmu, instruction),
            Opcode::Xor => Handlers::xor(self, mmu, instruction),
            Opcode::Cp => Handlers::compare(self, mmu, instruction),
            Opcode::Inc => Handlers::increment(self, mmu, instruction),
            Opcode::Dec => Handlers::decrement(self, mmu, instruction),
            Opcode::Daa => Handlers::decimal_adjust(self, mmu, instruction),
            Opcode::Cpl => Handlers::complement(self, mmu, instruction),
            Opcode::Scf => Handlers::set_carry(self, mmu, instruction),
            Opcode::Ccf => Handlers::complement_carry(self, mmu, instruction),
            Opcode::Rlca | Opcode::Rla | Opcode::Rrca | Opcode::Rra => {
                Handlers::rotate_accumulator(self, mmu, instruction)
            }
            Opcode::Rlc | Opcode::Rrc | Opcode::Rl | Opcode::Rr => {
                Handlers::rotate(self, mmu, instruction)
            }
            Opcode::Sla | Opcode::Sra | Opcode::Srl | Opcode::Swap => {
                Handlers::shift(self, mmu, instruction)
            }
            Opcode::Bit => Handlers::test_bit(self, mmu, instruction),
            Opcode::Set => Handlers::set_bit(self, mmu, instruction),
            Opcode::Res => Handlers::reset_bit(self, mmu, instruction),
            Opcode::Jp | Opcode::Jr | Opcode::Call => Handlers::jump(self, mmu, instruction),
            Opcode::Ret | Opcode::Reti => Handlers::ret(self, mmu, instruction),
            Opcode::Rst => Handlers::restart(self, mmu, instruction),
            Opcode::Push => Handlers::push(self, mmu, instruction),
            Opcode::Pop => Handlers::pop(self, mmu, instruction),
            Opcode::Halt => Handlers::halt(self, mmu, instruction),
            Opcode::Stop => Handlers::stop(self, mmu, instruction),
            Opcode::Di => Handlers::disable_interrupts(self, mmu, instruction),
            Opcode::Ei => Handlers::enable_interrupts(self, mmu, instruction),
        }
    }

    /// One interrupt check per completed instruction. Any enabled request
    /// lifts a halt; servicing additionally needs IME and costs the
    /// dispatch cycles it returns.
    pub fn service_interrupts(&mut self, mmu: &mut Mmu) -> usize {
        let requested: InterruptFlags = mmu.read_as(INTERRUPT_FLAGS_REGISTER);
        let enabled: InterruptEnable = mmu.read_as(INTERRUPT_ENABLE_REGISTER);
        let pending = requested & InterruptFlags::from_bits_truncate(enabled.bits());

        if pending.is_empty() {
            return 0;
        }

        self.halted = false;

        if !self.ime.enabled {
            return 0;
        }

        let Some(vector) = Vector::from_flags(&pending) else {
            return 0;
        };

        debug!("Servicing {} interrupt -> ${:04x}", vector, vector.to_address());

        mmu.write(
            INTERRUPT_FLAGS_REGISTER,
            (requested & !vector.flag()).bits(),
        );
        self.ime.enabled = false;
        self.ime.enable_pending = false;

        let pc = self.registers.pc;
        self.push_stack(mmu, pc);
        self.registers.pc = vector.to_address();

        INTERRUPT_DISPATCH_CYCLES
    }

    pub fn read_register(&self, register: &Register) -> u8 {
        match register {
            Register::A => self.registers.a,
            Register::B => self.registers.b,
            Register::C => self.registers.c,
            Register::D => self.registers.d,
            Register::E => self.registers.e,
            Register::H => self.registers.h,
            Register::L => self.registers.l,
            Register::F => self.registers.f.bits(),
            _ => 0,
        }
    }

    pub fn read_register16(&self, register: &Register) -> u16 {
        match register {
            Register::AF => ((self.registers.a as u16) << 8) | self.registers.f.bits() as u16,
            Register::BC => ((self.registers.b as u16) << 8) | self.registers.c as u16,
            Register::DE => ((self.registers.d as u16) << 8) | self.registers.e as u16,
            Register::HL => ((self.registers.h as u16) << 8) | self.registers.l as u16,
            Register::SP => self.registers.sp,
            Register::PC => self.registers.pc,
            register => self.read_register(register) as u16,
        }
    }

    pub fn write_register(&mut self, register: &Register, data: u8) {
        match register {
            Register::A => self.registers.a = data,
            Register::B => self.registers.b = data,
            Register::C => self.registers.c = data,
            Register::D => self.registers.d = data,
            Register::E => self.registers.e = data,
            Register::H => self.registers.h = data,
            Register::L => self.registers.l = data,
            // the low nibble does not exist in silicon
            Register::F => self.registers.f = Flags::from_bits_truncate(data),
            _ => {}
        }
    }

    pub fn write_register16(&mut self, register: &Register, value: u16) {
        let high = (value >> 8) as u8;
        let low = value as u8;
        match register {
            Register::AF => {
                self.registers.a = high;
                self.registers.f = Flags::from_bits_truncate(low);
            }
            Register::BC => {
                self.registers.b = high;
                self.registers.c = low;
            }
            Register::DE => {
                self.registers.d = high;
                self.registers.e = low;
            }
            Register::HL => {
                self.registers.h = high;
                self.registers.l = low;
            }
            Register::SP => self.registers.sp = value,
            Register::PC => self.registers.pc = value,
            register => self.write_register(register, low),
        }
    }

    pub fn read_flag(&self, flag: Flags) -> bool {
        self.registers.f.contains(flag)
    }

    pub fn update_flag(&mut self, flag: Flags, value: bool) {
        self.registers.f.set(flag, value);
    }

    /// High byte lands at the higher address, so the low byte ends up at SP.
    pub fn push_stack(&mut self, mmu: &mut Mmu, value: u16) {
        self.registers.sp = self.registers.sp.wrapping_sub(1);
        mmu.write(self.registers.sp, (value >> 8) as u8);
        self.registers.sp = self.registers.sp.wrapping_sub(1);
        mmu.write(self.registers.sp, value as u8);
    }

    pub fn pop_stack(&mut self, mmu: &Mmu) -> u16 {
        let low = mmu.read(self.registers.sp) as u16;
        self.registers.sp = self.registers.sp.wrapping_add(1);
        let high = mmu.read(self.registers.sp) as u16;
        self.registers.sp = self.registers.sp.wrapping_add(1);
        (high << 8) | low
    }

    pub fn registers(&self) -> &Registers {
        &self.registers
    }

    pub fn cycles(&self) -> usize {
        self.cycles
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn ime_enabled(&self) -> bool {
        self.ime.enabled
    }

    pub(crate) fn clear_ime(&mut self) {
        self.ime = Ime::default();
    }
}

impl Default for Cpu {
    fn default() -> Cpu {
        Cpu::new()
    }
}

impl std::fmt::Display for Cpu {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "A: ${:02x}  F: ${:02x}  B: ${:02x}  C: ${:02x}  D: ${:02x}  E: ${:02x}  H: ${:02x}  L: ${:02x}  SP: ${:04x}  PC: ${:04x}",
            self.registers.a,
            self.registers.f.bits(),
            self.registers.b,
            self.registers.c,
            self.registers.d,
            self.registers.e,
            self.registers.h,
            self.registers.l,
            self.registers.sp,
            self.registers.pc
        )
    }
}
