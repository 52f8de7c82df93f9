use crate::memory::mmu::Mmu;
use crate::memory::registers::InterruptFlags;
use crate::memory::{
    DIV_REGISTER, INTERRUPT_FLAGS_REGISTER, TAC_REGISTER, TIMA_REGISTER, TMA_REGISTER,
};

const DIV_PERIOD: usize = 256;
const TIMER_ENABLE: u8 = 0b100;

/// Divider/timer unit. Fed the cycle cost of every executed instruction
/// (and of every halted tick), it advances DIV and, when TAC enables it,
/// counts the scaler down towards the next TIMA increment.
#[derive(Clone)]
pub struct Timer {
    div_cycles: usize,
    countdown: isize,
    scaler: isize,
}

impl Timer {
    pub fn new() -> Timer {
        let scaler = Timer::scaler_for(0);
        Timer {
            div_cycles: 0,
            countdown: scaler,
            scaler,
        }
    }

    pub fn reset(&mut self) {
        self.div_cycles = 0;
        self.scaler = Timer::scaler_for(0);
        self.countdown = self.scaler;
    }

    pub fn tick(&mut self, mmu: &mut Mmu, cycles: usize) {
        // a TAC store restarts the countdown at the newly selected rate
        if mmu.take_tac_write() {
            self.scaler = Timer::scaler_for(mmu.read_io(TAC_REGISTER));
            self.countdown = self.scaler;
        }

        self.div_cycles += cycles;
        while self.div_cycles >= DIV_PERIOD {
            self.div_cycles -= DIV_PERIOD;
            let div = mmu.read_io(DIV_REGISTER);
            mmu.write_io(DIV_REGISTER, div.wrapping_add(1));
        }

        if mmu.read_io(TAC_REGISTER) & TIMER_ENABLE == 0 {
            return;
        }

        self.countdown -= cycles as isize;
        while self.countdown <= 0 {
            self.countdown += self.scaler;

            let tima = mmu.read_io(TIMA_REGISTER);
            if tima == 0xff {
                // overflow: reload from TMA and request the interrupt
                mmu.write_io(TIMA_REGISTER, mmu.read_io(TMA_REGISTER));
                let flags = InterruptFlags::from(mmu.read_io(INTERRUPT_FLAGS_REGISTER))
                    | InterruptFlags::TIMER;
                mmu.write_io(INTERRUPT_FLAGS_REGISTER, flags.bits());
            } else {
                mmu.write_io(TIMA_REGISTER, tima.wrapping_add(1));
            }
        }
    }

    pub fn scaler(&self) -> usize {
        self.scaler as usize
    }

    pub fn divider_cycles(&self) -> usize {
        self.div_cycles
    }

    fn scaler_for(tac: u8) -> isize {
        match tac & 0b11 {
            0b00 => 1024,
            0b01 => 16,
            0b10 => 64,
            _ => 256,
        }
    }
}

impl Default for Timer {
    fn default() -> Timer {
        Timer::new()
    }
}
