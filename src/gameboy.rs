use crate::error::DotboyError;
use crate::lr35902::cpu::Cpu;
use crate::lr35902::timer::Timer;
use crate::memory::mapper;
use crate::memory::mmu::Mmu;
use log::error;

/// One display frame's worth of cycles (4194304 Hz / ~59.7 fps).
pub const CYCLES_PER_FRAME: usize = 70_224;

/// The execution loop: owns the CPU, bus and timer, runs instructions
/// against a cycle budget and checks interrupts after every one. All
/// mutable state lives here; the caller drives it at whatever cadence it
/// likes and reads state back through the accessors.
pub struct GameBoy {
    cpu: Cpu,
    mmu: Mmu,
    timer: Timer,
    running: bool,
}

impl GameBoy {
    pub fn new(rom: Vec<u8>) -> Result<GameBoy, DotboyError> {
        let cartridge = mapper::for_cartridge(rom)?;

        Ok(GameBoy {
            cpu: Cpu::new(),
            mmu: Mmu::new(cartridge),
            timer: Timer::new(),
            running: true,
        })
    }

    /// Back to the documented post-boot state. The cartridge stays.
    pub fn reset(&mut self) {
        self.cpu.reset();
        self.timer.reset();
        self.mmu.clear();
        self.running = true;
    }

    /// Swap the cartridge wholesale and reset. Only sound while the loop is
    /// stopped; nothing here runs concurrently with execution.
    pub fn load_rom(&mut self, rom: Vec<u8>) -> Result<(), DotboyError> {
        self.mmu.replace_cartridge(mapper::for_cartridge(rom)?);
        self.reset();
        Ok(())
    }

    /// One instruction (or one halted tick), timer fed with its cycle cost,
    /// then the interrupt check. A fault stops the loop, clears IME and is
    /// handed back to the caller; the host process stays up.
    pub fn step_instruction(&mut self) -> Result<usize, DotboyError> {
        match self.try_step() {
            Ok(cycles) => Ok(cycles),
            Err(err) => {
                error!("Execution fault: {}", err);
                self.running = false;
                self.cpu.clear_ime();
                Err(err)
            }
        }
    }

    fn try_step(&mut self) -> Result<usize, DotboyError> {
        let mut cycles = self.cpu.step(&mut self.mmu)?;
        self.timer.tick(&mut self.mmu, cycles);

        let dispatch = self.cpu.service_interrupts(&mut self.mmu);
        if dispatch > 0 {
            self.timer.tick(&mut self.mmu, dispatch);
            cycles += dispatch;
        }

        Ok(cycles)
    }

    /// Run instructions until the budget is spent or the loop is stopped.
    /// Returns the cycles actually consumed (the last instruction may
    /// overshoot the budget).
    pub fn run_cycle_budget(&mut self, budget: usize) -> Result<usize, DotboyError> {
        let mut spent = 0;
        while self.running && spent < budget {
            spent += self.step_instruction()?;
        }
        Ok(spent)
    }

    pub fn run_frame(&mut self) -> Result<usize, DotboyError> {
        self.run_cycle_budget(CYCLES_PER_FRAME)
    }

    /// Cooperative cancellation; honored between instructions.
    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn resume(&mut self) {
        self.running = true;
    }

    pub fn running(&self) -> bool {
        self.running
    }

    pub fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    pub fn mmu(&self) -> &Mmu {
        &self.mmu
    }

    pub fn timer(&self) -> &Timer {
        &self.timer
    }

    pub fn cpu_mut(&mut self) -> &mut Cpu {
        &mut self.cpu
    }

    pub fn mmu_mut(&mut self) -> &mut Mmu {
        &mut self.mmu
    }
}
