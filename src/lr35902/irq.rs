use crate::memory::registers::InterruptFlags;

/// Cycle cost of pushing PC and redirecting to a vector.
pub const INTERRUPT_DISPATCH_CYCLES: usize = 20;

/// EI only takes effect after the instruction that follows it, so the
/// master enable is two bits of state, not one.
#[derive(Clone, Default)]
pub struct Ime {
    pub enabled: bool,
    pub enable_pending: bool,
}

pub enum Vector {
    VBlank,
    LcdStat,
    Timer,
    Serial,
    Joypad,
}

impl Vector {
    /// Highest-priority pending source. Priority runs from bit 0 upward:
    /// V-Blank first, joypad last.
    pub fn from_flags(flags: &InterruptFlags) -> Option<Vector> {
        if flags.contains(InterruptFlags::VBLANK) {
            Some(Vector::VBlank)
        } else if flags.contains(InterruptFlags::LCD_STAT) {
            Some(Vector::LcdStat)
        } else if flags.contains(InterruptFlags::TIMER) {
            Some(Vector::Timer)
        } else if flags.contains(InterruptFlags::SERIAL) {
            Some(Vector::Serial)
        } else if flags.contains(InterruptFlags::JOYPAD) {
            Some(Vector::Joypad)
        } else {
            None
        }
    }

    pub fn to_address(&self) -> u16 {
        match self {
            Vector::VBlank => 0x0040,
            Vector::LcdStat => 0x0048,
            Vector::Timer => 0x0050,
            Vector::Serial => 0x0058,
            Vector::Joypad => 0x0060,
        }
    }

    pub fn flag(&self) -> InterruptFlags {
        match self {
            Vector::VBlank => InterruptFlags::VBLANK,
            Vector::LcdStat => InterruptFlags::LCD_STAT,
            Vector::Timer => InterruptFlags::TIMER,
            Vector::Serial => InterruptFlags::SERIAL,
            Vector::Joypad => InterruptFlags::JOYPAD,
        }
    }
}

impl std::fmt::Display for Vector {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Vector::VBlank => write!(f, "VBLANK"),
            Vector::LcdStat => write!(f, "STAT"),
            Vector::Timer => write!(f, "TIMER"),
            Vector::Serial => write!(f, "SERIAL"),
            Vector::Joypad => write!(f, "JOYPAD"),
        }
    }
}
