use crate::error::DotboyError;
use crate::lr35902::cpu::Cpu;
use crate::lr35902::registers::Flags;
use crate::lr35902::sm83::{AddressingMode, Condition, Instruction, Opcode, Operand, Register};
use crate::memory::mmu::Mmu;

const HIGH_PAGE: u16 = 0xff00;

type HandlerResult = Result<usize, DotboyError>;

pub struct Handlers {}

impl Handlers {
    pub fn nop(_cpu: &mut Cpu, _mmu: &mut Mmu, instruction: &Instruction) -> HandlerResult {
        Ok(instruction.cycles.0)
    }

    pub fn load(cpu: &mut Cpu, mmu: &mut Mmu, instruction: &Instruction) -> HandlerResult {
        // LDH forms address the high page at 0xff00
        let high_page = instruction.opcode == Opcode::Ldh;
        let lhs = Handlers::lhs(instruction)?;
        let rhs = Handlers::rhs(instruction)?;

        // ld hl, sp+e computes half-carry/carry from the low byte on the way
        if let Operand::DisplacedReg16(reg, offset, _) = rhs {
            let base = cpu.read_register16(reg);
            let offset = *offset as i16 as u16;

            cpu.update_flag(Flags::ZERO, false);
            cpu.update_flag(Flags::SUBTRACT, false);
            cpu.update_flag(Flags::HALF_CARRY, (base & 0x000f) + (offset & 0x000f) > 0x000f);
            cpu.update_flag(Flags::CARRY, (base & 0x00ff) + (offset & 0x00ff) > 0x00ff);

            if let Operand::Reg16(destination, _) = lhs {
                cpu.write_register16(destination, base.wrapping_add(offset));
                return Ok(instruction.cycles.0);
            }

            return Err(DotboyError::MalformedInstruction {
                opcode: instruction.opcode,
            });
        }

        let value = Handlers::resolve_operand(cpu, mmu, rhs, high_page)?;
        if let Operand::Reg16(reg, mode) = rhs {
            if mode.contains(AddressingMode::Indirect) {
                Handlers::post_adjust(cpu, reg, mode);
            }
        }

        match lhs {
            Operand::Reg8(reg, mode) if mode.contains(AddressingMode::Indirect) => {
                // ld (c), a
                let addr = HIGH_PAGE + cpu.read_register(reg) as u16;
                mmu.write(addr, value as u8);
            }
            Operand::Reg8(reg, _) => cpu.write_register(reg, value as u8),
            Operand::Reg16(reg, mode) if mode.contains(AddressingMode::Indirect) => {
                let addr = cpu.read_register16(reg);
                mmu.write(addr, value as u8);
                Handlers::post_adjust(cpu, reg, mode);
            }
            Operand::Reg16(reg, _) => cpu.write_register16(reg, value as u16),
            Operand::Imm8(imm, mode) if high_page && mode.contains(AddressingMode::Indirect) => {
                mmu.write(HIGH_PAGE + *imm as u16, value as u8);
            }
            Operand::Imm16(imm, mode) if mode.contains(AddressingMode::Indirect) => {
                if matches!(rhs, Operand::Reg16(_, _)) {
                    // ld (imm16), sp
                    mmu.write16(*imm, value as u16);
                } else {
                    mmu.write(*imm, value as u8);
                }
            }
            _ => {
                return Err(DotboyError::MalformedInstruction {
                    opcode: instruction.opcode,
                })
            }
        }

        Ok(instruction.cycles.0)
    }

    pub fn add(cpu: &mut Cpu, mmu: &mut Mmu, instruction: &Instruction) -> HandlerResult {
        match Handlers::lhs(instruction)? {
            Operand::Reg8(Register::A, _) => {
                let value =
                    Handlers::resolve_operand(cpu, mmu, Handlers::rhs(instruction)?, false)? as u8;
                let a = cpu.read_register(&Register::A);
                let result = a.wrapping_add(value);
                cpu.write_register(&Register::A, result);

                cpu.update_flag(Flags::ZERO, result == 0);
                cpu.update_flag(Flags::SUBTRACT, false);
                cpu.update_flag(Flags::HALF_CARRY, (a & 0x0f) + (value & 0x0f) > 0x0f);
                cpu.update_flag(Flags::CARRY, (a as u16) + (value as u16) > 0xff);
            }
            Operand::Reg16(Register::HL, _) => {
                // add hl, r16 leaves Z untouched
                let value =
                    Handlers::resolve_operand(cpu, mmu, Handlers::rhs(instruction)?, false)? as u16;
                let hl = cpu.read_register16(&Register::HL);
                let result = hl.wrapping_add(value);
                cpu.write_register16(&Register::HL, result);

                cpu.update_flag(Flags::SUBTRACT, false);
                cpu.update_flag(Flags::HALF_CARRY, (hl & 0x0fff) + (value & 0x0fff) > 0x0fff);
                cpu.update_flag(Flags::CARRY, (hl as u32) + (value as u32) > 0xffff);
            }
            Operand::Reg16(Register::SP, _) => {
                // add sp, e: half-carry/carry from the low byte, Z and N cleared
                let offset = match Handlers::rhs(instruction)? {
                    Operand::Offset(offset) => *offset as i16 as u16,
                    operand => {
                        return Err(DotboyError::UnresolvedOperand {
                            operand: operand.clone(),
                        })
                    }
                };
                let sp = cpu.read_register16(&Register::SP);
                cpu.write_register16(&Register::SP, sp.wrapping_add(offset));

                cpu.update_flag(Flags::ZERO, false);
                cpu.update_flag(Flags::SUBTRACT, false);
                cpu.update_flag(Flags::HALF_CARRY, (sp & 0x000f) + (offset & 0x000f) > 0x000f);
                cpu.update_flag(Flags::CARRY, (sp & 0x00ff) + (offset & 0x00ff) > 0x00ff);
            }
            _ => {
                return Err(DotboyError::MalformedInstruction {
                    opcode: instruction.opcode,
                })
            }
        }

        Ok(instruction.cycles.0)
    }

    pub fn add_with_carry(cpu: &mut Cpu, mmu: &mut Mmu, instruction: &Instruction) -> HandlerResult {
        let value = Handlers::resolve_operand(cpu, mmu, Handlers::rhs(instruction)?, false)? as u8;
        let a = cpu.read_register(&Register::A);
        let carry = cpu.read_flag(Flags::CARRY) as u8;
        let result = a.wrapping_add(value).wrapping_add(carry);
        cpu.write_register(&Register::A, result);

        cpu.update_flag(Flags::ZERO, result == 0);
        cpu.update_flag(Flags::SUBTRACT, false);
        cpu.update_flag(Flags::HALF_CARRY, (a & 0x0f) + (value & 0x0f) + carry > 0x0f);
        cpu.update_flag(Flags::CARRY, (a as u16) + (value as u16) + (carry as u16) > 0xff);

        Ok(instruction.cycles.0)
    }

    pub fn sub(cpu: &mut Cpu, mmu: &mut Mmu, instruction: &Instruction) -> HandlerResult {
        let value = Handlers::resolve_operand(cpu, mmu, Handlers::rhs(instruction)?, false)? as u8;
        let a = cpu.read_register(&Register::A);
        let result = a.wrapping_sub(value);
        cpu.write_register(&Register::A, result);

        cpu.update_flag(Flags::ZERO, result == 0);
        cpu.update_flag(Flags::SUBTRACT, true);
        cpu.update_flag(Flags::HALF_CARRY, (a & 0x0f) < (value & 0x0f));
        cpu.update_flag(Flags::CARRY, a < value);

        Ok(instruction.cycles.0)
    }

    pub fn sub_with_carry(cpu: &mut Cpu, mmu: &mut Mmu, instruction: &Instruction) -> HandlerResult {
        let value = Handlers::resolve_operand(cpu, mmu, Handlers::rhs(instruction)?, false)? as u8;
        let a = cpu.read_register(&Register::A);
        let carry = cpu.read_flag(Flags::CARRY) as u8;
        let result = a.wrapping_sub(value).wrapping_sub(carry);
        cpu.write_register(&Register::A, result);

        cpu.update_flag(Flags::ZERO, result == 0);
        cpu.update_flag(Flags::SUBTRACT, true);
        cpu.update_flag(
            Flags::HALF_CARRY,
            (a & 0x0f) < (value & 0x0f) + carry,
        );
        cpu.update_flag(Flags::CARRY, (a as u16) < (value as u16) + (carry as u16));

        Ok(instruction.cycles.0)
    }

    pub fn and(cpu: &mut Cpu, mmu: &mut Mmu, instruction: &Instruction) -> HandlerResult {
        let value = Handlers::resolve_operand(cpu, mmu, Handlers::rhs(instruction)?, false)? as u8;
        let result = cpu.read_register(&Register::A) & value;
        cpu.write_register(&Register::A, result);

        cpu.update_flag(Flags::ZERO, result == 0);
        cpu.update_flag(Flags::SUBTRACT, false);
        cpu.update_flag(Flags::HALF_CARRY, true);
        cpu.update_flag(Flags::CARRY, false);

        Ok(instruction.cycles.0)
    }

    pub fn or(cpu: &mut Cpu, mmu: &mut Mmu, instruction: &Instruction) -> HandlerResult {
        let value = Handlers::resolve_operand(cpu, mmu, Handlers::rhs(instruction)?, false)? as u8;
        let result = cpu.read_register(&Register::A) | value;
        cpu.write_register(&Register::A, result);

        cpu.update_flag(Flags::ZERO, result == 0);
        cpu.update_flag(Flags::SUBTRACT, false);
        cpu.update_flag(Flags::HALF_CARRY, false);
        cpu.update_flag(Flags::CARRY, false);

        Ok(instruction.cycles.0)
    }

    pub fn xor(cpu: &mut Cpu, mmu: &mut Mmu, instruction: &Instruction) -> HandlerResult {
        let value = Handlers::resolve_operand(cpu, mmu, Handlers::rhs(instruction)?, false)? as u8;
        let result = cpu.read_register(&Register::A) ^ value;
        cpu.write_register(&Register::A, result);

        cpu.update_flag(Flags::ZERO, result == 0);
        cpu.update_flag(Flags::SUBTRACT, false);
        cpu.update_flag(Flags::HALF_CARRY, false);
        cpu.update_flag(Flags::CARRY, false);

        Ok(instruction.cycles.0)
    }

    /// Same flags as `sub`, result discarded.
    pub fn compare(cpu: &mut Cpu, mmu: &mut Mmu, instruction: &Instruction) -> HandlerResult {
        let value = Handlers::resolve_operand(cpu, mmu, Handlers::rhs(instruction)?, false)? as u8;
        let a = cpu.read_register(&Register::A);
        let result = a.wrapping_sub(value);

        cpu.update_flag(Flags::ZERO, result == 0);
        cpu.update_flag(Flags::SUBTRACT, true);
        cpu.update_flag(Flags::HALF_CARRY, (a & 0x0f) < (value & 0x0f));
        cpu.update_flag(Flags::CARRY, a < value);

        Ok(instruction.cycles.0)
    }

    pub fn increment(cpu: &mut Cpu, mmu: &mut Mmu, instruction: &Instruction) -> HandlerResult {
        match Handlers::lhs(instruction)? {
            Operand::Reg8(reg, _) => {
                let value = cpu.read_register(reg);
                let result = value.wrapping_add(1);
                cpu.write_register(reg, result);

                cpu.update_flag(Flags::ZERO, result == 0);
                cpu.update_flag(Flags::SUBTRACT, false);
                cpu.update_flag(Flags::HALF_CARRY, (value & 0x0f) == 0x0f);
            }
            Operand::Reg16(reg, mode) if mode.contains(AddressingMode::Indirect) => {
                // inc (hl): a byte-wide read-modify-write
                let addr = cpu.read_register16(reg);
                let value = mmu.read(addr);
                let result = value.wrapping_add(1);
                mmu.write(addr, result);

                cpu.update_flag(Flags::ZERO, result == 0);
                cpu.update_flag(Flags::SUBTRACT, false);
                cpu.update_flag(Flags::HALF_CARRY, (value & 0x0f) == 0x0f);
            }
            Operand::Reg16(reg, _) => {
                // 16-bit inc leaves flags alone
                let value = cpu.read_register16(reg);
                cpu.write_register16(reg, value.wrapping_add(1));
            }
            _ => {
                return Err(DotboyError::MalformedInstruction {
                    opcode: instruction.opcode,
                })
            }
        }

        Ok(instruction.cycles.0)
    }

    pub fn decrement(cpu: &mut Cpu, mmu: &mut Mmu, instruction: &Instruction) -> HandlerResult {
        match Handlers::lhs(instruction)? {
            Operand::Reg8(reg, _) => {
                let value = cpu.read_register(reg);
                let result = value.wrapping_sub(1);
                cpu.write_register(reg, result);

                cpu.update_flag(Flags::ZERO, result == 0);
                cpu.update_flag(Flags::SUBTRACT, true);
                cpu.update_flag(Flags::HALF_CARRY, (value & 0x0f) == 0);
            }
            Operand::Reg16(reg, mode) if mode.contains(AddressingMode::Indirect) => {
                let addr = cpu.read_register16(reg);
                let value = mmu.read(addr);
                let result = value.wrapping_sub(1);
                mmu.write(addr, result);

                cpu.update_flag(Flags::ZERO, result == 0);
                cpu.update_flag(Flags::SUBTRACT, true);
                cpu.update_flag(Flags::HALF_CARRY, (value & 0x0f) == 0);
            }
            Operand::Reg16(reg, _) => {
                let value = cpu.read_register16(reg);
                cpu.write_register16(reg, value.wrapping_sub(1));
            }
            _ => {
                return Err(DotboyError::MalformedInstruction {
                    opcode: instruction.opcode,
                })
            }
        }

        Ok(instruction.cycles.0)
    }

    /// BCD correction of A, conditioned on how the last arithmetic left N/H/C.
    pub fn decimal_adjust(cpu: &mut Cpu, _mmu: &mut Mmu, instruction: &Instruction) -> HandlerResult {
        let a = cpu.read_register(&Register::A);
        let mut adjust = 0u8;
        let mut carry = cpu.read_flag(Flags::CARRY);
        let subtract = cpu.read_flag(Flags::SUBTRACT);

        if cpu.read_flag(Flags::HALF_CARRY) || (!subtract && (a & 0x0f) > 0x09) {
            adjust |= 0x06;
        }
        if carry || (!subtract && a > 0x99) {
            adjust |= 0x60;
            carry = true;
        }

        let result = if subtract {
            a.wrapping_sub(adjust)
        } else {
            a.wrapping_add(adjust)
        };
        cpu.write_register(&Register::A, result);

        cpu.update_flag(Flags::ZERO, result == 0);
        cpu.update_flag(Flags::HALF_CARRY, false);
        cpu.update_flag(Flags::CARRY, carry);

        Ok(instruction.cycles.0)
    }

    pub fn complement(cpu: &mut Cpu, _mmu: &mut Mmu, instruction: &Instruction) -> HandlerResult {
        let a = cpu.read_register(&Register::A);
        cpu.write_register(&Register::A, !a);

        cpu.update_flag(Flags::SUBTRACT, true);
        cpu.update_flag(Flags::HALF_CARRY, true);

        Ok(instruction.cycles.0)
    }

    pub fn set_carry(cpu: &mut Cpu, _mmu: &mut Mmu, instruction: &Instruction) -> HandlerResult {
        cpu.update_flag(Flags::SUBTRACT, false);
        cpu.update_flag(Flags::HALF_CARRY, false);
        cpu.update_flag(Flags::CARRY, true);

        Ok(instruction.cycles.0)
    }

    pub fn complement_carry(cpu: &mut Cpu, _mmu: &mut Mmu, instruction: &Instruction) -> HandlerResult {
        let carry = cpu.read_flag(Flags::CARRY);
        cpu.update_flag(Flags::SUBTRACT, false);
        cpu.update_flag(Flags::HALF_CARRY, false);
        cpu.update_flag(Flags::CARRY, !carry);

        Ok(instruction.cycles.0)
    }

    /// The unprefixed accumulator rotates. They rotate like their CB
    /// counterparts but always report Z clear.
    pub fn rotate_accumulator(
        cpu: &mut Cpu,
        _mmu: &mut Mmu,
        instruction: &Instruction,
    ) -> HandlerResult {
        let value = cpu.read_register(&Register::A);
        let carry = cpu.read_flag(Flags::CARRY) as u8;

        let (result, carry_out) = match instruction.opcode {
            Opcode::Rlca => ((value << 1) | (value >> 7), value & 0x80 != 0),
            Opcode::Rla => ((value << 1) | carry, value & 0x80 != 0),
            Opcode::Rrca => ((value >> 1) | (value << 7), value & 0x01 != 0),
            Opcode::Rra => ((value >> 1) | (carry << 7), value & 0x01 != 0),
            _ => {
                return Err(DotboyError::MalformedInstruction {
                    opcode: instruction.opcode,
                })
            }
        };
        cpu.write_register(&Register::A, result);

        cpu.update_flag(Flags::ZERO, false);
        cpu.update_flag(Flags::SUBTRACT, false);
        cpu.update_flag(Flags::HALF_CARRY, false);
        cpu.update_flag(Flags::CARRY, carry_out);

        Ok(instruction.cycles.0)
    }

    pub fn rotate(cpu: &mut Cpu, mmu: &mut Mmu, instruction: &Instruction) -> HandlerResult {
        let target = Handlers::lhs(instruction)?;
        let value = Handlers::read_target(cpu, mmu, target, instruction.opcode)?;
        let carry = cpu.read_flag(Flags::CARRY) as u8;

        let (result, carry_out) = match instruction.opcode {
            Opcode::Rlc => ((value << 1) | (value >> 7), value & 0x80 != 0),
            Opcode::Rrc => ((value >> 1) | (value << 7), value & 0x01 != 0),
            Opcode::Rl => ((value << 1) | carry, value & 0x80 != 0),
            Opcode::Rr => ((value >> 1) | (carry << 7), value & 0x01 != 0),
            _ => {
                return Err(DotboyError::MalformedInstruction {
                    opcode: instruction.opcode,
                })
            }
        };
        Handlers::write_target(cpu, mmu, target, result, instruction.opcode)?;

        cpu.update_flag(Flags::ZERO, result == 0);
        cpu.update_flag(Flags::SUBTRACT, false);
        cpu.update_flag(Flags::HALF_CARRY, false);
        cpu.update_flag(Flags::CARRY, carry_out);

        Ok(instruction.cycles.0)
    }

    pub fn shift(cpu: &mut Cpu, mmu: &mut Mmu, instruction: &Instruction) -> HandlerResult {
        let target = Handlers::lhs(instruction)?;
        let value = Handlers::read_target(cpu, mmu, target, instruction.opcode)?;

        let (result, carry_out) = match instruction.opcode {
            Opcode::Sla => (value << 1, value & 0x80 != 0),
            // arithmetic shift keeps the sign bit
            Opcode::Sra => ((value >> 1) | (value & 0x80), value & 0x01 != 0),
            Opcode::Srl => (value >> 1, value & 0x01 != 0),
            Opcode::Swap => (value.rotate_left(4), false),
            _ => {
                return Err(DotboyError::MalformedInstruction {
                    opcode: instruction.opcode,
                })
            }
        };
        Handlers::write_target(cpu, mmu, target, result, instruction.opcode)?;

        cpu.update_flag(Flags::ZERO, result == 0);
        cpu.update_flag(Flags::SUBTRACT, false);
        cpu.update_flag(Flags::HALF_CARRY, false);
        cpu.update_flag(Flags::CARRY, carry_out);

        Ok(instruction.cycles.0)
    }

    pub fn test_bit(cpu: &mut Cpu, mmu: &mut Mmu, instruction: &Instruction) -> HandlerResult {
        let bit = match Handlers::lhs(instruction)? {
            Operand::Bit(bit) => *bit,
            operand => {
                return Err(DotboyError::UnresolvedOperand {
                    operand: operand.clone(),
                })
            }
        };
        let value = Handlers::read_target(cpu, mmu, Handlers::rhs(instruction)?, instruction.opcode)?;

        // Z is the complement of the tested bit; C stays put
        cpu.update_flag(Flags::ZERO, value & (1 << bit) == 0);
        cpu.update_flag(Flags::SUBTRACT, false);
        cpu.update_flag(Flags::HALF_CARRY, true);

        Ok(instruction.cycles.0)
    }

    pub fn set_bit(cpu: &mut Cpu, mmu: &mut Mmu, instruction: &Instruction) -> HandlerResult {
        let bit = match Handlers::lhs(instruction)? {
            Operand::Bit(bit) => *bit,
            operand => {
                return Err(DotboyError::UnresolvedOperand {
                    operand: operand.clone(),
                })
            }
        };
        let target = Handlers::rhs(instruction)?;
        let value = Handlers::read_target(cpu, mmu, target, instruction.opcode)?;
        Handlers::write_target(cpu, mmu, target, value | (1 << bit), instruction.opcode)?;

        Ok(instruction.cycles.0)
    }

    pub fn reset_bit(cpu: &mut Cpu, mmu: &mut Mmu, instruction: &Instruction) -> HandlerResult {
        let bit = match Handlers::lhs(instruction)? {
            Operand::Bit(bit) => *bit,
            operand => {
                return Err(DotboyError::UnresolvedOperand {
                    operand: operand.clone(),
                })
            }
        };
        let target = Handlers::rhs(instruction)?;
        let value = Handlers::read_target(cpu, mmu, target, instruction.opcode)?;
        Handlers::write_target(cpu, mmu, target, value & !(1 << bit), instruction.opcode)?;

        Ok(instruction.cycles.0)
    }

    /// jp / jr / call. The flag condition is evaluated here, against the
    /// flags as they are right now, never at decode time.
    pub fn jump(cpu: &mut Cpu, mmu: &mut Mmu, instruction: &Instruction) -> HandlerResult {
        let condition = match Handlers::lhs(instruction)? {
            Operand::Conditional(condition) => condition,
            operand => {
                return Err(DotboyError::UnresolvedOperand {
                    operand: operand.clone(),
                })
            }
        };

        if !Handlers::check_condition(cpu, condition) {
            return Ok(Handlers::not_taken(instruction));
        }

        match instruction.opcode {
            Opcode::Jp => {
                let addr =
                    Handlers::resolve_operand(cpu, mmu, Handlers::rhs(instruction)?, false)? as u16;
                cpu.write_register16(&Register::PC, addr);
            }
            Opcode::Jr => {
                let offset = match Handlers::rhs(instruction)? {
                    Operand::Offset(offset) => *offset,
                    operand => {
                        return Err(DotboyError::UnresolvedOperand {
                            operand: operand.clone(),
                        })
                    }
                };
                // relative to the instruction after jr
                let pc = cpu.read_register16(&Register::PC);
                cpu.write_register16(&Register::PC, pc.wrapping_add_signed(offset as i16));
            }
            Opcode::Call => {
                let addr =
                    Handlers::resolve_operand(cpu, mmu, Handlers::rhs(instruction)?, false)? as u16;
                let pc = cpu.read_register16(&Register::PC);
                cpu.push_stack(mmu, pc);
                cpu.write_register16(&Register::PC, addr);
            }
            _ => {
                return Err(DotboyError::MalformedInstruction {
                    opcode: instruction.opcode,
                })
            }
        }

        Ok(instruction.cycles.0)
    }

    pub fn ret(cpu: &mut Cpu, mmu: &mut Mmu, instruction: &Instruction) -> HandlerResult {
        let condition = match Handlers::lhs(instruction)? {
            Operand::Conditional(condition) => condition,
            operand => {
                return Err(DotboyError::UnresolvedOperand {
                    operand: operand.clone(),
                })
            }
        };

        if !Handlers::check_condition(cpu, condition) {
            return Ok(Handlers::not_taken(instruction));
        }

        let addr = cpu.pop_stack(mmu);
        cpu.write_register16(&Register::PC, addr);

        if instruction.opcode == Opcode::Reti {
            cpu.ime.enabled = true;
            cpu.ime.enable_pending = false;
        }

        Ok(instruction.cycles.0)
    }

    pub fn restart(cpu: &mut Cpu, mmu: &mut Mmu, instruction: &Instruction) -> HandlerResult {
        let target = match Handlers::lhs(instruction)? {
            Operand::Fixed(target) => *target,
            operand => {
                return Err(DotboyError::UnresolvedOperand {
                    operand: operand.clone(),
                })
            }
        };

        let pc = cpu.read_register16(&Register::PC);
        cpu.push_stack(mmu, pc);
        cpu.write_register16(&Register::PC, target);

        Ok(instruction.cycles.0)
    }

    pub fn push(cpu: &mut Cpu, mmu: &mut Mmu, instruction: &Instruction) -> HandlerResult {
        match Handlers::lhs(instruction)? {
            // push af goes through the packed flag byte
            Operand::Reg16(reg, _) => {
                let value = cpu.read_register16(reg);
                cpu.push_stack(mmu, value);
            }
            operand => {
                return Err(DotboyError::UnresolvedOperand {
                    operand: operand.clone(),
                })
            }
        }

        Ok(instruction.cycles.0)
    }

    pub fn pop(cpu: &mut Cpu, mmu: &mut Mmu, instruction: &Instruction) -> HandlerResult {
        match Handlers::lhs(instruction)? {
            Operand::Reg16(reg, _) => {
                let value = cpu.pop_stack(mmu);
                cpu.write_register16(reg, value);
            }
            operand => {
                return Err(DotboyError::UnresolvedOperand {
                    operand: operand.clone(),
                })
            }
        }

        Ok(instruction.cycles.0)
    }

    pub fn halt(cpu: &mut Cpu, _mmu: &mut Mmu, instruction: &Instruction) -> HandlerResult {
        cpu.halted = true;
        Ok(instruction.cycles.0)
    }

    /// No LCD/timer shutdown here; PC has already skipped the padding byte.
    pub fn stop(_cpu: &mut Cpu, _mmu: &mut Mmu, instruction: &Instruction) -> HandlerResult {
        Ok(instruction.cycles.0)
    }

    pub fn disable_interrupts(
        cpu: &mut Cpu,
        _mmu: &mut Mmu,
        instruction: &Instruction,
    ) -> HandlerResult {
        cpu.ime.enabled = false;
        cpu.ime.enable_pending = false;
        Ok(instruction.cycles.0)
    }

    /// Takes effect after the next instruction completes; the delay is
    /// resolved by `Cpu::step`.
    pub fn enable_interrupts(
        cpu: &mut Cpu,
        _mmu: &mut Mmu,
        instruction: &Instruction,
    ) -> HandlerResult {
        cpu.ime.enable_pending = true;
        Ok(instruction.cycles.0)
    }

    fn lhs(instruction: &Instruction) -> Result<&Operand, DotboyError> {
        instruction
            .lhs
            .as_ref()
            .ok_or(DotboyError::MalformedInstruction {
                opcode: instruction.opcode,
            })
    }

    fn rhs(instruction: &Instruction) -> Result<&Operand, DotboyError> {
        instruction
            .rhs
            .as_ref()
            .ok_or(DotboyError::MalformedInstruction {
                opcode: instruction.opcode,
            })
    }

    fn resolve_operand(
        cpu: &Cpu,
        mmu: &Mmu,
        operand: &Operand,
        high_page: bool,
    ) -> Result<usize, DotboyError> {
        match operand {
            Operand::Reg8(reg, mode) if mode.contains(AddressingMode::Indirect) => {
                // ld a, (c)
                Ok(mmu.read(HIGH_PAGE + cpu.read_register(reg) as u16) as usize)
            }
            Operand::Reg8(reg, _) => Ok(cpu.read_register(reg) as usize),
            Operand::Reg16(reg, mode) if mode.contains(AddressingMode::Indirect) => {
                Ok(mmu.read(cpu.read_register16(reg)) as usize)
            }
            Operand::Reg16(reg, _) => Ok(cpu.read_register16(reg) as usize),
            Operand::Imm8(imm, mode) if high_page && mode.contains(AddressingMode::Indirect) => {
                // ldh a, (imm)
                Ok(mmu.read(HIGH_PAGE + *imm as u16) as usize)
            }
            Operand::Imm8(imm, _) => Ok(*imm as usize),
            Operand::Imm16(imm, mode) if mode.contains(AddressingMode::Indirect) => {
                // ld a, (imm16)
                Ok(mmu.read(*imm) as usize)
            }
            Operand::Imm16(imm, _) => Ok(*imm as usize),
            Operand::Bit(bit) => Ok(*bit as usize),
            Operand::Fixed(addr) => Ok(*addr as usize),
            _ => Err(DotboyError::UnresolvedOperand {
                operand: operand.clone(),
            }),
        }
    }

    /// Single-byte target of the CB rotate/shift/bit family: a register, or
    /// the byte at (HL).
    fn read_target(
        cpu: &Cpu,
        mmu: &Mmu,
        operand: &Operand,
        opcode: Opcode,
    ) -> Result<u8, DotboyError> {
        match operand {
            Operand::Reg8(reg, _) => Ok(cpu.read_register(reg)),
            Operand::Reg16(reg, mode) if mode.contains(AddressingMode::Indirect) => {
                Ok(mmu.read(cpu.read_register16(reg)))
            }
            _ => Err(DotboyError::MalformedInstruction { opcode }),
        }
    }

    fn write_target(
        cpu: &mut Cpu,
        mmu: &mut Mmu,
        operand: &Operand,
        value: u8,
        opcode: Opcode,
    ) -> Result<(), DotboyError> {
        match operand {
            Operand::Reg8(reg, _) => {
                cpu.write_register(reg, value);
                Ok(())
            }
            Operand::Reg16(reg, mode) if mode.contains(AddressingMode::Indirect) => {
                mmu.write(cpu.read_register16(reg), value);
                Ok(())
            }
            _ => Err(DotboyError::MalformedInstruction { opcode }),
        }
    }

    fn post_adjust(cpu: &mut Cpu, reg: &Register, mode: &AddressingMode) {
        if mode.contains(AddressingMode::Increment) {
            let value = cpu.read_register16(reg);
            cpu.write_register16(reg, value.wrapping_add(1));
        } else if mode.contains(AddressingMode::Decrement) {
            let value = cpu.read_register16(reg);
            cpu.write_register16(reg, value.wrapping_sub(1));
        }
    }

    fn not_taken(instruction: &Instruction) -> usize {
        instruction.cycles.1.unwrap_or(instruction.cycles.0)
    }

    fn check_condition(cpu: &Cpu, condition: &Condition) -> bool {
        match condition {
            Condition::Z => cpu.read_flag(Flags::ZERO),
            Condition::NZ => !cpu.read_flag(Flags::ZERO),
            Condition::C => cpu.read_flag(Flags::CARRY),
            Condition::NC => !cpu.read_flag(Flags::CARRY),
            Condition::None => true,
        }
    }
}
