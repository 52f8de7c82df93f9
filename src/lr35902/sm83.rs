use crate::error::DotboyError;
use crate::memory::mmu::Mmu;
use bitflags::bitflags;
use std::collections::HashMap;

type FDecode = fn(&Mmu, u16, Opcode) -> Result<Instruction, DotboyError>;

/// Opcodes with no operation on the SM83 die. Fetching one is a fault, not
/// a decode gap; the dispatch tables are verified gap-free at construction.
const ILLEGAL_OPCODES: [u8; 11] = [
    0xd3, 0xdb, 0xdd, 0xe3, 0xe4, 0xeb, 0xec, 0xed, 0xf4, 0xfc, 0xfd,
];

#[derive(PartialEq, Debug, Clone)]
pub enum Register {
    A,
    B,
    C,
    D,
    E,
    H,
    L,
    F,
    AF,
    BC,
    DE,
    HL,
    SP,
    PC,
}

bitflags! {
    #[derive(PartialEq, Debug, Clone)]
    pub struct AddressingMode: u8 {
        const Direct    = 0b0001;
        const Indirect  = 0b0010;
        const Increment = 0b0100;
        const Decrement = 0b1000;
    }
}

#[derive(PartialEq, Debug, Clone)]
pub enum Condition {
    None,
    NZ,
    Z,
    NC,
    C,
}

#[derive(Debug, Clone)]
pub enum Operand {
    Reg8(Register, AddressingMode),
    Reg16(Register, AddressingMode),
    Imm8(u8, AddressingMode),
    Imm16(u16, AddressingMode),
    Conditional(Condition),
    DisplacedReg16(Register, i8, AddressingMode),
    Offset(i8),
    Bit(u8),
    // restart targets are baked into the opcode, never fetched
    Fixed(u16),
}

#[derive(PartialEq, Debug, Copy, Clone)]
pub enum Opcode {
    Nop,
    Ld,
    Ldh,
    Inc,
    Dec,
    Rlc,
    Rrc,
    Rl,
    Rr,
    Sla,
    Sra,
    Srl,
    Swap,
    Bit,
    Res,
    Set,
    Jp,
    Jr,
    Call,
    Ret,
    Reti,
    Rst,
    Push,
    Pop,
    Add,
    Adc,
    Sub,
    Sbc,
    And,
    Xor,
    Or,
    Cp,
    Daa,
    Cpl,
    Ccf,
    Scf,
    Rlca,
    Rla,
    Rrca,
    Rra,
    Halt,
    Stop,
    Di,
    Ei,
}

#[derive(Debug, Clone)]
pub struct Instruction {
    pub opcode: Opcode,
    pub lhs: Option<Operand>,
    pub rhs: Option<Operand>,
    pub length: usize,
    /// (taken, not-taken) for conditional control flow, (cost, None) otherwise.
    pub cycles: (usize, Option<usize>),
}

macro_rules! define_decoder {
    ( $pattern:expr, $opcode:expr, $function:expr ) => {{
        (String::from($pattern), $opcode, $function)
    }};
}

#[derive(Clone)]
pub struct Sm83 {
    decoder_lut: Vec<(String, Opcode, FDecode)>,
    decoder_lut_prefixed: Vec<(String, Opcode, FDecode)>,
    cached_lut: HashMap<u8, Instruction>,
    cached_lut_prefixed: HashMap<u8, Instruction>,
}

impl Sm83 {
    pub fn new() -> Sm83 {
        let mut decoder_lut = Vec::new();
        let mut decoder_lut_prefixed = Vec::new();

        Sm83::propagate_decoders(&mut decoder_lut);
        Sm83::propagate_decoders_prefixed(&mut decoder_lut_prefixed);

        let sm83 = Sm83 {
            decoder_lut,
            decoder_lut_prefixed,
            cached_lut: HashMap::new(),
            cached_lut_prefixed: HashMap::new(),
        };

        sm83.assert_coverage();
        sm83
    }

    /// Every one of the 2x256 dispatch slots must either decode or be a
    /// listed illegal opcode. A gap is a configuration error and panics
    /// here, at construction, instead of surfacing mid-execution.
    fn assert_coverage(&self) {
        let mut gaps = Vec::new();
        for byte in 0..=0xffu8 {
            if !ILLEGAL_OPCODES.contains(&byte) && !Sm83::covered(&self.decoder_lut, byte) {
                gaps.push(format!("{:02x}", byte));
            }
            if !Sm83::covered(&self.decoder_lut_prefixed, byte) {
                gaps.push(format!("cb {:02x}", byte));
            }
        }

        if !gaps.is_empty() {
            panic!("Dispatch table has undefined opcodes: {}", gaps.join(", "));
        }
    }

    fn covered(lut: &[(String, Opcode, FDecode)], byte: u8) -> bool {
        let opcode_str = format!("{:08b}", byte);
        lut.iter()
            .any(|(pattern, _, _)| Sm83::pattern_matches(pattern, &opcode_str))
    }

    fn pattern_matches(pattern: &str, opcode_str: &str) -> bool {
        pattern.len() == opcode_str.len()
            && pattern
                .bytes()
                .zip(opcode_str.bytes())
                .all(|(p, o)| p == b'x' || p == o)
    }

    pub fn decode(&mut self, mmu: &Mmu, current_pc: u16) -> Result<Instruction, DotboyError> {
        let mut opcode_byte = mmu.read(current_pc);

        if ILLEGAL_OPCODES.contains(&opcode_byte) {
            return Err(DotboyError::IllegalOpcode {
                opcode: opcode_byte,
                address: current_pc,
            });
        }

        let mut prefix = false;
        if opcode_byte == 0xcb {
            opcode_byte = mmu.read(current_pc.wrapping_add(1));
            prefix = true;
        }

        let cached_lut = if prefix { &self.cached_lut_prefixed } else { &self.cached_lut };
        if let Some(instruction) = cached_lut.get(&opcode_byte) {
            let mut instruction = instruction.clone();

            // decoded shapes are stable per opcode byte; only the immediate
            // bytes change between occurrences
            instruction.lhs = Sm83::refresh_operand(instruction.lhs, mmu, current_pc);
            instruction.rhs = Sm83::refresh_operand(instruction.rhs, mmu, current_pc);

            return Ok(instruction);
        }

        let opcode_str = format!("{:08b}", opcode_byte);
        let lut = if prefix { &self.decoder_lut_prefixed } else { &self.decoder_lut };

        for (pattern, opcode, decoder_fn) in lut {
            if Sm83::pattern_matches(pattern, &opcode_str) {
                let instruction = decoder_fn(mmu, current_pc, *opcode)?;
                if prefix {
                    self.cached_lut_prefixed.insert(opcode_byte, instruction.clone());
                } else {
                    self.cached_lut.insert(opcode_byte, instruction.clone());
                }
                return Ok(instruction);
            }
        }

        Err(DotboyError::DecoderFailure {
            opcode: mmu.read(current_pc),
            address: current_pc,
        })
    }

    fn refresh_operand(operand: Option<Operand>, mmu: &Mmu, current_pc: u16) -> Option<Operand> {
        match operand {
            Some(Operand::Imm8(_, mode)) => {
                Some(Operand::Imm8(mmu.read(current_pc.wrapping_add(1)), mode))
            }
            Some(Operand::Imm16(_, mode)) => {
                Some(Operand::Imm16(mmu.read16(current_pc.wrapping_add(1)), mode))
            }
            Some(Operand::Offset(_)) => {
                Some(Operand::Offset(mmu.read(current_pc.wrapping_add(1)) as i8))
            }
            Some(Operand::DisplacedReg16(reg, _, mode)) => Some(Operand::DisplacedReg16(
                reg,
                mmu.read(current_pc.wrapping_add(1)) as i8,
                mode,
            )),
            _ => operand,
        }
    }

    fn lookup_register(data: u8) -> Result<Register, DotboyError> {
        match data {
            0b000 => Ok(Register::B),
            0b001 => Ok(Register::C),
            0b010 => Ok(Register::D),
            0b011 => Ok(Register::E),
            0b100 => Ok(Register::H),
            0b101 => Ok(Register::L),
            0b110 => Ok(Register::HL),
            0b111 => Ok(Register::A),
            _ => Err(DotboyError::UnknownRegisterBits { data }),
        }
    }

    fn lookup_register_16(data: u8) -> Result<Register, DotboyError> {
        match data {
            0b00 => Ok(Register::BC),
            0b01 => Ok(Register::DE),
            0b10 => Ok(Register::HL),
            0b11 => Ok(Register::SP),
            _ => Err(DotboyError::UnknownRegisterBits { data }),
        }
    }

    fn lookup_condition_3bits(data: u8) -> Result<Condition, DotboyError> {
        match data {
            0b011 => Ok(Condition::None),
            0b100 => Ok(Condition::NZ),
            0b101 => Ok(Condition::Z),
            0b110 => Ok(Condition::NC),
            0b111 => Ok(Condition::C),
            _ => Err(DotboyError::UnknownConditionBits { data }),
        }
    }

    fn lookup_condition_2bits(data: u8) -> Result<Condition, DotboyError> {
        match data {
            0b00 => Ok(Condition::NZ),
            0b01 => Ok(Condition::Z),
            0b10 => Ok(Condition::NC),
            0b11 => Ok(Condition::C),
            _ => Err(DotboyError::UnknownConditionBits { data }),
        }
    }

    fn decode_8bit_operand(
        value: u8,
        base_cycles: usize,
        hl_cycles: usize,
    ) -> Result<(Operand, usize), DotboyError> {
        let operand = if value == 0b110 {
            Operand::Reg16(Register::HL, AddressingMode::Indirect)
        } else {
            Operand::Reg8(Sm83::lookup_register(value)?, AddressingMode::Direct)
        };
        let cycles = if value != 0b110 { base_cycles } else { hl_cycles };
        Ok((operand, cycles))
    }

    fn propagate_decoders(lut: &mut Vec<(String, Opcode, FDecode)>) {
        // nop
        lut.push(define_decoder!("00000000", Opcode::Nop, |_, _, opcode| {
            Ok(Instruction {
                opcode,
                lhs: None,
                rhs: None,
                length: 1,
                cycles: (4, None),
            })
        }));

        // ld (imm16), SP
        lut.push(define_decoder!("00001000", Opcode::Ld, |mmu: &Mmu, pc: u16, opcode| {
            Ok(Instruction {
                opcode,
                lhs: Some(Operand::Imm16(mmu.read16(pc.wrapping_add(1)), AddressingMode::Indirect)),
                rhs: Some(Operand::Reg16(Register::SP, AddressingMode::Direct)),
                length: 3,
                cycles: (20, None),
            })
        }));

        // stop imm8
        lut.push(define_decoder!("00010000", Opcode::Stop, |mmu: &Mmu, pc: u16, opcode| {
            Ok(Instruction {
                opcode,
                lhs: Some(Operand::Imm8(mmu.read(pc.wrapping_add(1)), AddressingMode::Direct)),
                rhs: None,
                length: 2,
                cycles: (4, None),
            })
        }));

        // rlca / rla / rrca / rra
        lut.push(define_decoder!("00000111", Opcode::Rlca, |_, _, opcode| {
            Ok(Instruction {
                opcode,
                lhs: None,
                rhs: None,
                length: 1,
                cycles: (4, None),
            })
        }));
        lut.push(define_decoder!("00010111", Opcode::Rla, |_, _, opcode| {
            Ok(Instruction {
                opcode,
                lhs: None,
                rhs: None,
                length: 1,
                cycles: (4, None),
            })
        }));
        lut.push(define_decoder!("00001111", Opcode::Rrca, |_, _, opcode| {
            Ok(Instruction {
                opcode,
                lhs: None,
                rhs: None,
                length: 1,
                cycles: (4, None),
            })
        }));
        lut.push(define_decoder!("00011111", Opcode::Rra, |_, _, opcode| {
            Ok(Instruction {
                opcode,
                lhs: None,
                rhs: None,
                length: 1,
                cycles: (4, None),
            })
        }));

        // daa / cpl / scf / ccf
        lut.push(define_decoder!("00100111", Opcode::Daa, |_, _, opcode| {
            Ok(Instruction {
                opcode,
                lhs: None,
                rhs: None,
                length: 1,
                cycles: (4, None),
            })
        }));
        lut.push(define_decoder!("00101111", Opcode::Cpl, |_, _, opcode| {
            Ok(Instruction {
                opcode,
                lhs: None,
                rhs: None,
                length: 1,
                cycles: (4, None),
            })
        }));
        lut.push(define_decoder!("00110111", Opcode::Scf, |_, _, opcode| {
            Ok(Instruction {
                opcode,
                lhs: None,
                rhs: None,
                length: 1,
                cycles: (4, None),
            })
        }));
        lut.push(define_decoder!("00111111", Opcode::Ccf, |_, _, opcode| {
            Ok(Instruction {
                opcode,
                lhs: None,
                rhs: None,
                length: 1,
                cycles: (4, None),
            })
        }));

        // halt
        lut.push(define_decoder!("01110110", Opcode::Halt, |_, _, opcode| {
            Ok(Instruction {
                opcode,
                lhs: None,
                rhs: None,
                length: 1,
                cycles: (4, None),
            })
        }));

        // add sp, imm8
        lut.push(define_decoder!("11101000", Opcode::Add, |mmu: &Mmu, pc: u16, opcode| {
            Ok(Instruction {
                opcode,
                lhs: Some(Operand::Reg16(Register::SP, AddressingMode::Direct)),
                rhs: Some(Operand::Offset(mmu.read(pc.wrapping_add(1)) as i8)),
                length: 2,
                cycles: (16, None),
            })
        }));

        // ld hl, sp+/-imm8
        lut.push(define_decoder!("11111000", Opcode::Ld, |mmu: &Mmu, pc: u16, opcode| {
            let offset = mmu.read(pc.wrapping_add(1)) as i8;

            Ok(Instruction {
                opcode,
                lhs: Some(Operand::Reg16(Register::HL, AddressingMode::Direct)),
                rhs: Some(Operand::DisplacedReg16(Register::SP, offset, AddressingMode::Direct)),
                length: 2,
                cycles: (12, None),
            })
        }));

        // ld sp, hl
        lut.push(define_decoder!("11111001", Opcode::Ld, |_, _, opcode| {
            Ok(Instruction {
                opcode,
                lhs: Some(Operand::Reg16(Register::SP, AddressingMode::Direct)),
                rhs: Some(Operand::Reg16(Register::HL, AddressingMode::Direct)),
                length: 1,
                cycles: (8, None),
            })
        }));

        // add/adc/sub/sbc/and/xor/or/cp a, imm8
        let alu_imm: [(&str, Opcode); 8] = [
            ("11000110", Opcode::Add),
            ("11001110", Opcode::Adc),
            ("11010110", Opcode::Sub),
            ("11011110", Opcode::Sbc),
            ("11100110", Opcode::And),
            ("11101110", Opcode::Xor),
            ("11110110", Opcode::Or),
            ("11111110", Opcode::Cp),
        ];
        for (pattern, opcode) in alu_imm {
            lut.push(define_decoder!(pattern, opcode, |mmu: &Mmu, pc: u16, opcode| {
                Ok(Instruction {
                    opcode,
                    lhs: Some(Operand::Reg8(Register::A, AddressingMode::Direct)),
                    rhs: Some(Operand::Imm8(mmu.read(pc.wrapping_add(1)), AddressingMode::Direct)),
                    length: 2,
                    cycles: (8, None),
                })
            }));
        }

        // ld (imm16), A
        lut.push(define_decoder!("11101010", Opcode::Ld, |mmu: &Mmu, pc: u16, opcode| {
            Ok(Instruction {
                opcode,
                lhs: Some(Operand::Imm16(mmu.read16(pc.wrapping_add(1)), AddressingMode::Indirect)),
                rhs: Some(Operand::Reg8(Register::A, AddressingMode::Direct)),
                length: 3,
                cycles: (16, None),
            })
        }));

        // ld A, (imm16)
        lut.push(define_decoder!("11111010", Opcode::Ld, |mmu: &Mmu, pc: u16, opcode| {
            Ok(Instruction {
                opcode,
                lhs: Some(Operand::Reg8(Register::A, AddressingMode::Direct)),
                rhs: Some(Operand::Imm16(mmu.read16(pc.wrapping_add(1)), AddressingMode::Indirect)),
                length: 3,
                cycles: (16, None),
            })
        }));

        // ldh (imm8), A
        lut.push(define_decoder!("11100000", Opcode::Ldh, |mmu: &Mmu, pc: u16, opcode| {
            Ok(Instruction {
                opcode,
                lhs: Some(Operand::Imm8(mmu.read(pc.wrapping_add(1)), AddressingMode::Indirect)),
                rhs: Some(Operand::Reg8(Register::A, AddressingMode::Direct)),
                length: 2,
                cycles: (12, None),
            })
        }));

        // ldh A, (imm8)
        lut.push(define_decoder!("11110000", Opcode::Ldh, |mmu: &Mmu, pc: u16, opcode| {
            Ok(Instruction {
                opcode,
                lhs: Some(Operand::Reg8(Register::A, AddressingMode::Direct)),
                rhs: Some(Operand::Imm8(mmu.read(pc.wrapping_add(1)), AddressingMode::Indirect)),
                length: 2,
                cycles: (12, None),
            })
        }));

        // ld (C), A
        lut.push(define_decoder!("11100010", Opcode::Ldh, |_, _, opcode| {
            Ok(Instruction {
                opcode,
                lhs: Some(Operand::Reg8(Register::C, AddressingMode::Indirect)),
                rhs: Some(Operand::Reg8(Register::A, AddressingMode::Direct)),
                length: 1,
                cycles: (8, None),
            })
        }));

        // ld A, (C)
        lut.push(define_decoder!("11110010", Opcode::Ldh, |_, _, opcode| {
            Ok(Instruction {
                opcode,
                lhs: Some(Operand::Reg8(Register::A, AddressingMode::Direct)),
                rhs: Some(Operand::Reg8(Register::C, AddressingMode::Indirect)),
                length: 1,
                cycles: (8, None),
            })
        }));

        // reti
        lut.push(define_decoder!("11011001", Opcode::Reti, |_, _, opcode| {
            Ok(Instruction {
                opcode,
                lhs: Some(Operand::Conditional(Condition::None)),
                rhs: None,
                length: 1,
                cycles: (16, None),
            })
        }));

        // jp hl
        lut.push(define_decoder!("11101001", Opcode::Jp, |_, _, opcode| {
            Ok(Instruction {
                opcode,
                lhs: Some(Operand::Conditional(Condition::None)),
                rhs: Some(Operand::Reg16(Register::HL, AddressingMode::Direct)),
                length: 1,
                cycles: (4, None),
            })
        }));

        // di / ei
        lut.push(define_decoder!("11110011", Opcode::Di, |_, _, opcode| {
            Ok(Instruction {
                opcode,
                lhs: None,
                rhs: None,
                length: 1,
                cycles: (4, None),
            })
        }));
        lut.push(define_decoder!("11111011", Opcode::Ei, |_, _, opcode| {
            Ok(Instruction {
                opcode,
                lhs: None,
                rhs: None,
                length: 1,
                cycles: (4, None),
            })
        }));

        // jr cond, imm8 / jr imm8
        lut.push(define_decoder!("00xxx000", Opcode::Jr, |mmu: &Mmu, pc: u16, _| {
            let opcode_byte = mmu.read(pc);
            let condition = Sm83::lookup_condition_3bits((opcode_byte & 0b0011_1000) >> 3)?;
            let offset = mmu.read(pc.wrapping_add(1)) as i8;
            let cycles = if condition != Condition::None { (12, Some(8)) } else { (12, None) };

            Ok(Instruction {
                opcode: Opcode::Jr,
                lhs: Some(Operand::Conditional(condition)),
                rhs: Some(Operand::Offset(offset)),
                length: 2,
                cycles,
            })
        }));

        // ld r16, imm16
        lut.push(define_decoder!("00xx0001", Opcode::Ld, |mmu: &Mmu, pc: u16, _| {
            let opcode_byte = mmu.read(pc);
            let destination = (opcode_byte & 0b0011_0000) >> 4;

            Ok(Instruction {
                opcode: Opcode::Ld,
                lhs: Some(Operand::Reg16(Sm83::lookup_register_16(destination)?, AddressingMode::Direct)),
                rhs: Some(Operand::Imm16(mmu.read16(pc.wrapping_add(1)), AddressingMode::Direct)),
                length: 3,
                cycles: (12, None),
            })
        }));

        // ld (r16), A  --  includes the hl+/hl- forms
        lut.push(define_decoder!("00xx0010", Opcode::Ld, |mmu: &Mmu, pc: u16, _| {
            let opcode_byte = mmu.read(pc);

            if opcode_byte == 0x22 || opcode_byte == 0x32 {
                return Ok(Instruction {
                    opcode: Opcode::Ld,
                    lhs: Some(Operand::Reg16(
                        Register::HL,
                        AddressingMode::Indirect
                            | if opcode_byte == 0x22 {
                                AddressingMode::Increment
                            } else {
                                AddressingMode::Decrement
                            },
                    )),
                    rhs: Some(Operand::Reg8(Register::A, AddressingMode::Direct)),
                    length: 1,
                    cycles: (8, None),
                });
            }

            let destination = (opcode_byte & 0b0011_0000) >> 4;
            Ok(Instruction {
                opcode: Opcode::Ld,
                lhs: Some(Operand::Reg16(Sm83::lookup_register_16(destination)?, AddressingMode::Indirect)),
                rhs: Some(Operand::Reg8(Register::A, AddressingMode::Direct)),
                length: 1,
                cycles: (8, None),
            })
        }));

        // add HL, r16
        lut.push(define_decoder!("00xx1001", Opcode::Add, |mmu: &Mmu, pc: u16, _| {
            let opcode_byte = mmu.read(pc);
            let source = (opcode_byte & 0b0011_0000) >> 4;

            Ok(Instruction {
                opcode: Opcode::Add,
                lhs: Some(Operand::Reg16(Register::HL, AddressingMode::Direct)),
                rhs: Some(Operand::Reg16(Sm83::lookup_register_16(source)?, AddressingMode::Direct)),
                length: 1,
                cycles: (8, None),
            })
        }));

        // ld A, (r16)  --  includes the hl+/hl- forms
        lut.push(define_decoder!("00xx1010", Opcode::Ld, |mmu: &Mmu, pc: u16, _| {
            let opcode_byte = mmu.read(pc);
            if opcode_byte == 0x2a || opcode_byte == 0x3a {
                return Ok(Instruction {
                    opcode: Opcode::Ld,
                    lhs: Some(Operand::Reg8(Register::A, AddressingMode::Direct)),
                    rhs: Some(Operand::Reg16(
                        Register::HL,
                        AddressingMode::Indirect
                            | if opcode_byte == 0x2a {
                                AddressingMode::Increment
                            } else {
                                AddressingMode::Decrement
                            },
                    )),
                    length: 1,
                    cycles: (8, None),
                });
            }

            let source = (opcode_byte & 0b0011_0000) >> 4;
            Ok(Instruction {
                opcode: Opcode::Ld,
                lhs: Some(Operand::Reg8(Register::A, AddressingMode::Direct)),
                rhs: Some(Operand::Reg16(Sm83::lookup_register_16(source)?, AddressingMode::Indirect)),
                length: 1,
                cycles: (8, None),
            })
        }));

        // ld r8, imm8 / ld (HL), imm8
        lut.push(define_decoder!("00xxx110", Opcode::Ld, |mmu: &Mmu, pc: u16, _| {
            let opcode_byte = mmu.read(pc);
            let destination = (opcode_byte & 0b0011_1000) >> 3;
            let (lhs, cycles) = Sm83::decode_8bit_operand(destination, 8, 12)?;

            Ok(Instruction {
                opcode: Opcode::Ld,
                lhs: Some(lhs),
                rhs: Some(Operand::Imm8(mmu.read(pc.wrapping_add(1)), AddressingMode::Direct)),
                length: 2,
                cycles: (cycles, None),
            })
        }));

        // inc r16 / dec r16
        lut.push(define_decoder!("00xx0011", Opcode::Inc, |mmu: &Mmu, pc: u16, opcode| {
            let opcode_byte = mmu.read(pc);
            let destination = (opcode_byte & 0b0011_0000) >> 4;

            Ok(Instruction {
                opcode,
                lhs: Some(Operand::Reg16(Sm83::lookup_register_16(destination)?, AddressingMode::Direct)),
                rhs: None,
                length: 1,
                cycles: (8, None),
            })
        }));
        lut.push(define_decoder!("00xx1011", Opcode::Dec, |mmu: &Mmu, pc: u16, opcode| {
            let opcode_byte = mmu.read(pc);
            let destination = (opcode_byte & 0b0011_0000) >> 4;

            Ok(Instruction {
                opcode,
                lhs: Some(Operand::Reg16(Sm83::lookup_register_16(destination)?, AddressingMode::Direct)),
                rhs: None,
                length: 1,
                cycles: (8, None),
            })
        }));

        // inc r8 / inc (HL), dec r8 / dec (HL)
        lut.push(define_decoder!("00xxx100", Opcode::Inc, |mmu: &Mmu, pc: u16, opcode| {
            let opcode_byte = mmu.read(pc);
            let destination = (opcode_byte & 0b0011_1000) >> 3;
            let (lhs, cycles) = Sm83::decode_8bit_operand(destination, 4, 12)?;

            Ok(Instruction {
                opcode,
                lhs: Some(lhs),
                rhs: None,
                length: 1,
                cycles: (cycles, None),
            })
        }));
        lut.push(define_decoder!("00xxx101", Opcode::Dec, |mmu: &Mmu, pc: u16, opcode| {
            let opcode_byte = mmu.read(pc);
            let destination = (opcode_byte & 0b0011_1000) >> 3;
            let (lhs, cycles) = Sm83::decode_8bit_operand(destination, 4, 12)?;

            Ok(Instruction {
                opcode,
                lhs: Some(lhs),
                rhs: None,
                length: 1,
                cycles: (cycles, None),
            })
        }));

        // ld r8, r8 / ld r8, (HL) / ld (HL), r8
        lut.push(define_decoder!("01xxxxxx", Opcode::Ld, |mmu: &Mmu, pc: u16, _| {
            let opcode_byte = mmu.read(pc);

            let destination = (opcode_byte & 0b0011_1000) >> 3;
            let source = opcode_byte & 0b0000_0111;

            let (lhs, cycles1) = Sm83::decode_8bit_operand(destination, 4, 8)?;
            let (rhs, cycles2) = Sm83::decode_8bit_operand(source, 4, 8)?;

            Ok(Instruction {
                opcode: Opcode::Ld,
                lhs: Some(lhs),
                rhs: Some(rhs),
                length: 1,
                cycles: (std::cmp::max(cycles1, cycles2), None),
            })
        }));

        // pop r16
        lut.push(define_decoder!("11xx0001", Opcode::Pop, |mmu: &Mmu, pc: u16, opcode| {
            let opcode_byte = mmu.read(pc);
            let destination = (opcode_byte & 0b0011_0000) >> 4;
            let mut lhs = Sm83::lookup_register_16(destination)?;

            // The register pattern for SP is 11,
            // but it's actually AF in the case of pop instruction
            if lhs == Register::SP {
                lhs = Register::AF;
            }

            Ok(Instruction {
                opcode,
                lhs: Some(Operand::Reg16(lhs, AddressingMode::Direct)),
                rhs: None,
                length: 1,
                cycles: (12, None),
            })
        }));

        // push r16
        lut.push(define_decoder!("11xx0101", Opcode::Push, |mmu: &Mmu, pc: u16, opcode| {
            let opcode_byte = mmu.read(pc);
            let source = (opcode_byte & 0b0011_0000) >> 4;
            let mut lhs = Sm83::lookup_register_16(source)?;

            // The register pattern for SP is 11,
            // but it's actually AF in the case of push instruction
            if lhs == Register::SP {
                lhs = Register::AF;
            }

            Ok(Instruction {
                opcode,
                lhs: Some(Operand::Reg16(lhs, AddressingMode::Direct)),
                rhs: None,
                length: 1,
                cycles: (16, None),
            })
        }));

        // ret cond / ret
        lut.push(define_decoder!("110xx00x", Opcode::Ret, |mmu: &Mmu, pc: u16, opcode| {
            let opcode_byte = mmu.read(pc);

            if (opcode_byte & 0b0000_0001) != 0 {
                return Ok(Instruction {
                    opcode,
                    lhs: Some(Operand::Conditional(Condition::None)),
                    rhs: None,
                    length: 1,
                    cycles: (16, None),
                });
            }

            let condition = Sm83::lookup_condition_2bits((opcode_byte & 0b0001_1000) >> 3)?;
            Ok(Instruction {
                opcode,
                lhs: Some(Operand::Conditional(condition)),
                rhs: None,
                length: 1,
                cycles: (20, Some(8)),
            })
        }));

        // jp cond, imm16 / jp imm16
        lut.push(define_decoder!("110xx01x", Opcode::Jp, |mmu: &Mmu, pc: u16, opcode| {
            let opcode_byte = mmu.read(pc);

            let condition = if (opcode_byte & 0b0000_0001) == 0 {
                Sm83::lookup_condition_2bits((opcode_byte & 0b0001_1000) >> 3)?
            } else {
                Condition::None
            };

            let cycles = if condition != Condition::None { (16, Some(12)) } else { (16, None) };

            Ok(Instruction {
                opcode,
                lhs: Some(Operand::Conditional(condition)),
                rhs: Some(Operand::Imm16(mmu.read16(pc.wrapping_add(1)), AddressingMode::Direct)),
                length: 3,
                cycles,
            })
        }));

        // call cond, imm16 / call imm16
        lut.push(define_decoder!("110xx10x", Opcode::Call, |mmu: &Mmu, pc: u16, opcode| {
            let opcode_byte = mmu.read(pc);

            let condition = if (opcode_byte & 0b0000_0001) == 0 {
                Sm83::lookup_condition_2bits((opcode_byte & 0b0001_1000) >> 3)?
            } else {
                Condition::None
            };

            let cycles = if condition != Condition::None { (24, Some(12)) } else { (24, None) };

            Ok(Instruction {
                opcode,
                lhs: Some(Operand::Conditional(condition)),
                rhs: Some(Operand::Imm16(mmu.read16(pc.wrapping_add(1)), AddressingMode::Direct)),
                length: 3,
                cycles,
            })
        }));

        // add/adc/sub/sbc/and/xor/or/cp a, r8 / a, (HL)
        let alu_reg: [(&str, Opcode); 8] = [
            ("10000xxx", Opcode::Add),
            ("10001xxx", Opcode::Adc),
            ("10010xxx", Opcode::Sub),
            ("10011xxx", Opcode::Sbc),
            ("10100xxx", Opcode::And),
            ("10101xxx", Opcode::Xor),
            ("10110xxx", Opcode::Or),
            ("10111xxx", Opcode::Cp),
        ];
        for (pattern, opcode) in alu_reg {
            lut.push(define_decoder!(pattern, opcode, |mmu: &Mmu, pc: u16, opcode| {
                let opcode_byte = mmu.read(pc);
                let source = opcode_byte & 0b0000_0111;
                let (rhs, cycles) = Sm83::decode_8bit_operand(source, 4, 8)?;

                Ok(Instruction {
                    opcode,
                    lhs: Some(Operand::Reg8(Register::A, AddressingMode::Direct)),
                    rhs: Some(rhs),
                    length: 1,
                    cycles: (cycles, None),
                })
            }));
        }

        // rst n
        lut.push(define_decoder!("11xxx111", Opcode::Rst, |mmu: &Mmu, pc: u16, opcode| {
            let target = (((mmu.read(pc) & 0b0011_1000) >> 3) as u16) * 0x08;

            Ok(Instruction {
                opcode,
                lhs: Some(Operand::Fixed(target)),
                rhs: None,
                length: 1,
                cycles: (16, None),
            })
        }));
    }

    fn propagate_decoders_prefixed(lut: &mut Vec<(String, Opcode, FDecode)>) {
        // rlc/rrc/rl/rr/sla/sra/swap/srl r8 / (HL)
        let rotates: [(&str, Opcode); 8] = [
            ("00000xxx", Opcode::Rlc),
            ("00001xxx", Opcode::Rrc),
            ("00010xxx", Opcode::Rl),
            ("00011xxx", Opcode::Rr),
            ("00100xxx", Opcode::Sla),
            ("00101xxx", Opcode::Sra),
            ("00110xxx", Opcode::Swap),
            ("00111xxx", Opcode::Srl),
        ];
        for (pattern, opcode) in rotates {
            lut.push(define_decoder!(pattern, opcode, |mmu: &Mmu, pc: u16, opcode| {
                let opcode_byte = mmu.read(pc.wrapping_add(1));
                let source = opcode_byte & 0b0000_0111;
                let (lhs, cycles) = Sm83::decode_8bit_operand(source, 8, 16)?;

                Ok(Instruction {
                    opcode,
                    lhs: Some(lhs),
                    rhs: None,
                    length: 2,
                    cycles: (cycles, None),
                })
            }));
        }

        // bit n, r8 / bit n, (HL)
        lut.push(define_decoder!("01xxxxxx", Opcode::Bit, |mmu: &Mmu, pc: u16, opcode| {
            let opcode_byte = mmu.read(pc.wrapping_add(1));
            let bit = (opcode_byte & 0b0011_1000) >> 3;
            let source = opcode_byte & 0b0000_0111;
            let (rhs, cycles) = Sm83::decode_8bit_operand(source, 8, 12)?;

            Ok(Instruction {
                opcode,
                lhs: Some(Operand::Bit(bit)),
                rhs: Some(rhs),
                length: 2,
                cycles: (cycles, None),
            })
        }));

        // res n, r8 / res n, (HL)
        lut.push(define_decoder!("10xxxxxx", Opcode::Res, |mmu: &Mmu, pc: u16, opcode| {
            let opcode_byte = mmu.read(pc.wrapping_add(1));
            let bit = (opcode_byte & 0b0011_1000) >> 3;
            let source = opcode_byte & 0b0000_0111;
            let (rhs, cycles) = Sm83::decode_8bit_operand(source, 8, 16)?;

            Ok(Instruction {
                opcode,
                lhs: Some(Operand::Bit(bit)),
                rhs: Some(rhs),
                length: 2,
                cycles: (cycles, None),
            })
        }));

        // set n, r8 / set n, (HL)
        lut.push(define_decoder!("11xxxxxx", Opcode::Set, |mmu: &Mmu, pc: u16, opcode| {
            let opcode_byte = mmu.read(pc.wrapping_add(1));
            let bit = (opcode_byte & 0b0011_1000) >> 3;
            let source = opcode_byte & 0b0000_0111;
            let (rhs, cycles) = Sm83::decode_8bit_operand(source, 8, 16)?;

            Ok(Instruction {
                opcode,
                lhs: Some(Operand::Bit(bit)),
                rhs: Some(rhs),
                length: 2,
                cycles: (cycles, None),
            })
        }));
    }
}

impl std::fmt::Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let mut output = format!("{:?}", self.opcode).to_lowercase();

        let mut ignore_destination = false;
        if let Some(destination) = &self.lhs {
            match destination {
                Operand::Conditional(cond) if *cond == Condition::None => ignore_destination = true,
                _ => output.push_str(&format!(" {}", destination)),
            };
        }

        if let Some(source) = &self.rhs {
            if !ignore_destination {
                output.push_str(&format!(", {}", source));
            } else {
                output.push_str(&format!(" {}", source));
            }
        }

        write!(f, "{}", output)
    }
}

impl std::fmt::Display for Register {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let output = match self {
            Register::A => "a",
            Register::B => "b",
            Register::C => "c",
            Register::D => "d",
            Register::E => "e",
            Register::H => "h",
            Register::L => "l",
            Register::F => "f",
            Register::AF => "af",
            Register::BC => "bc",
            Register::DE => "de",
            Register::HL => "hl",
            Register::SP => "sp",
            Register::PC => "pc",
        };

        write!(f, "{}", output)
    }
}

impl std::fmt::Display for Operand {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let output = match self {
            Operand::Reg8(reg, mode) => {
                if mode.contains(AddressingMode::Indirect) {
                    format!("({})", reg)
                } else {
                    format!("{}", reg)
                }
            }
            Operand::Reg16(reg, mode) => {
                if mode.contains(AddressingMode::Indirect) {
                    if mode.contains(AddressingMode::Increment) {
                        format!("({}+)", reg)
                    } else if mode.contains(AddressingMode::Decrement) {
                        format!("({}-)", reg)
                    } else {
                        format!("({})", reg)
                    }
                } else {
                    format!("{}", reg)
                }
            }
            Operand::Imm8(value, mode) => {
                if mode.contains(AddressingMode::Indirect) {
                    format!("({:#02x})", value)
                } else {
                    format!("{:#02x}", value)
                }
            }
            Operand::Imm16(value, mode) => {
                if mode.contains(AddressingMode::Indirect) {
                    format!("({:#04x})", value)
                } else {
                    format!("{:#04x}", value)
                }
            }
            Operand::Conditional(cond) => {
                if *cond != Condition::None {
                    format!("{}", cond)
                } else {
                    String::new()
                }
            }
            Operand::Offset(value) => {
                if *value > 0 {
                    format!("+{}", value)
                } else {
                    format!("{}", value)
                }
            }
            Operand::Bit(value) => format!("{}", value),
            Operand::Fixed(value) => format!("{:#04x}", value),
            Operand::DisplacedReg16(reg, value, mode) => {
                if mode.contains(AddressingMode::Indirect) {
                    format!("({}+{:#02x})", reg, value)
                } else {
                    format!("{}+{:#02x}", reg, value)
                }
            }
        };

        write!(f, "{}", output)
    }
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let output = match self {
            Condition::None => "",
            Condition::NZ => "nz",
            Condition::NC => "nc",
            Condition::Z => "z",
            Condition::C => "c",
        };

        write!(f, "{}", output)
    }
}
