//! Typed instruction representation.
//!
//! `Instr` is a tagged variant over RV32I instruction classes. Unlike
//! the original field-record-only decoder, this layer validates the
//! (funct3, funct7) combination against the set the ISA actually
//! defines and rejects anything else with a structured error, giving
//! the execute unit an exhaustive match with no silent default arm.

use thiserror::Error;

use crate::decode::{decode, Fields};
use crate::opcodes::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchOp {
    Beq,
    Bne,
    Blt,
    Bge,
    Bltu,
    Bgeu,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOp {
    Lb,
    Lh,
    Lw,
    Lbu,
    Lhu,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    Sb,
    Sh,
    Sw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegImmOp {
    Addi,
    Slti,
    Sltiu,
    Xori,
    Ori,
    Andi,
    Slli,
    Srli,
    Srai,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegRegOp {
    Add,
    Sub,
    Sll,
    Slt,
    Sltu,
    Xor,
    Srl,
    Sra,
    Or,
    And,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instr {
    Lui { rd: u8, imm_u: i32 },
    Auipc { rd: u8, imm_u: i32 },
    Jal { rd: u8, offset: i32 },
    Jalr { rd: u8, rs1: u8, offset: i32 },
    Branch { op: BranchOp, rs1: u8, rs2: u8, offset: i32 },
    Load { op: LoadOp, rd: u8, rs1: u8, offset: i32 },
    Store { op: StoreOp, rs1: u8, rs2: u8, offset: i32 },
    RegImm { op: RegImmOp, rd: u8, rs1: u8, imm: i32 },
    RegReg { op: RegRegOp, rd: u8, rs1: u8, rs2: u8 },
    Fence,
    Ecall,
    Ebreak,
    Csr,
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    #[error("unimplemented opcode 0b{0:07b}")]
    InvalidOpcode(u32),
    #[error("illegal funct3 0b{funct3:03b} for opcode 0b{opcode:07b}")]
    IllegalFunct3 { opcode: u32, funct3: u32 },
    #[error("illegal funct7 0b{funct7:07b} for opcode 0b{opcode:07b} funct3 0b{funct3:03b}")]
    IllegalFunct7 { opcode: u32, funct3: u32, funct7: u32 },
    #[error("illegal immediate 0x{imm:x} for system instruction")]
    IllegalSystemImmediate { imm: i32 },
}

impl Instr {
    pub fn decode(word: u32) -> Result<Self, DecodeError> {
        let f = decode(word);
        match f.opcode {
            OP_LUI => Ok(Instr::Lui { rd: f.rd, imm_u: f.imm_u }),
            OP_AUIPC => Ok(Instr::Auipc { rd: f.rd, imm_u: f.imm_u }),
            OP_JAL => Ok(Instr::Jal { rd: f.rd, offset: f.imm_j }),
            OP_JALR => {
                if f.funct3 != 0 {
                    return Err(DecodeError::IllegalFunct3 { opcode: f.opcode, funct3: f.funct3 });
                }
                Ok(Instr::Jalr { rd: f.rd, rs1: f.rs1, offset: f.imm_i })
            }
            OP_BRANCH => decode_branch(&f),
            OP_LOAD => decode_load(&f),
            OP_STORE => decode_store(&f),
            OP_IMM => decode_reg_imm(&f),
            OP_REG => decode_reg_reg(&f),
            OP_MISC_MEM => Ok(Instr::Fence),
            OP_SYSTEM => decode_system(&f),
            other => Err(DecodeError::InvalidOpcode(other)),
        }
    }
}

fn decode_branch(f: &Fields) -> Result<Instr, DecodeError> {
    let op = match f.funct3 {
        FUNCT3_BEQ => BranchOp::Beq,
        FUNCT3_BNE => BranchOp::Bne,
        FUNCT3_BLT => BranchOp::Blt,
        FUNCT3_BGE => BranchOp::Bge,
        FUNCT3_BLTU => BranchOp::Bltu,
        FUNCT3_BGEU => BranchOp::Bgeu,
        other => return Err(DecodeError::IllegalFunct3 { opcode: f.opcode, funct3: other }),
    };
    Ok(Instr::Branch { op, rs1: f.rs1, rs2: f.rs2, offset: f.imm_b })
}

fn decode_load(f: &Fields) -> Result<Instr, DecodeError> {
    let op = match f.funct3 {
        FUNCT3_LB => LoadOp::Lb,
        FUNCT3_LH => LoadOp::Lh,
        FUNCT3_LW => LoadOp::Lw,
        FUNCT3_LBU => LoadOp::Lbu,
        FUNCT3_LHU => LoadOp::Lhu,
        other => return Err(DecodeError::IllegalFunct3 { opcode: f.opcode, funct3: other }),
    };
    Ok(Instr::Load { op, rd: f.rd, rs1: f.rs1, offset: f.imm_i })
}

fn decode_store(f: &Fields) -> Result<Instr, DecodeError> {
    let op = match f.funct3 {
        FUNCT3_SB => StoreOp::Sb,
        FUNCT3_SH => StoreOp::Sh,
        FUNCT3_SW => StoreOp::Sw,
        other => return Err(DecodeError::IllegalFunct3 { opcode: f.opcode, funct3: other }),
    };
    Ok(Instr::Store { op, rs1: f.rs1, rs2: f.rs2, offset: f.imm_s })
}

fn decode_reg_imm(f: &Fields) -> Result<Instr, DecodeError> {
    let op = match f.funct3 {
        FUNCT3_ADDI => RegImmOp::Addi,
        FUNCT3_SLTI => RegImmOp::Slti,
        FUNCT3_SLTIU => RegImmOp::Sltiu,
        FUNCT3_XORI => RegImmOp::Xori,
        FUNCT3_ORI => RegImmOp::Ori,
        FUNCT3_ANDI => RegImmOp::Andi,
        FUNCT3_SLLI => {
            if f.funct7 != 0 {
                return Err(DecodeError::IllegalFunct7 { opcode: f.opcode, funct3: f.funct3, funct7: f.funct7 });
            }
            RegImmOp::Slli
        }
        FUNCT3_SRLI_SRAI => match f.funct7 {
            FUNCT7_SRL => RegImmOp::Srli,
            FUNCT7_SRA => RegImmOp::Srai,
            other => return Err(DecodeError::IllegalFunct7 { opcode: f.opcode, funct3: f.funct3, funct7: other }),
        },
        other => return Err(DecodeError::IllegalFunct3 { opcode: f.opcode, funct3: other }),
    };
    Ok(Instr::RegImm { op, rd: f.rd, rs1: f.rs1, imm: f.imm_i })
}

fn decode_reg_reg(f: &Fields) -> Result<Instr, DecodeError> {
    let op = match (f.funct3, f.funct7) {
        (FUNCT3_ADD_SUB, FUNCT7_ADD) => RegRegOp::Add,
        (FUNCT3_ADD_SUB, FUNCT7_SUB) => RegRegOp::Sub,
        (FUNCT3_SLL, 0) => RegRegOp::Sll,
        (FUNCT3_SLT, 0) => RegRegOp::Slt,
        (FUNCT3_SLTU, 0) => RegRegOp::Sltu,
        (FUNCT3_XOR, 0) => RegRegOp::Xor,
        (FUNCT3_SRL_SRA, FUNCT7_SRL) => RegRegOp::Srl,
        (FUNCT3_SRL_SRA, FUNCT7_SRA) => RegRegOp::Sra,
        (FUNCT3_OR, 0) => RegRegOp::Or,
        (FUNCT3_AND, 0) => RegRegOp::And,
        (funct3, funct7) => return Err(DecodeError::IllegalFunct7 { opcode: f.opcode, funct3, funct7 }),
    };
    Ok(Instr::RegReg { op, rd: f.rd, rs1: f.rs1, rs2: f.rs2 })
}

fn decode_system(f: &Fields) -> Result<Instr, DecodeError> {
    match f.funct3 {
        FUNCT3_ECALL_EBREAK => {}
        // CSR instructions (csrrw/csrrs/csrrc/csrrwi/csrrsi/csrrci) are
        // accepted but not acted on; see SPEC_FULL.md's open question
        // on CSR support. funct3 0b100 is reserved and not a CSR op.
        1..=3 | 5..=7 => return Ok(Instr::Csr),
        other => return Err(DecodeError::IllegalFunct3 { opcode: f.opcode, funct3: other }),
    }
    match f.imm_i {
        IMM_ECALL => Ok(Instr::Ecall),
        IMM_EBREAK => Ok(Instr::Ebreak),
        other => Err(DecodeError::IllegalSystemImmediate { imm: other }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_lui() {
        assert_eq!(Instr::decode(0x0000_10B7).unwrap(), Instr::Lui { rd: 1, imm_u: 0x1000 });
    }

    #[test]
    fn decodes_addi() {
        assert_eq!(
            Instr::decode(0xFFF0_8093).unwrap(),
            Instr::RegImm { op: RegImmOp::Addi, rd: 1, rs1: 1, imm: -1 }
        );
    }

    #[test]
    fn decodes_beq() {
        assert_eq!(
            Instr::decode(0x0020_8463).unwrap(),
            Instr::Branch { op: BranchOp::Beq, rs1: 1, rs2: 2, offset: 8 }
        );
    }

    #[test]
    fn decodes_sub_vs_add_by_funct7() {
        // add x3, x1, x2 -> 0x002080B3
        assert_eq!(
            Instr::decode(0x0020_80B3).unwrap(),
            Instr::RegReg { op: RegRegOp::Add, rd: 1, rs1: 1, rs2: 2 }
        );
        // sub x3, x1, x2 -> 0x402080B3
        assert_eq!(
            Instr::decode(0x4020_80B3).unwrap(),
            Instr::RegReg { op: RegRegOp::Sub, rd: 1, rs1: 1, rs2: 2 }
        );
    }

    #[test]
    fn rejects_illegal_funct7_combination() {
        // and x1,x1,x2 with funct7 bit set illegally (0100000 with AND funct3)
        let illegal = 0x4020_F0B3u32;
        assert!(matches!(Instr::decode(illegal), Err(DecodeError::IllegalFunct7 { .. })));
    }

    #[test]
    fn ecall_and_ebreak() {
        assert_eq!(Instr::decode(0x0000_0073).unwrap(), Instr::Ecall);
        assert_eq!(Instr::decode(0x0010_0073).unwrap(), Instr::Ebreak);
    }

    #[test]
    fn csr_funct3_values_decode_as_csr_noop() {
        // funct3 = 001 (csrrw) under SYSTEM, rest zero.
        assert_eq!(Instr::decode(0x0000_1073).unwrap(), Instr::Csr);
        // funct3 = 111 (csrrci) under SYSTEM.
        assert_eq!(Instr::decode(0x0000_7073).unwrap(), Instr::Csr);
    }

    #[test]
    fn reserved_system_funct3_is_rejected() {
        // funct3 = 100 under SYSTEM is reserved, not a defined CSR op.
        let word = 0x0000_4073u32;
        assert!(matches!(
            Instr::decode(word),
            Err(DecodeError::IllegalFunct3 { funct3: 0b100, .. })
        ));
    }

    #[test]
    fn rejects_unimplemented_opcode() {
        // 0b1111111 is not a defined RV32I opcode.
        assert!(matches!(Instr::decode(0x7F), Err(DecodeError::InvalidOpcode(_))));
    }
}
