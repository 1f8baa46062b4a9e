//! The typed instruction record (C2 data model).

use derive_more::Display;

use super::register::Register;

/// Canonical mnemonic of a decoded instruction.
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq, Hash)]
#[allow(missing_docs)]
pub enum Opcode {
    #[display("ld")]
    Ld,
    #[display("lw")]
    Lw,
    #[display("lh")]
    Lh,
    #[display("lb")]
    Lb,
    #[display("lbu")]
    Lbu,
    #[display("lhu")]
    Lhu,
    #[display("lwu")]
    Lwu,
    #[display("flw")]
    Flw,
    #[display("sd")]
    Sd,
    #[display("sw")]
    Sw,
    #[display("sh")]
    Sh,
    #[display("sb")]
    Sb,
    #[display("fsw")]
    Fsw,
    #[display("beq")]
    Beq,
    #[display("bne")]
    Bne,
    #[display("blt")]
    Blt,
    #[display("bge")]
    Bge,
    #[display("bltu")]
    Bltu,
    #[display("bgeu")]
    Bgeu,
    #[display("bnez")]
    Bnez,
    #[display("beqz")]
    Beqz,
    #[display("j")]
    J,
    #[display("jal")]
    Jal,
    #[display("jalr")]
    Jalr,
    #[display("csrr")]
    Csrr,
    #[display("csrw")]
    Csrw,
    #[display("csrrs")]
    Csrrs,
    #[display("csrrc")]
    Csrrc,
    #[display("li")]
    Li,
    #[display("lui")]
    Lui,
    #[display("auipc")]
    Auipc,
    #[display("addi")]
    Addi,
    #[display("slti")]
    Slti,
    #[display("sltiu")]
    Sltiu,
    #[display("xori")]
    Xori,
    #[display("ori")]
    Ori,
    #[display("andi")]
    Andi,
    #[display("slli")]
    Slli,
    #[display("srli")]
    Srli,
    #[display("srai")]
    Srai,
    #[display("add")]
    Add,
    #[display("addw")]
    Addw,
    #[display("sub")]
    Sub,
    #[display("sll")]
    Sll,
    #[display("slt")]
    Slt,
    #[display("sltu")]
    Sltu,
    #[display("xor")]
    Xor,
    #[display("srl")]
    Srl,
    #[display("sra")]
    Sra,
    #[display("or")]
    Or,
    #[display("and")]
    And,
    #[display("fadd")]
    Fadd,
    #[display("fsub")]
    Fsub,
    #[display("fmul")]
    Fmul,
    #[display("fdiv")]
    Fdiv,
    #[display("flt")]
    Flt,
    #[display("mv")]
    Mv,
    #[display("fmv")]
    Fmv,
    #[display("sext")]
    Sext,
    #[display("ret")]
    Ret,
}

impl Opcode {
    pub fn is_load(self) -> bool {
        use Opcode::*;
        matches!(self, Ld | Lw | Lh | Lb | Lbu | Lhu | Lwu | Flw)
    }

    pub fn is_store(self) -> bool {
        use Opcode::*;
        matches!(self, Sd | Sw | Sh | Sb | Fsw)
    }

    pub fn is_branch(self) -> bool {
        use Opcode::*;
        matches!(self, Beq | Bne | Blt | Bge | Bltu | Bgeu | Bnez | Beqz)
    }

    pub fn is_jump(self) -> bool {
        use Opcode::*;
        matches!(self, J | Jal | Jalr)
    }
}

/// A decoded disassembly line.
///
/// `csr` carries the literal CSR-number token for `csrr`/`csrw`/`csrrs`/
/// `csrrc` (as written, e.g. `"0x802"`). It is a raw token rather than a
/// [`Register`] because — for `csrrs`/`csrrc` in particular — that is
/// exactly what the upstream disassembly puts in that operand slot, and the
/// snippet markers match against it as literal text (see the distilled
/// spec's Open Questions on the CSR-operand quirk). `imm` additionally holds
/// the same number as a parsed integer wherever the quirk still lets that
/// parse succeed (always for `csrr`, never for `csrw`/`csrrs`/`csrrc`, whose
/// true general-register operand ends up unparsed instead — a loss the
/// original analyzer shares and this one preserves).
#[derive(Clone, Debug)]
pub struct Instruction {
    pub address: u64,
    pub opcode: Opcode,
    pub rd: Option<Register>,
    pub rs1: Option<Register>,
    pub rs2: Option<Register>,
    pub imm: Option<i64>,
    pub csr: Option<String>,
}

impl Instruction {
    pub fn is_load(&self) -> bool {
        self.opcode.is_load()
    }

    pub fn is_store(&self) -> bool {
        self.opcode.is_store()
    }

    pub fn is_branch(&self) -> bool {
        self.opcode.is_branch()
    }

    pub fn is_jump(&self) -> bool {
        self.opcode.is_jump()
    }

    /// The literal target address of a branch or jump, if this instruction
    /// is one and its target was written as a resolvable literal (as
    /// opposed to, say, an indirect `jalr` with no immediate).
    pub fn literal_target(&self) -> Option<u64> {
        if self.is_branch() || self.is_jump() {
            self.imm.map(|t| t as u64)
        } else {
            None
        }
    }

    /// The register operands whose speculative values this instruction, if
    /// it is a transmitter, would leak: the address register for a load or
    /// store, the compared pair for a branch.
    pub fn leaked_operands(&self) -> crate::common::Set<Register> {
        let mut set = crate::common::Set::new();
        if self.is_load() || self.is_store() {
            if let Some(r) = self.rs1 {
                set.insert(r);
            }
        } else if self.is_branch() {
            if let Some(r) = self.rs1 {
                set.insert(r);
            }
            if let Some(r) = self.rs2 {
                set.insert(r);
            }
        }
        set
    }

    pub fn operand_text(&self) -> String {
        let mut parts = Vec::new();
        if let Some(rd) = self.rd {
            parts.push(rd.to_string());
        }
        if let Some(rs1) = self.rs1 {
            parts.push(rs1.to_string());
        }
        if let Some(rs2) = self.rs2 {
            parts.push(rs2.to_string());
        }
        if let Some(csr) = &self.csr {
            parts.push(csr.clone());
        }
        if let Some(imm) = self.imm {
            parts.push(imm.to_string());
        }
        parts.join(", ")
    }
}
