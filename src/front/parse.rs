//! The instruction parser (C2).
//!
//! Turns one textual disassembly line into an [`Instruction`], or `None` if
//! the line doesn't have the outer shape of one (blank lines, labels,
//! section headers). An unrecognized mnemonic, or a required immediate that
//! fails to parse, is a hard error: silently treating either as a no-op
//! would drop a dependency and make the taint analysis unsound.

use std::fmt::Debug;
use std::sync::OnceLock;

use derive_more::Display;
use regex::Regex;

use super::instruction::{Instruction, Opcode};
use super::register::{is_register, Register};

#[derive(Display)]
pub enum ParseError {
    #[display("at {address:#x}: unknown opcode '{mnemonic}'")]
    UnknownOpcode { address: u64, mnemonic: String },
    #[display("at {address:#x}: {context} immediate '{text}' is not a valid integer")]
    BadImmediate {
        address: u64,
        context: &'static str,
        text: String,
    },
}

impl Debug for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self}")
    }
}

impl std::error::Error for ParseError {}

fn line_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*([0-9a-fA-F]+):\s+([0-9a-fA-F]+)\s+(\w+)\s*(.*)$").unwrap()
    })
}

fn hex_substring_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[0-9a-fA-F]+").unwrap())
}

/// Decimal, `0x`-hex, or `0`-octal immediate, with an optional leading `-`.
fn parse_immediate(token: &str) -> Option<i64> {
    let token = token.trim();
    let (negative, token) = match token.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, token),
    };
    let magnitude = if let Some(hex) = token.strip_prefix("0x").or_else(|| token.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16).ok()?
    } else if token.len() > 1 && token.starts_with('0') {
        i64::from_str_radix(&token[1..], 8).ok()?
    } else {
        token.parse::<i64>().ok()?
    };
    Some(if negative { -magnitude } else { magnitude })
}

/// The first hex-looking substring of a branch/jump target operand,
/// parsed as a literal address (matching the upstream disassembler, which
/// writes resolved targets as plain hex with no `0x` prefix).
fn first_hex_target(token: &str) -> Option<u64> {
    let m = hex_substring_regex().find(token)?;
    u64::from_str_radix(m.as_str(), 16).ok()
}

/// Split the `offset(base)` operand syntax used by loads and stores.
fn split_offset_base(token: &str) -> Option<(&str, &str)> {
    let token = token.trim();
    let open = token.find('(')?;
    let (offset, rest) = token.split_at(open);
    let base = rest.strip_prefix('(')?.strip_suffix(')')?;
    Some((offset.trim(), base.trim()))
}

/// Parse one disassembly line.
pub fn parse_line(line: &str) -> Result<Option<Instruction>, ParseError> {
    let Some(caps) = line_regex().captures(line) else {
        return Ok(None);
    };
    let Ok(address) = u64::from_str_radix(&caps[1], 16) else {
        return Ok(None);
    };
    let mnemonic = &caps[3];
    let rest = caps[4].trim();
    let args: Vec<&str> = if rest.is_empty() {
        Vec::new()
    } else {
        rest.split(',').map(str::trim).collect()
    };

    let bad_imm = |context: &'static str, text: &str| ParseError::BadImmediate {
        address,
        context,
        text: text.to_string(),
    };

    let mut inst = Instruction {
        address,
        opcode: match mnemonic {
            "ld" => Opcode::Ld,
            "lw" => Opcode::Lw,
            "lh" => Opcode::Lh,
            "lb" => Opcode::Lb,
            "lbu" => Opcode::Lbu,
            "lhu" => Opcode::Lhu,
            "lwu" => Opcode::Lwu,
            "flw" => Opcode::Flw,
            "sd" => Opcode::Sd,
            "sw" => Opcode::Sw,
            "sh" => Opcode::Sh,
            "sb" => Opcode::Sb,
            "fsw" => Opcode::Fsw,
            "beq" => Opcode::Beq,
            "bne" => Opcode::Bne,
            "blt" => Opcode::Blt,
            "bge" => Opcode::Bge,
            "bltu" => Opcode::Bltu,
            "bgeu" => Opcode::Bgeu,
            "bnez" => Opcode::Bnez,
            "beqz" => Opcode::Beqz,
            "j" => Opcode::J,
            "jal" => Opcode::Jal,
            "jalr" => Opcode::Jalr,
            "csrr" => Opcode::Csrr,
            "csrw" => Opcode::Csrw,
            "csrrs" => Opcode::Csrrs,
            "csrrc" => Opcode::Csrrc,
            "li" => Opcode::Li,
            "lui" => Opcode::Lui,
            "auipc" => Opcode::Auipc,
            "addi" => Opcode::Addi,
            "slti" => Opcode::Slti,
            "sltiu" => Opcode::Sltiu,
            "xori" => Opcode::Xori,
            "ori" => Opcode::Ori,
            "andi" => Opcode::Andi,
            "slli" => Opcode::Slli,
            "srli" => Opcode::Srli,
            "srai" => Opcode::Srai,
            "add" => Opcode::Add,
            "addw" => Opcode::Addw,
            "sub" => Opcode::Sub,
            "sll" => Opcode::Sll,
            "slt" => Opcode::Slt,
            "sltu" => Opcode::Sltu,
            "xor" => Opcode::Xor,
            "srl" => Opcode::Srl,
            "sra" => Opcode::Sra,
            "or" => Opcode::Or,
            "and" => Opcode::And,
            "fadd" => Opcode::Fadd,
            "fsub" => Opcode::Fsub,
            "fmul" => Opcode::Fmul,
            "fdiv" => Opcode::Fdiv,
            "flt" => Opcode::Flt,
            "mv" => Opcode::Mv,
            "fmv" => Opcode::Fmv,
            "sext" => Opcode::Sext,
            "ret" => Opcode::Ret,
            other => {
                return Err(ParseError::UnknownOpcode {
                    address,
                    mnemonic: other.to_string(),
                })
            }
        },
        rd: None,
        rs1: None,
        rs2: None,
        imm: None,
        csr: None,
    };

    match inst.opcode {
        Opcode::Ld | Opcode::Lw | Opcode::Lh | Opcode::Lb | Opcode::Lbu | Opcode::Lhu
        | Opcode::Lwu | Opcode::Flw => {
            inst.rd = Register::parse(args[0]);
            let (offset, base) = split_offset_base(args[1]).unwrap_or(("0", args[1]));
            inst.imm = Some(if offset.is_empty() {
                0
            } else {
                parse_immediate(offset).ok_or_else(|| bad_imm("load offset", offset))?
            });
            inst.rs1 = Register::parse(base);
        }
        Opcode::Sd | Opcode::Sw | Opcode::Sh | Opcode::Sb | Opcode::Fsw => {
            inst.rs2 = Register::parse(args[0]);
            let (offset, base) = split_offset_base(args[1]).unwrap_or(("0", args[1]));
            inst.imm = Some(if offset.is_empty() {
                0
            } else {
                parse_immediate(offset).ok_or_else(|| bad_imm("store offset", offset))?
            });
            inst.rs1 = Register::parse(base);
        }
        Opcode::Beq | Opcode::Bne | Opcode::Blt | Opcode::Bge | Opcode::Bltu | Opcode::Bgeu => {
            inst.rs1 = Register::parse(args[0]);
            inst.rs2 = Register::parse(args[1]);
            inst.imm = first_hex_target(args[2]).map(|t| t as i64);
        }
        Opcode::Bnez | Opcode::Beqz => {
            inst.rs1 = Register::parse(args[0]);
            inst.imm = first_hex_target(args[1]).map(|t| t as i64);
        }
        Opcode::J => {
            inst.imm = first_hex_target(args[args.len() - 1]).map(|t| t as i64);
        }
        Opcode::Jal => {
            inst.rd = Register::parse(args[0]);
            inst.imm = first_hex_target(args[args.len() - 1]).map(|t| t as i64);
        }
        Opcode::Jalr => {
            inst.rd = Register::parse(args[0]);
            let base = split_offset_base(args[1]).map(|(_, base)| base).unwrap_or(args[1]);
            inst.rs1 = Register::parse(base);
        }
        Opcode::Csrr => {
            inst.rd = Register::parse(args[0]);
            let text = args[1];
            inst.csr = Some(text.to_string());
            inst.imm = parse_immediate(text);
        }
        Opcode::Csrw => {
            // Upstream writes `csrw <csr>, <rs1>`; the CSR token lands in
            // args[0]. The true source register in args[1] does not parse
            // as an integer, so `imm` stays `None` here — a loss shared
            // with the original analyzer (see the instruction docs).
            inst.csr = Some(args[0].to_string());
        }
        Opcode::Csrrs | Opcode::Csrrc => {
            inst.rd = Register::parse(args[0]);
            inst.csr = Some(args[1].to_string());
        }
        Opcode::Li | Opcode::Lui | Opcode::Auipc => {
            inst.rd = Register::parse(args[0]);
            inst.imm = Some(parse_immediate(args[1]).ok_or_else(|| bad_imm("immediate", args[1]))?);
        }
        Opcode::Addi | Opcode::Slti | Opcode::Sltiu | Opcode::Xori | Opcode::Ori | Opcode::Andi
        | Opcode::Slli | Opcode::Srli | Opcode::Srai => {
            inst.rd = Register::parse(args[0]);
            inst.rs1 = Register::parse(args[1]);
            inst.imm = Some(parse_immediate(args[2]).ok_or_else(|| bad_imm("immediate", args[2]))?);
        }
        Opcode::Add | Opcode::Addw | Opcode::Sub | Opcode::Sll | Opcode::Slt | Opcode::Sltu
        | Opcode::Xor | Opcode::Srl | Opcode::Sra | Opcode::Or | Opcode::And | Opcode::Fadd
        | Opcode::Fsub | Opcode::Fmul | Opcode::Fdiv | Opcode::Flt => {
            inst.rd = Register::parse(args[0]);
            inst.rs1 = Register::parse(args[1]);
            if is_register(args[2]) {
                inst.rs2 = Register::parse(args[2]);
            } else {
                inst.imm = Some(parse_immediate(args[2]).ok_or_else(|| bad_imm("immediate", args[2]))?);
            }
        }
        Opcode::Mv | Opcode::Fmv | Opcode::Sext => {
            inst.rd = Register::parse(args[0]);
            inst.rs1 = Register::parse(args[1]);
            inst.imm = Some(0);
        }
        Opcode::Ret => {
            inst.rd = Register::parse("zero");
        }
    }

    Ok(Some(inst))
}

/// Parse every line of a listing, dropping lines that don't look like
/// instructions and stopping at the first unrecognized mnemonic or
/// unparsable required immediate.
///
/// When `verbose`, prints a diagnostic to stderr for every line that isn't
/// an instruction (blank lines, labels, section headers) and for every one
/// that is (the decoded address and opcode).
pub fn parse_listing(text: &str, verbose: bool) -> Result<Vec<Instruction>, ParseError> {
    let mut instructions = Vec::new();
    for line in text.lines() {
        match parse_line(line)? {
            Some(inst) => {
                if verbose {
                    eprintln!("parse: {:#x} {}", inst.address, inst.opcode);
                }
                instructions.push(inst);
            }
            None if verbose && !line.trim().is_empty() => {
                eprintln!("skip: {}", line.trim());
            }
            None => {}
        }
    }
    Ok(instructions)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Instruction {
        parse_line(line).unwrap().unwrap()
    }

    #[test]
    fn skips_blank_and_label_lines() {
        assert!(parse_line("").unwrap().is_none());
        assert!(parse_line("   \n").unwrap().is_none());
        assert!(parse_line("memcpy_shm.o:     file format elf64-littleriscv").unwrap().is_none());
        assert!(parse_line("<memcpy_shm>:").unwrap().is_none());
    }

    #[test]
    fn parses_load() {
        let i = parse("    1004:\t00053503          \tld\ta0,0(a0)");
        assert_eq!(i.address, 0x1004);
        assert_eq!(i.opcode, super::Opcode::Ld);
        assert_eq!(i.rd, Some(Register::A0));
        assert_eq!(i.rs1, Some(Register::A0));
        assert_eq!(i.rs2, None);
        assert_eq!(i.imm, Some(0));
    }

    #[test]
    fn parses_store() {
        let i = parse("    1008:\t00a13023          \tsd\ta0,0(sp)");
        assert_eq!(i.opcode, super::Opcode::Sd);
        assert_eq!(i.rs2, Some(Register::A0));
        assert_eq!(i.rs1, Some(Register::Sp));
        assert_eq!(i.rd, None);
    }

    #[test]
    fn parses_branch_with_literal_target() {
        let i = parse("    100c:\t00a58663          \tbeq\ta1,a0,1018 <foo>");
        assert_eq!(i.rs1, Some(Register::A1));
        assert_eq!(i.rs2, Some(Register::A0));
        assert_eq!(i.imm, Some(0x1018));
    }

    #[test]
    fn parses_zero_compare_branch() {
        let i = parse("    1010:\tfe0518e3          \tbnez\ta0,1000 <bar>");
        assert_eq!(i.rs1, Some(Register::A0));
        assert_eq!(i.rs2, None);
        assert_eq!(i.imm, Some(0x1000));
    }

    #[test]
    fn parses_jalr_with_base_register() {
        let i = parse("    1014:\t000080e7          \tjalr\tra,0(a1)");
        assert_eq!(i.rd, Some(Register::Ra));
        assert_eq!(i.rs1, Some(Register::A1));
        assert_eq!(i.imm, None);
    }

    #[test]
    fn parses_csrrs_start_marker() {
        let i = parse("    1000:\tf8a0a573          \tcsrrs\tzero,0x802");
        assert_eq!(i.opcode, super::Opcode::Csrrs);
        assert_eq!(i.rd, Some(Register::Zero));
        assert_eq!(i.csr.as_deref(), Some("0x802"));
        assert_eq!(i.rs1, None);
    }

    #[test]
    fn parses_ambiguous_add_as_register_form() {
        let i = parse("    1018:\t00c58633          \tadd\ta2,a1,a2");
        assert_eq!(i.rs1, Some(Register::A1));
        assert_eq!(i.rs2, Some(Register::A2));
        assert_eq!(i.imm, None);
    }

    #[test]
    fn parses_ambiguous_add_as_immediate_form() {
        let i = parse("    101c:\t00458613          \tadd\ta2,a1,4");
        assert_eq!(i.rs1, Some(Register::A1));
        assert_eq!(i.rs2, None);
        assert_eq!(i.imm, Some(4));
    }

    #[test]
    fn normalizes_mv_pseudo_op() {
        let i = parse("    1020:\t00058513          \tmv\ta0,a1");
        assert_eq!(i.rd, Some(Register::A0));
        assert_eq!(i.rs1, Some(Register::A1));
        assert_eq!(i.imm, Some(0));
    }

    #[test]
    fn ret_defines_zero() {
        let i = parse("    1024:\t00008067          \tret");
        assert_eq!(i.rd, Some(Register::Zero));
    }

    #[test]
    fn unknown_mnemonic_is_fatal() {
        let err = parse_line("    1000:\tdeadbeef          \tfrobnicate\ta0,a1").unwrap_err();
        assert!(matches!(err, ParseError::UnknownOpcode { .. }));
    }

    #[test]
    fn bad_required_immediate_is_fatal() {
        let err = parse_line("    1000:\t00458613          \taddi\ta2,a1,notanumber").unwrap_err();
        assert!(matches!(err, ParseError::BadImmediate { .. }));
    }

    #[test]
    fn accepts_hex_octal_and_decimal_immediates() {
        assert_eq!(parse_immediate("0x10"), Some(16));
        assert_eq!(parse_immediate("010"), Some(8));
        assert_eq!(parse_immediate("10"), Some(10));
        assert_eq!(parse_immediate("-4"), Some(-4));
    }
}
