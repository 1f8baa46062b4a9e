//! The architectural register vocabulary (C1).
//!
//! A register is identified purely by its textual ABI name as it appears in
//! the disassembly listing — `x10` and `a0` are distinct names here even
//! though a real RISC-V core would treat them as the same physical register,
//! because nothing in this analyzer ever needs to resolve that aliasing: a
//! listing is assumed to spell any one register consistently.

use derive_more::Display;

/// One of the fixed RISC-V ABI register names.
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq, Hash, PartialOrd, Ord)]
#[allow(missing_docs)]
pub enum Register {
    #[display("x0")]
    X0,
    #[display("x1")]
    X1,
    #[display("x2")]
    X2,
    #[display("x3")]
    X3,
    #[display("x4")]
    X4,
    #[display("x5")]
    X5,
    #[display("x6")]
    X6,
    #[display("x7")]
    X7,
    #[display("x8")]
    X8,
    #[display("x9")]
    X9,
    #[display("x10")]
    X10,
    #[display("x11")]
    X11,
    #[display("x12")]
    X12,
    #[display("x13")]
    X13,
    #[display("x14")]
    X14,
    #[display("x15")]
    X15,
    #[display("x16")]
    X16,
    #[display("x17")]
    X17,
    #[display("x18")]
    X18,
    #[display("x19")]
    X19,
    #[display("x20")]
    X20,
    #[display("x21")]
    X21,
    #[display("x22")]
    X22,
    #[display("x23")]
    X23,
    #[display("x24")]
    X24,
    #[display("x25")]
    X25,
    #[display("x26")]
    X26,
    #[display("x27")]
    X27,
    #[display("x28")]
    X28,
    #[display("x29")]
    X29,
    #[display("x30")]
    X30,
    #[display("x31")]
    X31,
    #[display("a0")]
    A0,
    #[display("a1")]
    A1,
    #[display("a2")]
    A2,
    #[display("a3")]
    A3,
    #[display("a4")]
    A4,
    #[display("a5")]
    A5,
    #[display("a6")]
    A6,
    #[display("a7")]
    A7,
    #[display("s0")]
    S0,
    #[display("s1")]
    S1,
    #[display("s2")]
    S2,
    #[display("s3")]
    S3,
    #[display("s4")]
    S4,
    #[display("s5")]
    S5,
    #[display("s6")]
    S6,
    #[display("s7")]
    S7,
    #[display("s8")]
    S8,
    #[display("s9")]
    S9,
    #[display("s10")]
    S10,
    #[display("s11")]
    S11,
    #[display("t0")]
    T0,
    #[display("t1")]
    T1,
    #[display("t2")]
    T2,
    #[display("t3")]
    T3,
    #[display("t4")]
    T4,
    #[display("t5")]
    T5,
    #[display("t6")]
    T6,
    #[display("zero")]
    Zero,
    #[display("ra")]
    Ra,
    #[display("sp")]
    Sp,
    #[display("gp")]
    Gp,
    #[display("tp")]
    Tp,
    #[display("fp")]
    Fp,
}

impl Register {
    /// Parse a trimmed, comma-stripped operand token into a register name,
    /// or `None` if it names no register in the fixed ABI set.
    pub fn parse(token: &str) -> Option<Register> {
        use Register::*;
        let cleaned = token.trim().trim_end_matches(',');
        Some(match cleaned {
            "x0" => X0,
            "x1" => X1,
            "x2" => X2,
            "x3" => X3,
            "x4" => X4,
            "x5" => X5,
            "x6" => X6,
            "x7" => X7,
            "x8" => X8,
            "x9" => X9,
            "x10" => X10,
            "x11" => X11,
            "x12" => X12,
            "x13" => X13,
            "x14" => X14,
            "x15" => X15,
            "x16" => X16,
            "x17" => X17,
            "x18" => X18,
            "x19" => X19,
            "x20" => X20,
            "x21" => X21,
            "x22" => X22,
            "x23" => X23,
            "x24" => X24,
            "x25" => X25,
            "x26" => X26,
            "x27" => X27,
            "x28" => X28,
            "x29" => X29,
            "x30" => X30,
            "x31" => X31,
            "a0" => A0,
            "a1" => A1,
            "a2" => A2,
            "a3" => A3,
            "a4" => A4,
            "a5" => A5,
            "a6" => A6,
            "a7" => A7,
            "s0" => S0,
            "s1" => S1,
            "s2" => S2,
            "s3" => S3,
            "s4" => S4,
            "s5" => S5,
            "s6" => S6,
            "s7" => S7,
            "s8" => S8,
            "s9" => S9,
            "s10" => S10,
            "s11" => S11,
            "t0" => T0,
            "t1" => T1,
            "t2" => T2,
            "t3" => T3,
            "t4" => T4,
            "t5" => T5,
            "t6" => T6,
            "zero" => Zero,
            "ra" => Ra,
            "sp" => Sp,
            "gp" => Gp,
            "tp" => Tp,
            "fp" => Fp,
            _ => return None,
        })
    }
}

/// Does the trimmed, comma-stripped token name a register in the fixed ABI
/// set? Used by the add-class operand dispatch to distinguish a register
/// operand from an assembler-folded immediate.
pub fn is_register(token: &str) -> bool {
    Register::parse(token).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_plain_names() {
        assert!(is_register("a0"));
        assert!(is_register("sp"));
        assert!(is_register("x31"));
        assert!(is_register("t6"));
    }

    #[test]
    fn strips_whitespace_and_trailing_comma() {
        assert_eq!(Register::parse(" a0, "), Some(Register::A0));
        assert_eq!(Register::parse("sp,"), Some(Register::Sp));
    }

    #[test]
    fn rejects_non_registers() {
        assert!(!is_register("0x10"));
        assert!(!is_register("label"));
        assert!(!is_register(""));
    }

    #[test]
    fn display_round_trips_through_parse() {
        for r in [Register::A0, Register::Sp, Register::T6, Register::X17] {
            assert_eq!(Register::parse(&r.to_string()), Some(r));
        }
    }
}
