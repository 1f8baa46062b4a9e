//! The snippet locator and self-containment checker (C3).

use crate::front::{Instruction, Opcode};

/// CSR number that delimits the snippet under analysis.
const SNIPPET_CSR: &str = "0x802";

/// The address range of the located snippet, inclusive on both ends.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Bounds {
    pub start: u64,
    pub end: u64,
}

/// A branch or jump that breaks self-containment: its address and, when
/// resolvable, the target it escapes to. `target` is `None` for an
/// indirect jump with no literal immediate — treated as an escape rather
/// than silently passing, per the strict reimplementation decision in
/// SPEC_FULL.md §4.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Escape {
    pub at: u64,
    pub target: Option<u64>,
}

/// What running the whole analyzer on a listing produced.
#[derive(Debug)]
pub enum Outcome {
    MissingMarkers,
    NotSelfContained(Escape),
    Report(crate::back::report::Report),
}

/// Find the snippet's start (`csrrs <reg>, 0x802`) and end
/// (`csrrc <reg>, 0x802`, at or after the start) markers.
pub fn locate(instructions: &[Instruction]) -> Option<Bounds> {
    let start = instructions
        .iter()
        .find(|inst| inst.opcode == Opcode::Csrrs && inst.csr.as_deref() == Some(SNIPPET_CSR))?
        .address;
    let end = instructions
        .iter()
        .find(|inst| {
            inst.address >= start
                && inst.opcode == Opcode::Csrrc
                && inst.csr.as_deref() == Some(SNIPPET_CSR)
        })?
        .address;
    Some(Bounds { start, end })
}

/// Walk every instruction inside `[bounds.start, bounds.end]` and confirm
/// every branch/jump with a literal target stays inside the window.
pub fn check_self_contained(instructions: &[Instruction], bounds: Bounds) -> Result<(), Escape> {
    for inst in instructions {
        if inst.address < bounds.start || inst.address > bounds.end {
            continue;
        }
        if !(inst.is_branch() || inst.is_jump()) {
            continue;
        }
        match inst.literal_target() {
            Some(target) if target >= bounds.start && target <= bounds.end => {}
            Some(target) => {
                return Err(Escape {
                    at: inst.address,
                    target: Some(target),
                })
            }
            None => {
                return Err(Escape {
                    at: inst.address,
                    target: None,
                })
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::front::parse::parse_listing;

    #[test]
    fn locates_markers() {
        let listing = "\
            1000:\t00000000\tcsrrs\tzero,0x802\n\
            1004:\t00053503\tld\ta0,0(a0)\n\
            1008:\t00000000\tcsrrc\tzero,0x802\n";
        let instructions = parse_listing(listing, false).unwrap();
        assert_eq!(locate(&instructions), Some(Bounds { start: 0x1000, end: 0x1008 }));
    }

    #[test]
    fn missing_end_marker_returns_none() {
        let listing = "1000:\t00000000\tcsrrs\tzero,0x802\n";
        let instructions = parse_listing(listing, false).unwrap();
        assert_eq!(locate(&instructions), None);
    }

    #[test]
    fn branch_outside_window_is_not_self_contained() {
        let listing = "\
            1000:\t00000000\tcsrrs\tzero,0x802\n\
            1004:\t00a58663\tbeq\ta1,a0,2000\n\
            1008:\t00000000\tcsrrc\tzero,0x802\n";
        let instructions = parse_listing(listing, false).unwrap();
        let bounds = locate(&instructions).unwrap();
        let err = check_self_contained(&instructions, bounds).unwrap_err();
        assert_eq!(err.at, 0x1004);
        assert_eq!(err.target, Some(0x2000));
    }

    #[test]
    fn branch_inside_window_is_self_contained() {
        let listing = "\
            1000:\t00000000\tcsrrs\tzero,0x802\n\
            1004:\t00a58663\tbeq\ta1,a0,1000\n\
            1008:\t00000000\tcsrrc\tzero,0x802\n";
        let instructions = parse_listing(listing, false).unwrap();
        let bounds = locate(&instructions).unwrap();
        assert!(check_self_contained(&instructions, bounds).is_ok());
    }

    #[test]
    fn unresolved_indirect_jump_is_treated_as_an_escape() {
        let listing = "\
            1000:\t00000000\tcsrrs\tzero,0x802\n\
            1004:\t000080e7\tjalr\tra,0(a1)\n\
            1008:\t00000000\tcsrrc\tzero,0x802\n";
        let instructions = parse_listing(listing, false).unwrap();
        let bounds = locate(&instructions).unwrap();
        let err = check_self_contained(&instructions, bounds).unwrap_err();
        assert_eq!(err.at, 0x1004);
        assert_eq!(err.target, None);
    }
}
