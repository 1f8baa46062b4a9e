//! The backward taint engine (C5).
//!
//! For each transmitter, a worklist of [`BackwardState`] frontiers walks the
//! control-flow graph backward from the transmitter toward the snippet
//! entry, tracking the set of initial registers (`dep_reg`) that still
//! influence the transmitter's leaked operand. Loop closure — revisiting an
//! instruction with a `dep_reg` already seen on this path — is the sole
//! termination mechanism, which is why `dep_reg` is carried as a value
//! comparable by structural equality rather than threaded through shared
//! mutable state.

use crate::common::Set;
use crate::front::{Opcode, Register};
use crate::middle::{Bounds, Cfg};
use crate::Fatal;

/// One completed backward walk: the registers whose initial values the
/// transmitter depends on along this path, and the path itself — from the
/// snippet entry (first element) to the transmitter (last element).
#[derive(Clone, Debug)]
pub struct Finding {
    pub dep_reg: Set<Register>,
    pub path: Vec<usize>,
}

/// One frontier of the backward search. Short-lived: cloned on branching,
/// discarded once popped and processed.
struct BackwardState {
    current: usize,
    /// Suppresses the address-operand pruning step for the instruction the
    /// state was seeded on, so the transmitter doesn't erase the very
    /// dependency it was seeded with.
    first_inst: bool,
    dep_reg: Set<Register>,
    /// Most-recent-first: `executed[0]` is the last instruction visited.
    executed: Vec<usize>,
    executed_dep: Vec<Set<Register>>,
}

/// Every load, store, or conditional branch inside `[bounds.start,
/// bounds.end]` — the instructions whose operands a speculating core could
/// leak.
pub fn transmitters(cfg: &Cfg, bounds: Bounds) -> Vec<usize> {
    (0..cfg.instructions().len())
        .filter(|&idx| {
            let inst = cfg.instruction(idx);
            inst.address >= bounds.start
                && inst.address <= bounds.end
                && (inst.is_load() || inst.is_store() || inst.is_branch())
        })
        .collect()
}

/// Run the backward taint analysis from a single transmitter back to the
/// snippet entry, returning one [`Finding`] per distinct path that reaches
/// it (distinct meaning: not closed off by the loop-closure rule).
///
/// A walk terminates the moment it reaches *any* `csrrs`, not just the one
/// at the snippet's own entry marker — a self-contained snippet can still
/// contain an unrelated `csrrs` (reading some other CSR) on the way back
/// from a transmitter to the true entry, and the ground-truth analysis
/// stops and records a finding there too.
///
/// When `verbose`, prints a diagnostic to stderr for every instruction the
/// worklist visits, with the dependency set carried into it.
pub fn analyze_transmitter(cfg: &Cfg, idx: usize, verbose: bool) -> Result<Vec<Finding>, Fatal> {
    let transmitter = cfg.instruction(idx);
    if !(transmitter.is_load() || transmitter.is_store() || transmitter.is_branch()) {
        return Err(Fatal::InternalInvariant {
            address: transmitter.address,
            opcode: transmitter.opcode,
        });
    }

    let seed_dep = transmitter.leaked_operands();
    let mut worklist = vec![BackwardState {
        current: idx,
        first_inst: true,
        dep_reg: seed_dep,
        executed: Vec::new(),
        executed_dep: Vec::new(),
    }];

    let mut findings = Vec::new();

    while let Some(mut state) = worklist.pop() {
        if let Some(pos) = state.executed.iter().position(|&i| i == state.current) {
            if state.executed_dep[pos] == state.dep_reg {
                continue;
            }
        }

        let inst = cfg.instruction(state.current);
        if verbose {
            eprintln!(
                "visit: {:#x} {} (dep_reg in: {})",
                inst.address,
                inst.opcode,
                state
                    .dep_reg
                    .iter()
                    .map(Register::to_string)
                    .collect::<Vec<_>>()
                    .join(",")
            );
        }
        let mut dep_reg = state.dep_reg.clone();
        state.executed.insert(0, state.current);
        state.executed_dep.insert(0, state.dep_reg.clone());

        // Address-operand pruning: the transmitter already exposes this
        // register as an address; an earlier use of it as an address is a
        // separate transmitter, so don't propagate it again. Branches are
        // deliberately exempt — their compared operands stay in `dep_reg`
        // (see SPEC_FULL.md §9, the preserved source asymmetry).
        if (inst.is_load() || inst.is_store()) && !state.first_inst {
            if let Some(rs1) = inst.rs1 {
                dep_reg.remove(&rs1);
            }
        }

        if let Some(rd) = inst.rd {
            if dep_reg.remove(&rd) {
                if inst.is_load() || inst.is_store() {
                    return Err(Fatal::SpectreGadget {
                        register: rd,
                        defining_address: inst.address,
                        defining_opcode: inst.opcode,
                        transmitter_address: transmitter.address,
                    });
                }
                if let Some(r) = inst.rs1 {
                    dep_reg.insert(r);
                }
                if let Some(r) = inst.rs2 {
                    dep_reg.insert(r);
                }
            }
        }

        if inst.opcode == Opcode::Csrrs {
            findings.push(Finding {
                dep_reg,
                path: state.executed,
            });
            continue;
        }

        if !dep_reg.is_empty() {
            for pred in cfg.predecessors(state.current) {
                worklist.push(BackwardState {
                    current: pred,
                    first_inst: false,
                    dep_reg: dep_reg.clone(),
                    executed: state.executed.clone(),
                    executed_dep: state.executed_dep.clone(),
                });
            }
        }
    }

    Ok(findings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::front::parse::parse_listing;
    use crate::middle::{cfg::Cfg, snippet};

    fn run(listing: &str) -> Result<Vec<Finding>, Fatal> {
        let instructions = parse_listing(listing, false).unwrap();
        let cfg = Cfg::build(instructions);
        let bounds = snippet::locate(cfg.instructions()).unwrap();
        snippet::check_self_contained(cfg.instructions(), bounds).unwrap();
        let mut all = Vec::new();
        for idx in transmitters(&cfg, bounds) {
            all.extend(analyze_transmitter(&cfg, idx, false)?);
        }
        Ok(all)
    }

    #[test]
    fn leaks_an_initial_register() {
        let listing = "\
            1000:\t00000000\tcsrrs\tzero,0x802\n\
            1004:\t00053503\tld\ta1,0(a0)\n\
            1008:\t00000000\tcsrrc\tzero,0x802\n";
        let findings = run(listing).unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].dep_reg, [Register::A0].into_iter().collect());
    }

    #[test]
    fn locally_defined_address_register_is_not_exposed() {
        let listing = "\
            1000:\t00000000\tcsrrs\tzero,0x802\n\
            1004:\t01000513\taddi\ta0,zero,0x10\n\
            1008:\t00053583\tld\ta1,0(a0)\n\
            100c:\t00000000\tcsrrc\tzero,0x802\n";
        let findings = run(listing).unwrap();
        assert_eq!(findings.len(), 1);
        assert!(findings[0].dep_reg.is_empty());
    }

    #[test]
    fn detects_spectre_gadget() {
        let listing = "\
            1000:\t00000000\tcsrrs\tzero,0x802\n\
            1004:\t00053603\tld\ta2,0(a0)\n\
            1008:\t00063683\tld\ta3,0(a2)\n\
            100c:\t00000000\tcsrrc\tzero,0x802\n";
        let err = run(listing).unwrap_err();
        assert!(matches!(err, Fatal::SpectreGadget { .. }));
    }

    #[test]
    fn path_runs_from_entry_to_transmitter() {
        let listing = "\
            1000:\t00000000\tcsrrs\tzero,0x802\n\
            1004:\t01000513\taddi\ta0,zero,0x10\n\
            1008:\t00053583\tld\ta1,0(a0)\n\
            100c:\t00000000\tcsrrc\tzero,0x802\n";
        let findings = run(listing).unwrap();
        let path = &findings[0].path;
        assert_eq!(path.first().map(|&i| i), Some(0));
        assert_eq!(path.last().map(|&i| i), Some(2));
    }

    #[test]
    fn neutral_loop_terminates_and_matches_straight_line_path() {
        // The loop body only touches `a1`, which never enters the `ld`
        // transmitter's dependency set (it depends on `a0`), so the cycle
        // closes immediately without changing the answer.
        let listing = "\
            1000:\t00000000\tcsrrs\tzero,0x802\n\
            1004:\t00158593\taddi\ta1,a1,1\n\
            1008:\tfe0596e3\tbnez\ta1,1004\n\
            100c:\t00053503\tld\ta0,0(a0)\n\
            1010:\t00000000\tcsrrc\tzero,0x802\n";
        let instructions = parse_listing(listing, false).unwrap();
        let cfg = Cfg::build(instructions);
        let bounds = snippet::locate(cfg.instructions()).unwrap();
        snippet::check_self_contained(cfg.instructions(), bounds).unwrap();
        let ld_idx = cfg.index_of(0x100c).unwrap();
        let findings = analyze_transmitter(&cfg, ld_idx, false).unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].dep_reg, [Register::A0].into_iter().collect());
    }
}
