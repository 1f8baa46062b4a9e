//! The control-flow graph builder (C4).
//!
//! No basic-block abstraction is needed: every instruction just remembers
//! its fall-through predecessor (the textually preceding instruction) and
//! the list of branches/jumps whose literal target resolves to it
//! (back-edges). The taint engine walks these two relations directly.

use std::collections::BTreeMap;

use crate::front::Instruction;

#[derive(Debug)]
pub struct Cfg {
    arena: Vec<Instruction>,
    by_address: BTreeMap<u64, usize>,
    /// `sources[i]` holds the indices of every branch/jump whose literal
    /// target is `arena[i].address`.
    sources: Vec<Vec<usize>>,
}

impl Cfg {
    pub fn build(instructions: Vec<Instruction>) -> Cfg {
        let by_address: BTreeMap<u64, usize> = instructions
            .iter()
            .enumerate()
            .map(|(i, inst)| (inst.address, i))
            .collect();

        let mut sources = vec![Vec::new(); instructions.len()];
        for (i, inst) in instructions.iter().enumerate() {
            if let Some(target) = inst.literal_target() {
                if let Some(&target_idx) = by_address.get(&target) {
                    sources[target_idx].push(i);
                }
            }
        }

        Cfg {
            arena: instructions,
            by_address,
            sources,
        }
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.arena
    }

    pub fn index_of(&self, address: u64) -> Option<usize> {
        self.by_address.get(&address).copied()
    }

    pub fn instruction(&self, idx: usize) -> &Instruction {
        &self.arena[idx]
    }

    /// The textually preceding instruction, if any.
    pub fn fallthrough(&self, idx: usize) -> Option<usize> {
        idx.checked_sub(1)
    }

    /// Every branch/jump back-edge whose literal target is this instruction.
    pub fn sources(&self, idx: usize) -> &[usize] {
        &self.sources[idx]
    }

    /// All predecessors used for backward propagation: back-edge sources
    /// plus the fall-through, in that order.
    pub fn predecessors(&self, idx: usize) -> Vec<usize> {
        let mut preds: Vec<usize> = self.sources[idx].clone();
        if let Some(prev) = self.fallthrough(idx) {
            preds.push(prev);
        }
        preds
    }
}
