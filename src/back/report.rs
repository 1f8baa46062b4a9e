//! Human-readable report formatting.

use std::fmt;

use crate::back::taint::Finding;
use crate::common::Set;
use crate::front::Register;
use crate::middle::{Bounds, Cfg};

/// The outcome of a complete, successful (non-fatal) analysis run.
#[derive(Debug)]
pub struct Report {
    pub bounds: Bounds,
    pub transmitters: Vec<usize>,
    pub findings: Vec<Finding>,
    pub exposed: Set<Register>,
    pub cfg: Cfg,
}

fn format_instruction(cfg: &Cfg, idx: usize) -> String {
    let inst = cfg.instruction(idx);
    format!("0x{:08x}: {} {}", inst.address, inst.opcode, inst.operand_text())
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Snippet boundaries: 0x{:08x} - 0x{:08x}",
            self.bounds.start, self.bounds.end
        )?;
        writeln!(f, "Self-contained: yes")?;
        writeln!(f)?;

        writeln!(f, "Transmitters ({}):", self.transmitters.len())?;
        for &idx in &self.transmitters {
            writeln!(f, "  {}", format_instruction(&self.cfg, idx))?;
        }
        writeln!(f)?;

        for finding in &self.findings {
            let regs: Vec<String> = finding.dep_reg.iter().map(Register::to_string).collect();
            writeln!(f, "Finding: leaks {{{}}}", regs.join(", "))?;
            writeln!(f, "  Path:")?;
            for &idx in &finding.path {
                writeln!(f, "    {}", format_instruction(&self.cfg, idx))?;
            }
        }
        writeln!(f)?;

        writeln!(f, "Unique exposed initial registers:")?;
        for reg in &self.exposed {
            writeln!(f, "  - {reg}")?;
        }

        Ok(())
    }
}
