//! A static analyzer for a delimited region of disassembled RISC-V machine
//! code. See `src/bin` for the command-line driver that uses this library.

#![allow(dead_code)]

pub mod common;
pub mod front;
pub mod middle;
pub mod back;

pub use front::parse::ParseError;

/// A condition that halts the whole analyzer after printing a diagnostic.
///
/// Everything else (missing markers, an escaping branch) is a normal,
/// non-fatal outcome: see [`middle::snippet::Outcome`].
#[derive(Debug, derive_more::Display)]
pub enum Fatal {
    #[display("{}", _0)]
    Parse(ParseError),
    #[display(
        "Spectre gadget detected: {register} is defined by {defining_opcode} at {defining_address:#x}, \
         which is the base register of the transmitter at {transmitter_address:#x}"
    )]
    SpectreGadget {
        register: front::register::Register,
        defining_address: u64,
        defining_opcode: front::instruction::Opcode,
        transmitter_address: u64,
    },
    #[display("internal error: instruction at {address:#x} ({opcode}) reached the taint engine as a transmitter but is neither a load, a store, nor a branch")]
    InternalInvariant {
        address: u64,
        opcode: front::instruction::Opcode,
    },
}

impl std::error::Error for Fatal {}

impl From<ParseError> for Fatal {
    fn from(e: ParseError) -> Self {
        Fatal::Parse(e)
    }
}

/// Parse a full listing, build its control-flow graph, locate and validate
/// the snippet, and run the backward taint engine over every transmitter it
/// contains.
///
/// When `verbose`, prints a diagnostic to stderr for every line the parser
/// skips or decodes, and for every instruction the taint engine visits.
pub fn analyze(listing: &str, verbose: bool) -> Result<middle::snippet::Outcome, Fatal> {
    let instructions = front::parse::parse_listing(listing, verbose)?;
    let cfg = middle::cfg::Cfg::build(instructions);

    let Some(bounds) = middle::snippet::locate(cfg.instructions()) else {
        return Ok(middle::snippet::Outcome::MissingMarkers);
    };

    if let Err(escape) = middle::snippet::check_self_contained(cfg.instructions(), bounds) {
        return Ok(middle::snippet::Outcome::NotSelfContained(escape));
    }

    let transmitters = back::taint::transmitters(&cfg, bounds);
    let mut findings = Vec::new();
    for &idx in &transmitters {
        findings.extend(back::taint::analyze_transmitter(&cfg, idx, verbose)?);
    }

    let mut exposed = common::Set::new();
    for finding in &findings {
        exposed.extend(finding.dep_reg.iter().copied());
    }

    Ok(middle::snippet::Outcome::Report(back::report::Report {
        bounds,
        transmitters,
        findings,
        exposed,
        cfg,
    }))
}
