/*!
isa.rs - Decoded-instruction input contract and opcode metadata.

Overview
========
This module owns the *shape* of a decoded instruction, not its decoding.
The decoder (external to this core, per spec §1) produces `Instruction`
values; this core only ever reads them.

Field list and the `Opcode` enum are fixed by the external decoder
contract — adding or renaming variants here is a breaking change for
every caller, so keep this enum in lock-step with the decoder, the way
the teacher crate's addressing-mode enum (`cpu/table.rs::AddrMode`) is
shared verbatim between the decoder-ish opcode table and the executor.
*/

/// Stable opcode identifiers produced by the (external) decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    Nop,
    R,
    L,
    I,
    S,
    B,
    Lui,
    Auipc,
    Jal,
    Jalr,
    Sys,
    Trap,
    Fence,
    Pj,
    Gpgpu,
}

/// Per-opcode metadata supplied by the decoder/instruction table.
///
/// Only the two fields the execution core actually consults are
/// modeled: the privilege gate (spec §4.1) and a printable mnemonic for
/// diagnostics. Anything else (encoding widths, assembler syntax) lives
/// entirely on the decoder side and has no business here.
#[derive(Debug, Clone, Copy)]
pub struct InstMeta {
    pub mnemonic: &'static str,
    pub privileged: bool,
}

impl InstMeta {
    const fn new(mnemonic: &'static str, privileged: bool) -> Self {
        Self {
            mnemonic,
            privileged,
        }
    }
}

/// Mnemonic/privilege lookup for every `Opcode` variant.
///
/// None of the opcodes in this ISA are privileged today; the field
/// exists because the privilege gate (spec §4.1) is a property of the
/// opcode table, not something the dispatcher hardcodes, mirroring how
/// the teacher's `OpInfo` table carries a `page_cross_penalty`/`rmw`
/// flag per opcode rather than special-casing it in `execute.rs`.
pub fn inst_meta(op: Opcode) -> InstMeta {
    match op {
        Opcode::Nop => InstMeta::new("nop", false),
        Opcode::R => InstMeta::new("r.inst", false),
        Opcode::L => InstMeta::new("l.inst", false),
        Opcode::I => InstMeta::new("i.inst", false),
        Opcode::S => InstMeta::new("s.inst", false),
        Opcode::B => InstMeta::new("b.inst", false),
        Opcode::Lui => InstMeta::new("lui", false),
        Opcode::Auipc => InstMeta::new("auipc", false),
        Opcode::Jal => InstMeta::new("jal", false),
        Opcode::Jalr => InstMeta::new("jalr", false),
        Opcode::Sys => InstMeta::new("sys", false),
        Opcode::Trap => InstMeta::new("trap", false),
        Opcode::Fence => InstMeta::new("fence", false),
        Opcode::Pj => InstMeta::new("pj", false),
        Opcode::Gpgpu => InstMeta::new("gpgpu", false),
    }
}

/// A fully decoded instruction, as handed to [`crate::execute::execute`].
///
/// Sign extension of `imm` is the decoder's job (spec §6): by the time
/// this struct exists, `imm` is already a sign-extended 32-bit value
/// regardless of the original encoded immediate width.
#[derive(Debug, Clone, Copy)]
pub struct Instruction {
    pub op: Opcode,
    pub func3: u8,
    pub func7: u8,
    pub rdest: usize,
    pub rsrc: [usize; 2],
    pub psrc: [usize; 2],
    pub imm: u32,
    pub pdest: usize,
    pub is_predicated: bool,
    pub pred: usize,
    pub rdest_present: bool,
    pub imm_present: bool,
    pub pred_present: bool,
}

impl Instruction {
    /// Construct a plain R/I/S/B/GPGPU-shaped instruction with no
    /// predicate fields set; convenience for tests and simple drivers.
    #[must_use]
    pub fn new(op: Opcode) -> Self {
        Self {
            op,
            func3: 0,
            func7: 0,
            rdest: 0,
            rsrc: [0, 0],
            psrc: [0, 0],
            imm: 0,
            pdest: 0,
            is_predicated: false,
            pred: 0,
            rdest_present: false,
            imm_present: false,
            pred_present: false,
        }
    }

    #[must_use]
    pub fn with_func3(mut self, func3: u8) -> Self {
        self.func3 = func3;
        self
    }

    #[must_use]
    pub fn with_func7(mut self, func7: u8) -> Self {
        self.func7 = func7;
        self
    }

    #[must_use]
    pub fn with_rdest(mut self, rdest: usize) -> Self {
        self.rdest = rdest;
        self.rdest_present = true;
        self
    }

    #[must_use]
    pub fn with_rsrc(mut self, rs1: usize, rs2: usize) -> Self {
        self.rsrc = [rs1, rs2];
        self
    }

    #[must_use]
    pub fn with_imm(mut self, imm: u32) -> Self {
        self.imm = imm;
        self.imm_present = true;
        self
    }

    #[must_use]
    pub fn with_pred(mut self, pred: usize) -> Self {
        self.pred = pred;
        self.pred_present = true;
        self
    }
}
