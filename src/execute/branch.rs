/*!
execute/branch.rs - B_INST, JAL, JALR, PJ, LUI, AUIPC (spec §4.1).

Overview
========
Every handler here either produces a register value, a candidate new
PC, or both; none of them decide whether a candidate PC actually wins
the "first lane sets it" race (spec §4.1, §5) - that arbitration lives
in `execute::mod` via the `pcSet` latch, the same way the teacher's
branch dispatch computes a target and lets the shared dispatcher decide
whether to take it.
*/

use crate::isa::Instruction;

/// `B_INST` (spec §4.1 `B`): returns the branch target if the condition
/// holds, `None` otherwise. `inst_pc` is the address of the branch
/// itself (`warp.pc - 4`).
#[must_use]
pub fn b_inst(inst: &Instruction, rs1: u32, rs2: u32, inst_pc: u32) -> Option<u32> {
    let taken = match inst.func3 {
        0 => rs1 == rs2,
        1 => rs1 != rs2,
        4 => (rs1 as i32) < (rs2 as i32),
        5 => (rs1 as i32) >= (rs2 as i32),
        6 => rs1 < rs2,
        7 => rs1 >= rs2,
        _ => false,
    };
    taken.then(|| inst_pc.wrapping_add(inst.imm))
}

/// `LUI` (spec §4.1): `rd = (imm << 12) & 0xFFFFF000`.
#[must_use]
pub fn lui(imm: u32) -> u32 {
    (imm << 12) & 0xFFFF_F000
}

/// `AUIPC` (spec §4.1): `rd = ((imm << 12) & 0xFFFFF000) + (pc - 4)`.
#[must_use]
pub fn auipc(imm: u32, inst_pc: u32) -> u32 {
    lui(imm).wrapping_add(inst_pc)
}

/// `JAL` target (spec §4.1): `(pc - 4) + imm`.
#[must_use]
pub fn jal_target(inst_pc: u32, imm: u32) -> u32 {
    inst_pc.wrapping_add(imm)
}

/// `JALR` target (spec §4.1): `rs1 + imm`.
#[must_use]
pub fn jalr_target(rs1: u32, imm: u32) -> u32 {
    rs1.wrapping_add(imm)
}

/// Link value written to `rd` by JAL/JALR: the post-instruction PC,
/// i.e. the warp's `pc` field as it stood at entry to `execute` -
/// already four past the jump (spec §4.1).
#[must_use]
pub fn link_value(entry_pc: u32) -> u32 {
    entry_pc
}

/// `PJ_INST` (predicated indirect jump, spec §4.1): target is `rs2` if
/// `rs1 != 0`.
#[must_use]
pub fn pj_target(rs1: u32, rs2: u32) -> Option<u32> {
    (rs1 != 0).then_some(rs2)
}
