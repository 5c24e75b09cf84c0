/*!
trace.rs - Observability side channel filled in by `execute` (spec §6).

Overview
========
`Trace` is out-out-band: nothing in `execute` reads it back. It exists
so an external driver can print/log per-instruction behavior without
the core itself owning any printing or tracing-subscriber setup (both
explicitly out of scope, spec §1). This mirrors the teacher crate's own
split between architectural state and the `mem_addresses`-style
reporting bus reads/writes leave behind for debugging.
*/

use crate::MAX_LANES;

/// Per-instruction observability record. Cleared by the caller (or via
/// [`Trace::default`]) before each `execute` call.
#[derive(Debug, Clone, Copy)]
pub struct Trace {
    /// Set for L_INST.
    pub is_lw: bool,
    /// Set for S_INST.
    pub is_sw: bool,
    /// Set for any opcode the fetch/commit driver should treat as a
    /// scheduling stall point (branches, jumps, GPGPU ops).
    pub stall_warp: bool,
    /// Set when WSPAWN ran this instruction.
    pub wspawn: bool,
    /// Per-lane effective address for loads/stores; `None` for lanes
    /// that did not perform a memory access this instruction.
    pub mem_addresses: [Option<u32>; MAX_LANES],
}

impl Default for Trace {
    fn default() -> Self {
        Self {
            is_lw: false,
            is_sw: false,
            stall_warp: false,
            wspawn: false,
            mem_addresses: [None; MAX_LANES],
        }
    }
}

impl Trace {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset to a fresh per-instruction state in place.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
