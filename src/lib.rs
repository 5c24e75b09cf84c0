#![doc = r#"
vortex-core library crate.

This crate exposes the instruction execution core for an RV32IM-based
GPGPU warp simulator: given one decoded instruction, a warp's
architectural state, its sibling warps, and a memory adapter, it
performs exactly that one instruction's architectural effects.

Modules:
- isa: decoded instruction representation and opcode metadata
- warp: per-warp architectural state (registers, predicates, mask, dom stack)
- domstack: SPLIT/JOIN reconvergence stack and unanimity check
- memory: the `Memory` adapter trait the core reads/writes through
- trace: per-instruction observability record filled in by `execute`
- error: host-fatal fault taxonomy
- execute: the dispatcher and per-opcode-family semantics
- hosttrap: the sentinel-PC syscall bridge to the host

In tests, a minimal in-memory `Memory` implementation is available via
`crate::memory::SimpleMemory`.
"#]

// Core execution modules
pub mod domstack;
pub mod error;
pub mod execute;
pub mod hosttrap;
pub mod isa;
pub mod memory;
pub mod trace;
pub mod warp;

// Re-export commonly used types at the crate root for convenience.
pub use error::CoreError;
pub use execute::execute;
pub use isa::{Instruction, Opcode};
pub use memory::Memory;
pub use trace::Trace;
pub use warp::Warp;

/// Upper bound on lanes-per-warp this core is built against. Sized for
/// the trace record's fixed-width per-lane array (spec §6); a warp's
/// own register/predicate files size themselves dynamically from
/// `Warp::dormant`'s `num_lanes` argument and are never required to
/// equal this bound, only to stay at or below it.
pub const MAX_LANES: usize = 32;
