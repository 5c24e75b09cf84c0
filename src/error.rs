/*!
error.rs - Host-fatal fault taxonomy (spec §7).

Overview
========
Per spec §7, almost every fault this core can hit stays inside the
simulation as a guest interrupt and `execute` still returns `Ok(())`.
Only decode faults and thread overcommit are host-fatal; `CoreError` is
reserved for exactly those, plus the unanimity-scan-on-empty-mask
condition the spec calls out as "treated as a fatal condition".

The teacher crate has no error enum at all (it signals failure via a
`halted: bool` field); this type is grounded on `aero-cpu`'s use of
`thiserror` for a CPU-crate error enum elsewhere in the retrieval pack,
since spec §7's recoverable/fatal split needs a real `Result` type.
*/

use thiserror::Error;

/// A host-fatal condition raised by [`crate::execute::execute`].
///
/// Every variant here is something a careful fetch/commit driver is
/// expected to log and then terminate on (spec §7); this crate does
/// not call `std::process::exit` itself - that decision belongs to the
/// driver, not a library function.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("unknown opcode at pc={pc:#010x}")]
    UnknownOpcode { pc: u32 },

    #[error("unknown sub-function {func3} for opcode at pc={pc:#010x}")]
    UnknownSubFunction { pc: u32, func3: u8 },

    #[error("thread overcommit: requested {requested} active threads, only {available} lanes available")]
    ThreadOvercommit { requested: usize, available: usize },

    #[error("SPLIT at pc={pc:#010x} found no active lane to check unanimity against")]
    DivergentUnanimityCheck { pc: u32 },
}
