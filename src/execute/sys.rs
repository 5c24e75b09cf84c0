/*!
execute/sys.rs - SYS_INST, TRAP, FENCE, NOP (spec §4.1, §4.5).

Overview
========
The smallest family: two CSR reads, one interrupt-raising opcode, and
two true no-ops. Kept as its own module rather than folded into
`alu`/`branch` because it is the one place the dispatcher talks to
`Warp::interrupt` directly (spec §4.5), distinct from everything else
here which only ever touches registers/PC.
*/

use crate::warp::Warp;

/// CSR address read by SYS to fetch the executing lane's index.
pub const CSR_THREAD_ID: u32 = 0x20;
/// CSR address read by SYS to fetch the warp's own id.
pub const CSR_WARP_ID: u32 = 0x21;

/// `SYS_INST` (spec §4.1 `SYS`, §9 Open Question 4). Only the two
/// thread/warp id CSRs are implemented; everything else is
/// intentionally unimplemented and yields no register write.
#[must_use]
pub fn sys_inst(csr: u32, lane: usize, warp_id: usize) -> Option<u32> {
    match csr {
        CSR_THREAD_ID => Some(lane as u32),
        CSR_WARP_ID => Some(warp_id as u32),
        _ => None,
    }
}

/// `TRAP` (spec §4.1, §4.5): retires every lane and raises guest
/// interrupt 0. Returns the new (zero) active-thread count for the
/// caller to commit.
pub fn trap(warp: &mut Warp) -> usize {
    warp.interrupt(0);
    0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::warp::Warp;

    #[test]
    fn sys_reads_thread_id() {
        assert_eq!(sys_inst(CSR_THREAD_ID, 5, 2), Some(5));
    }

    #[test]
    fn sys_reads_warp_id() {
        assert_eq!(sys_inst(CSR_WARP_ID, 5, 2), Some(2));
    }

    #[test]
    fn sys_unimplemented_csr_is_noop() {
        assert_eq!(sys_inst(0x7FF, 5, 2), None);
    }

    #[test]
    fn trap_zeroes_active_threads_and_raises_interrupt_zero() {
        let mut warp = Warp::dormant(0, 8);
        let next = trap(&mut warp);
        assert_eq!(next, 0);
        assert_eq!(warp.last_interrupt(), Some(0));
    }
}
