/*!
execute/simt.rs - GPGPU family: TMC, WSPAWN, SPLIT, JOIN, BARRIER (spec §4.2).

Overview
========
These are the warp-scoped opcodes: the dispatcher in `execute::mod`
only calls into here for lane 0, already past the `sjOnce` latch, so
none of these functions need to re-check that themselves. WSPAWN is the
only one that touches warps other than the current one, which is why it
alone takes a `siblings` slice instead of `&mut Warp`.
*/

use crate::domstack::{check_unanimous, DomStackEntry};
use crate::error::CoreError;
use crate::trace::Trace;
use crate::warp::Warp;

/// `TMC` (spec §4.2): returns the new active-thread count for the
/// caller to commit as `nextActiveThreads`. Updates `tmask` immediately
/// (later lanes in the same dispatch observe it) and clears `spawned`
/// when the count drops to zero.
pub fn tmc(rs1: u32, warp: &mut Warp, trace: &mut Trace) -> usize {
    let next_active = rs1 as usize;
    for (i, bit) in warp.tmask.iter_mut().enumerate() {
        *bit = i < next_active;
    }
    if next_active == 0 {
        warp.spawned = false;
    }
    trace.stall_warp = true;
    next_active
}

/// `WSPAWN` (spec §4.2): wakes siblings with id in `1..n` at `start_pc`.
/// The issuing warp is untouched by this call - the caller never
/// includes it in `siblings`, or if it does, its id is outside `1..n`
/// for `n == rs1` taken from the issuing warp's own register read.
pub fn wspawn(n: u32, start_pc: u32, siblings: &mut [Warp], trace: &mut Trace) {
    let n = n as usize;
    for sibling in siblings.iter_mut() {
        if (1..n).contains(&sibling.id) {
            sibling.wake_for_wspawn(start_pc);
        }
    }
    trace.wspawn = true;
}

/// `SPLIT` (spec §4.2, §9 Open Question 1). `pred_idx` names the
/// predicate register to check; `inst_pc` is the SPLIT instruction's
/// own address (used only for the fatal-unanimity-check diagnostic);
/// `fall_through_pc` is the already-advanced PC - the address right
/// after SPLIT - recorded on the taken-side frame (spec §3: "a frame
/// holding ... the fall-through PC"; `original_source/simX/instruction.cpp`'s
/// `DomStackEntry e(pred, c.reg, c.tmask, c.pc)` uses the entering,
/// unmodified `c.pc`, not `c.pc - 4`).
///
/// Returns `Err(CoreError::DivergentUnanimityCheck)` if there is no
/// active lane to check unanimity against - the unanimity scan is
/// fatal on an empty mask (spec §7), not vacuously true.
pub fn split(
    pred_idx: usize,
    inst_pc: u32,
    fall_through_pc: u32,
    warp: &mut Warp,
    trace: &mut Trace,
) -> Result<(), CoreError> {
    trace.stall_warp = true;
    let orig = warp.tmask.clone();
    let unanimous = check_unanimous(|t| warp.pred.get(t, pred_idx), &orig).ok_or_else(|| {
        let err = CoreError::DivergentUnanimityCheck { pc: inst_pc };
        tracing::error!(warp = warp.id, %err, "SPLIT unanimity check on empty mask");
        err
    })?;

    if unanimous {
        warp.dom_stack.push(DomStackEntry::unanimous(orig));
        return Ok(());
    }

    // "Stored" mask: active lanes whose predicate is true - these are
    // the lanes disabled by this SPLIT and parked for a later JOIN
    // (spec §9 Open Question 1: the *predicate-false* side runs first).
    let stored: Vec<bool> = orig
        .iter()
        .enumerate()
        .map(|(t, &active)| active && warp.pred.get(t, pred_idx))
        .collect();

    warp.dom_stack.push(DomStackEntry::restore(orig.clone()));
    warp.dom_stack
        .push(DomStackEntry::taken(stored.clone(), fall_through_pc));

    for (i, bit) in warp.tmask.iter_mut().enumerate() {
        *bit = !stored[i] && orig[i];
    }
    Ok(())
}

/// `JOIN` (spec §4.2): pops the dominator stack and restores its mask.
/// Returns the PC to resume at when the popped frame demands it (its
/// `fallThrough` is false) - the caller arbitrates this against the
/// `pcSet` latch like any other PC-setting opcode.
pub fn join(warp: &mut Warp, trace: &mut Trace) -> Option<u32> {
    trace.stall_warp = true;
    let frame = warp.dom_stack.pop()?;
    let target = (!frame.uni && !frame.fall_through).then_some(frame.pc);
    warp.tmask = frame.tmask;
    target
}

/// `BARRIER` (spec §4.2, §9 Open Question 3): no core-internal
/// semantics, only a stall marker for the external fetch/commit driver.
pub fn barrier(trace: &mut Trace) {
    trace.stall_warp = true;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::warp::Warp;

    #[test]
    fn tmc_narrows_mask_and_count() {
        let mut warp = Warp::dormant(0, 8);
        warp.tmask = vec![true; 8];
        let mut trace = Trace::new();
        let next = tmc(3, &mut warp, &mut trace);
        assert_eq!(next, 3);
        assert_eq!(warp.tmask, vec![true, true, true, false, false, false, false, false]);
        assert!(trace.stall_warp);
    }

    #[test]
    fn tmc_zero_clears_spawned() {
        let mut warp = Warp::dormant(0, 8);
        warp.spawned = true;
        warp.tmask = vec![true; 8];
        let mut trace = Trace::new();
        tmc(0, &mut warp, &mut trace);
        assert!(!warp.spawned);
        assert!(warp.tmask.iter().all(|&b| !b));
    }

    #[test]
    fn wspawn_wakes_only_ids_in_range() {
        let mut siblings = vec![Warp::dormant(1, 8), Warp::dormant(2, 8), Warp::dormant(3, 8)];
        let mut trace = Trace::new();
        wspawn(3, 0x8000, &mut siblings, &mut trace);
        assert_eq!(siblings[0].pc, 0x8000);
        assert!(siblings[0].spawned);
        assert_eq!(siblings[1].pc, 0x8000);
        assert!(siblings[1].spawned);
        assert!(!siblings[2].spawned);
        assert_eq!(siblings[2].pc, 0);
    }

    #[test]
    fn split_unanimous_pushes_single_frame() {
        let mut warp = Warp::dormant(0, 4);
        warp.tmask = vec![true, true, true, true];
        for t in 0..4 {
            warp.pred.set(t, 0, true);
        }
        let mut trace = Trace::new();
        split(0, 0xfc, 0x100, &mut warp, &mut trace).unwrap();
        assert_eq!(warp.dom_stack.len(), 1);
        assert!(warp.dom_stack[0].uni);
        assert_eq!(warp.tmask, vec![true, true, true, true]);
    }

    #[test]
    fn split_divergent_pushes_two_frames_and_runs_false_side() {
        let mut warp = Warp::dormant(0, 4);
        warp.tmask = vec![true, true, true, true];
        warp.pred.set(0, 0, true);
        warp.pred.set(1, 0, false);
        warp.pred.set(2, 0, true);
        warp.pred.set(3, 0, false);
        let mut trace = Trace::new();
        split(0, 0xfc, 0x100, &mut warp, &mut trace).unwrap();
        assert_eq!(warp.dom_stack.len(), 2);
        assert_eq!(warp.tmask, vec![false, true, false, true]);
        // restore frame pushed first, sits at the bottom
        assert!(warp.dom_stack[0].fall_through);
        assert!(!warp.dom_stack[1].fall_through);
        // the taken frame's resume PC is the already-advanced
        // fall-through PC, not the SPLIT instruction's own address.
        assert_eq!(warp.dom_stack[1].pc, 0x100);
    }

    #[test]
    fn split_empty_mask_is_fatal() {
        let mut warp = Warp::dormant(0, 4);
        warp.tmask = vec![false; 4];
        let mut trace = Trace::new();
        let err = split(0, 0xfc, 0x100, &mut warp, &mut trace).unwrap_err();
        assert_eq!(err, CoreError::DivergentUnanimityCheck { pc: 0xfc });
    }

    #[test]
    fn join_restores_outer_mask_and_balances_stack() {
        let mut warp = Warp::dormant(0, 4);
        warp.tmask = vec![true, true, true, true];
        warp.pred.set(0, 0, true);
        warp.pred.set(1, 0, false);
        let mut trace = Trace::new();
        split(0, 0xfc, 0x100, &mut warp, &mut trace).unwrap();
        let pc1 = join(&mut warp, &mut trace);
        assert_eq!(pc1, Some(0x100));
        let pc2 = join(&mut warp, &mut trace);
        assert_eq!(pc2, None);
        assert!(warp.dom_stack.is_empty());
        assert_eq!(warp.tmask, vec![true, true, true, true]);
    }
}
