/*!
domstack.rs - SPLIT/JOIN dominator (reconvergence) stack.

Overview
========
A frame is pushed by SPLIT and popped by JOIN (spec §3/§4.2). The stack
is a simple LIFO of fixed small frames - no shared ownership, no cycles
(spec §9 design notes) - so a `Vec` used purely as a stack is the right
container, the same way the teacher crate reaches for a plain `Vec`/
array for small per-instruction scratch state rather than a dedicated
collection type.
*/

/// One divergence frame. See spec §3 for field semantics.
#[derive(Debug, Clone)]
pub struct DomStackEntry {
    /// The lane mask to restore (unanimous case) or to take next on JOIN.
    pub tmask: Vec<bool>,
    /// Fall-through PC to jump to when the taken side completes.
    pub pc: u32,
    /// True if the SPLIT that pushed this frame was unanimous.
    pub uni: bool,
    /// False => on JOIN, set PC to `pc`.
    ///
    /// Defaults to `true` (Open Question 2): the restore frame SPLIT
    /// pushes first carries no meaningful `pc`, and JOIN must pop it as
    /// a plain mask restore rather than a PC jump.
    pub fall_through: bool,
}

impl DomStackEntry {
    /// A unanimous-SPLIT frame: just a mask to restore on JOIN.
    #[must_use]
    pub fn unanimous(tmask: Vec<bool>) -> Self {
        Self {
            tmask,
            pc: 0,
            uni: true,
            fall_through: true,
        }
    }

    /// The restore frame SPLIT pushes first: the incoming mask, no PC.
    #[must_use]
    pub fn restore(tmask: Vec<bool>) -> Self {
        Self {
            tmask,
            pc: 0,
            uni: false,
            fall_through: true,
        }
    }

    /// The taken-side frame SPLIT pushes second: the side not taken now,
    /// resumed at `pc` once its counterpart JOINs.
    #[must_use]
    pub fn taken(tmask: Vec<bool>, pc: u32) -> Self {
        Self {
            tmask,
            pc,
            uni: false,
            fall_through: false,
        }
    }
}

/// Returns true if every active lane agrees on `pred[t][p]`.
///
/// Mirrors `checkUnanimous` in the original simulator: an empty active
/// mask is a fatal condition, not "vacuously unanimous" (spec §7) - the
/// caller is expected to treat `None` as
/// [`crate::error::CoreError::DivergentUnanimityCheck`].
#[must_use]
pub fn check_unanimous(
    pred_bit: impl Fn(usize) -> bool,
    tmask: &[bool],
) -> Option<bool> {
    let mut lanes = tmask.iter().enumerate().filter(|(_, active)| **active);
    let (first, _) = lanes.next()?;
    let same = pred_bit(first);
    Some(lanes.all(|(t, _)| pred_bit(t) == same))
}
