//! Actor-to-role assignment.
//!
//! Each actor is described by the [`Fragment`] observed for it. The solver
//! lists, per actor, the roles that fragment can fill, then walks the
//! cartesian product of those lists (actor order outermost, each actor's
//! roles in role order) and keeps the first choice in which no role is taken
//! twice. The walk order is fixed, so the same input always yields the same
//! assignment.
//!
//! When no assignment exists the fallback pass relaxes actors one at a time,
//! in input order: a single female human is reinterpreted as male, everyone
//! else keeps their observed fragment, and the search is re-run. The first
//! retry that succeeds wins.
//!
//! "No assignment" is a normal outcome and is reported as `None`.

use std::ops::ControlFlow;

use tracing::debug;

use ensemble_core::combinatorics::for_each_combination;
use ensemble_core::fragment::Fragment;
use ensemble_core::requirement::RequirementSlot;

use crate::scene::Scene;

/// Actors mapped onto distinct roles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment<A> {
    by_slot: Vec<Option<A>>,
    slot_of: Vec<usize>,
    degendered: Vec<usize>,
}

impl<A> Assignment<A> {
    /// The actor in each role; `None` for roles left open.
    pub fn by_slot(&self) -> &[Option<A>] {
        &self.by_slot
    }

    pub fn actor_in(&self, slot: usize) -> Option<&A> {
        self.by_slot.get(slot)?.as_ref()
    }

    /// Role of the `n`th input actor.
    pub fn slot_of(&self, actor: usize) -> Option<usize> {
        self.slot_of.get(actor).copied()
    }

    /// Input position of the actor relaxed to find this assignment; empty
    /// when the observed fragments fit as they are.
    pub fn degendered(&self) -> &[usize] {
        &self.degendered
    }

    /// Whether every role has an actor.
    pub fn is_complete(&self) -> bool {
        self.by_slot.iter().all(Option::is_some)
    }

    pub fn into_slots(self) -> Vec<Option<A>> {
        self.by_slot
    }
}

/// Roles `fragment` can fill, in role order.
pub fn candidate_slots(slots: &[RequirementSlot], fragment: &Fragment) -> Vec<usize> {
    slots
        .iter()
        .enumerate()
        .filter(|(_, slot)| slot.can_fill(fragment))
        .map(|(i, _)| i)
        .collect()
}

/// First injective role choice for `fragments`, as one role per fragment.
fn search(slots: &[RequirementSlot], fragments: &[Fragment]) -> Option<Vec<usize>> {
    if fragments.len() > slots.len() {
        return None;
    }
    let candidates: Vec<Vec<usize>> = fragments
        .iter()
        .map(|f| candidate_slots(slots, f))
        .collect();

    let mut taken = vec![false; slots.len()];
    for_each_combination(&candidates, |choice| {
        taken.fill(false);
        for &&slot in choice {
            if taken[slot] {
                return ControlFlow::Continue(());
            }
            taken[slot] = true;
        }
        ControlFlow::Break(choice.iter().map(|&&s| s).collect())
    })
}

fn build<A: Clone>(
    slot_count: usize,
    actors: &[(A, Fragment)],
    slot_of: Vec<usize>,
    degendered: Vec<usize>,
) -> Assignment<A> {
    let mut by_slot = vec![None; slot_count];
    for ((actor, _), &slot) in actors.iter().zip(&slot_of) {
        by_slot[slot] = Some(actor.clone());
    }
    Assignment {
        by_slot,
        slot_of,
        degendered,
    }
}

/// Assign `actors` to `slots` exactly as observed.
///
/// `None` if there are more actors than roles or no injective choice exists.
pub fn assign<A: Clone>(slots: &[RequirementSlot], actors: &[(A, Fragment)]) -> Option<Assignment<A>> {
    let fragments: Vec<Fragment> = actors.iter().map(|(_, f)| *f).collect();
    let slot_of = search(slots, &fragments)?;
    Some(build(slots.len(), actors, slot_of, Vec::new()))
}

/// Like [`assign`], degendering actors one by one when the strict pass
/// fails.
pub fn assign_with_fallback<A: Clone>(
    slots: &[RequirementSlot],
    actors: &[(A, Fragment)],
) -> Option<Assignment<A>> {
    if actors.len() > slots.len() {
        return None;
    }
    if let Some(found) = assign(slots, actors) {
        return Some(found);
    }

    let observed: Vec<Fragment> = actors.iter().map(|(_, f)| *f).collect();
    let mut trial = observed.clone();
    for (i, fragment) in observed.iter().enumerate() {
        let Some(relaxed) = fragment.degendered() else {
            continue;
        };
        trial[i] = relaxed;
        debug!(actor = i, "retrying assignment with degendered actor");
        if let Some(slot_of) = search(slots, &trial) {
            return Some(build(slots.len(), actors, slot_of, vec![i]));
        }
        trial[i] = *fragment;
    }
    None
}

impl Scene {
    /// Assign `actors` to this scene's roles, with or without the
    /// degendering fallback.
    pub fn assign_actors<A: Clone>(
        &self,
        actors: &[(A, Fragment)],
        fallback: bool,
    ) -> Option<Assignment<A>> {
        if fallback {
            assign_with_fallback(self.slots(), actors)
        } else {
            assign(self.slots(), actors)
        }
    }

    /// Whether the actors described by `fragments` can play this scene.
    pub fn accepts_fragments(&self, fragments: &[Fragment], fallback: bool) -> bool {
        let actors: Vec<(usize, Fragment)> = fragments.iter().copied().enumerate().collect();
        self.assign_actors(&actors, fallback).is_some()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
