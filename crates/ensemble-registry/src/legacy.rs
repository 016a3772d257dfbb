//! Sex-letter gender tags and the count checks older callers still use.
//!
//! Each role contributes the letters of the sexes it admits (`M`, `F`, `H`
//! for humans, a single `C` for creatures). Every combination of one letter
//! per role, in role order and reversed, becomes a scene tag such as `mf` or
//! `fmc`. Tags are stored lowercased like all others.

use std::ops::ControlFlow;

use ensemble_core::combinatorics::Combinations;
use ensemble_core::fragment::SexSet;
use ensemble_core::requirement::RequirementSlot;

use crate::scene::Scene;

fn letters(slot: &RequirementSlot) -> Vec<char> {
    if !slot.is_human() {
        return vec!['c'];
    }
    [(SexSet::MALE, 'm'), (SexSet::FEMALE, 'f'), (SexSet::FUTA, 'h')]
        .into_iter()
        .filter(|(sex, _)| slot.sex.contains(*sex))
        .map(|(_, letter)| letter)
        .collect()
}

/// Gender tags for a role template, forward and reversed, without
/// duplicates.
pub fn gender_tags(slots: &[RequirementSlot]) -> Vec<String> {
    let per_role: Vec<Vec<char>> = slots.iter().map(letters).collect();
    let mut tags: Vec<String> = Vec::new();
    for combination in Combinations::new(&per_role) {
        let forward: String = combination.iter().copied().collect();
        let reversed: String = combination.iter().rev().copied().collect();
        for tag in [forward, reversed] {
            if !tag.is_empty() && !tags.contains(&tag) {
                tags.push(tag);
            }
        }
    }
    tags
}

fn is_sex_tag(tag: &str) -> bool {
    !tag.is_empty() && tag.chars().all(|c| matches!(c, 'm' | 'f' | 'c'))
}

fn count(tag: &str, letter: char) -> usize {
    tag.chars().filter(|&c| c == letter).count()
}

fn wanted(requested: i32, actual: usize) -> bool {
    requested < 0 || usize::try_from(requested).is_ok_and(|r| r == actual)
}

impl Scene {
    /// Whether some gender tag has exactly `males` human males and `females`
    /// human females. A negative count matches anything.
    pub fn legacy_is_compatible_sex_count(&self, males: i32, females: i32) -> bool {
        if males < 0 && females < 0 {
            return true;
        }
        self.tags().for_each_tag(|tag| {
            if is_sex_tag(tag) && wanted(males, count(tag, 'm')) && wanted(females, count(tag, 'f')) {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        })
    }

    /// Whether the creature roles can be split into exactly `males` males and
    /// `females` females.
    ///
    /// Roles admitting only one sex are fixed; roles admitting both take up
    /// whatever remains.
    pub fn legacy_is_compatible_creature_sex_count(&self, males: i32, females: i32) -> bool {
        let (Ok(males), Ok(females)) = (usize::try_from(males), usize::try_from(females)) else {
            return false;
        };

        let (mut fixed_male, mut fixed_female, mut either) = (0usize, 0usize, 0usize);
        for slot in self.slots().iter().filter(|s| !s.is_human()) {
            if !slot.sex.contains(SexSet::FEMALE) {
                fixed_male += 1;
            } else if !slot.sex.contains(SexSet::MALE) {
                fixed_female += 1;
            } else {
                either += 1;
            }
        }

        if fixed_male + fixed_female + either != males + females {
            return false;
        }
        fixed_male <= males && fixed_male + either >= males && fixed_female <= females
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
