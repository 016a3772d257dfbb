//! Role requirements and the fragment algebra.
//!
//! A [`RequirementSlot`] is the template for one role of a scene. Matching an
//! actor against it has two directions:
//!
//! - [`RequirementSlot::can_fill`] tests one observed [`Fragment`].
//! - [`RequirementSlot::make_fragments`] enumerates every fragment the slot
//!   accepts. Permissive requirements ("vampire or not", "dog or wolf") show
//!   up as several acceptable values instead of as conditional logic.
//!
//! Every fragment produced by `make_fragments` passes `can_fill` on the same
//! slot.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::fragment::{
    CreatureFragment, Fragment, HumanFragment, HumanTraits, RaceKey, Sex, SexSet, Status,
};

bitflags! {
    /// Extra traits a role declares beyond race and sex.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Extra: u8 {
        const SUBMISSIVE  = 1 << 0;
        const OPTIONAL    = 1 << 1;
        const VAMPIRE     = 1 << 2;
        const UNCONSCIOUS = 1 << 3;
        const ARMBINDER   = 1 << 4;
        const YOKE        = 1 << 5;
        const LEGBINDER   = 1 << 6;
        const PETSUIT     = 1 << 7;
    }
}

impl Extra {
    /// Status traits an actor must carry to fill the role.
    pub fn status(self) -> Status {
        let mut status = Status::empty();
        if self.contains(Extra::SUBMISSIVE) {
            status |= Status::SUBMISSIVE;
        }
        if self.contains(Extra::UNCONSCIOUS) {
            status |= Status::UNCONSCIOUS;
        }
        status
    }

    /// Restraint traits a human must carry, exactly.
    pub fn restraints(self) -> HumanTraits {
        let mut traits = HumanTraits::empty();
        if self.contains(Extra::ARMBINDER) {
            traits |= HumanTraits::ARMBINDER;
        }
        if self.contains(Extra::YOKE) {
            traits |= HumanTraits::YOKE;
        }
        if self.contains(Extra::LEGBINDER) {
            traits |= HumanTraits::LEGS_BOUND;
        }
        if self.contains(Extra::PETSUIT) {
            traits |= HumanTraits::PETSUIT;
        }
        traits
    }
}

/// A role a scene needs filled.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RequirementSlot {
    pub race: RaceKey,
    pub sex: SexSet,
    pub extra: Extra,
    /// Display scale applied to the actor placed in this role.
    pub scale: f32,
}

impl RequirementSlot {
    pub fn new(race: RaceKey, sex: SexSet, extra: Extra) -> Self {
        Self {
            race,
            sex,
            extra,
            scale: 1.0,
        }
    }

    #[inline]
    pub fn is_human(&self) -> bool {
        self.race.is_human()
    }

    #[inline]
    pub fn is_submissive(&self) -> bool {
        self.extra.contains(Extra::SUBMISSIVE)
    }

    #[inline]
    pub fn is_optional(&self) -> bool {
        self.extra.contains(Extra::OPTIONAL)
    }

    #[inline]
    pub fn is_vampire(&self) -> bool {
        self.extra.contains(Extra::VAMPIRE)
    }

    #[inline]
    pub fn is_unconscious(&self) -> bool {
        self.extra.contains(Extra::UNCONSCIOUS)
    }

    /// Whether an actor observed as `fragment` may take this role.
    ///
    /// Every category must match; the first mismatch returns `false`.
    pub fn can_fill(&self, fragment: &Fragment) -> bool {
        match fragment {
            Fragment::Empty => self.is_optional(),
            Fragment::Human(h) => {
                if !self.is_human() || !self.accepts_common(h.sex, h.status) {
                    return false;
                }
                if self.is_vampire() && !h.traits.contains(HumanTraits::VAMPIRE) {
                    return false;
                }
                h.traits & HumanTraits::RESTRAINTS == self.extra.restraints()
            }
            Fragment::Creature(c) => {
                !self.is_human()
                    && self.accepts_common(c.sex, c.status)
                    && self.race.accepts(c.race)
            }
        }
    }

    /// Like [`can_fill`](Self::can_fill), retrying with the submissive flag
    /// set when the plain fragment does not fit.
    pub fn can_fill_either(&self, fragment: &Fragment) -> bool {
        self.can_fill(fragment) || self.can_fill(&fragment.with_status(Status::SUBMISSIVE))
    }

    /// Whether an actor suited to `other` is also suited to this role.
    ///
    /// Races must be equal and the sexes overlap; this role's extras must
    /// include all of `other`'s, ignoring optionality.
    pub fn can_fill_slot(&self, other: &RequirementSlot) -> bool {
        let required = other.extra - Extra::OPTIONAL;
        self.race == other.race && self.sex.intersects(other.sex) && self.extra.contains(required)
    }

    fn accepts_common(&self, sex: Sex, status: Status) -> bool {
        self.sex.contains(sex.as_set()) && status == self.extra.status()
    }

    /// Enumerate every fragment this slot accepts.
    ///
    /// The order is stable: sexes in [`Sex::ALL`] order, then for each of
    /// them the trait or species variants, then [`Fragment::Empty`] last if
    /// the role is optional.
    pub fn make_fragments(&self) -> Vec<Fragment> {
        let status = self.extra.status();
        let sexes = Sex::ALL.into_iter().filter(|s| self.sex.contains(s.as_set()));

        let mut fragments: Vec<Fragment> = if self.is_human() {
            let restraints = self.extra.restraints();
            let vampire_variants: &[bool] = if self.is_vampire() {
                &[true]
            } else {
                &[false, true]
            };
            sexes
                .flat_map(|sex| {
                    vampire_variants.iter().map(move |&vampire| {
                        let mut traits = restraints;
                        traits.set(HumanTraits::VAMPIRE, vampire);
                        Fragment::Human(HumanFragment {
                            sex,
                            traits,
                            status,
                        })
                    })
                })
                .collect()
        } else {
            let race = self.race;
            sexes
                .flat_map(|sex| {
                    race.variants().iter().map(move |&variant| {
                        Fragment::Creature(CreatureFragment {
                            race: variant,
                            sex,
                            status,
                        })
                    })
                })
                .collect()
        };

        if self.is_optional() {
            fragments.push(Fragment::Empty);
        }
        fragments
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
