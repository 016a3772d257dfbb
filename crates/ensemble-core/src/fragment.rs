//! Observed actor state used for role matching.
//!
//! A [`Fragment`] describes one actor as the matching code sees it: sex,
//! race, and a handful of status traits. Humans and creatures carry different
//! trait data, so the two are separate variants rather than one bit range
//! whose meaning depends on a discriminant.
//!
//! The external binding layer that inspects live actors exchanges fragments
//! as an 11-bit vector; [`Fragment::to_bits`] and [`Fragment::from_bits`]
//! convert between the two forms.
//!
//! | bits   | meaning                                                   |
//! |--------|-----------------------------------------------------------|
//! | 0..=1  | male, female (futa = both)                                |
//! | 2      | human discriminant                                        |
//! | 3..=8  | human: vampire, yoke, armbinder, legs bound, petsuit, -   |
//! |        | creature: 6-bit species id                                |
//! | 9      | submissive                                                |
//! | 10     | unconscious                                               |

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Number of meaningful bits in the wire form of a [`Fragment`].
pub const FRAGMENT_BITS: u32 = 11;

const BIT_MALE: u16 = 1 << 0;
const BIT_FEMALE: u16 = 1 << 1;
const BIT_HUMAN: u16 = 1 << 2;
const TRAIT_SHIFT: u16 = 3;
const TRAIT_MASK: u16 = 0b11_1111 << TRAIT_SHIFT;
const BIT_SUBMISSIVE: u16 = 1 << 9;
const BIT_UNCONSCIOUS: u16 = 1 << 10;

// ---------------------------------------------------------------------------
// RaceKey
// ---------------------------------------------------------------------------

macro_rules! race_keys {
    ($($name:ident = $id:literal),+ $(,)?) => {
        /// Race or creature species of an actor or role.
        ///
        /// The numeric value is the byte stored in package files and the
        /// species id packed into a creature fragment.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[repr(u8)]
        pub enum RaceKey {
            $($name = $id),+
        }

        impl RaceKey {
            /// Every known race, in id order.
            pub const ALL: &'static [RaceKey] = &[$(RaceKey::$name),+];

            /// Look up a race by its stored byte.
            pub fn from_u8(value: u8) -> Option<Self> {
                match value {
                    $($id => Some(RaceKey::$name),)+
                    _ => None,
                }
            }

            /// Display name of the race.
            pub fn name(self) -> &'static str {
                match self {
                    $(RaceKey::$name => stringify!($name),)+
                }
            }
        }
    };
}

race_keys! {
    Human = 0,
    Ashhopper = 1,
    Bear = 2,
    Boar = 3,
    BoarMounted = 4,
    BoarSingle = 5,
    Canine = 6,
    Chaurus = 7,
    ChaurusHunter = 8,
    ChaurusReaper = 9,
    Chicken = 10,
    Cow = 11,
    Deer = 12,
    Dog = 13,
    Dragon = 14,
    DragonPriest = 15,
    Draugr = 16,
    DwarvenBallista = 17,
    DwarvenCenturion = 18,
    DwarvenSphere = 19,
    DwarvenSpider = 20,
    Falmer = 21,
    FlameAtronach = 22,
    Fox = 23,
    FrostAtronach = 24,
    Gargoyle = 25,
    Giant = 26,
    GiantSpider = 27,
    Goat = 28,
    Hagraven = 29,
    Hare = 30,
    Horker = 31,
    Horse = 32,
    IceWraith = 33,
    LargeSpider = 34,
    Lurker = 35,
    Mammoth = 36,
    Mudcrab = 37,
    Netch = 38,
    Riekling = 39,
    Sabrecat = 40,
    Seeker = 41,
    Skeever = 42,
    Slaughterfish = 43,
    Spider = 44,
    Spriggan = 45,
    StormAtronach = 46,
    Troll = 47,
    VampireLord = 48,
    Werewolf = 49,
    Wisp = 50,
    Wispmother = 51,
    Wolf = 52,
}

impl RaceKey {
    /// Look up a race by display name, ignoring ASCII case.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|r| r.name().eq_ignore_ascii_case(name))
    }

    /// The stored byte / species id.
    #[inline]
    pub fn id(self) -> u8 {
        self as u8
    }

    #[inline]
    pub fn is_human(self) -> bool {
        self == RaceKey::Human
    }

    /// Concrete species a role of this race is filled by.
    ///
    /// Umbrella races (`Boar`, `Canine`) are never observed on a live actor;
    /// they stand for both of their canonical sub-variants.
    pub fn variants(self) -> &'static [RaceKey] {
        match self {
            RaceKey::Boar => &[RaceKey::BoarMounted, RaceKey::BoarSingle],
            RaceKey::Canine => &[RaceKey::Dog, RaceKey::Wolf],
            RaceKey::Human => &[RaceKey::Human],
            _ => std::slice::from_ref(&RaceKey::ALL[self as usize]),
        }
    }

    /// Whether an actor of species `other` satisfies a role of this race.
    pub fn accepts(self, other: RaceKey) -> bool {
        self.variants().contains(&other)
    }
}

// ---------------------------------------------------------------------------
// Sex
// ---------------------------------------------------------------------------

bitflags! {
    /// Set of sexes a role admits.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct SexSet: u8 {
        const MALE   = 1 << 0;
        const FEMALE = 1 << 1;
        const FUTA   = 1 << 2;
    }
}

/// Sex of an observed actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sex {
    Male,
    Female,
    Futa,
}

impl Sex {
    /// All sexes in canonical enumeration order.
    pub const ALL: [Sex; 3] = [Sex::Male, Sex::Female, Sex::Futa];

    /// The single-member [`SexSet`] for this sex.
    pub fn as_set(self) -> SexSet {
        match self {
            Sex::Male => SexSet::MALE,
            Sex::Female => SexSet::FEMALE,
            Sex::Futa => SexSet::FUTA,
        }
    }

    fn to_bits(self) -> u16 {
        match self {
            Sex::Male => BIT_MALE,
            Sex::Female => BIT_FEMALE,
            Sex::Futa => BIT_MALE | BIT_FEMALE,
        }
    }

    fn from_bits(bits: u16) -> Option<Self> {
        match bits & (BIT_MALE | BIT_FEMALE) {
            BIT_MALE => Some(Sex::Male),
            BIT_FEMALE => Some(Sex::Female),
            b if b == BIT_MALE | BIT_FEMALE => Some(Sex::Futa),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Status / traits
// ---------------------------------------------------------------------------

bitflags! {
    /// Status traits shared by humans and creatures.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Status: u8 {
        const SUBMISSIVE  = 1 << 0;
        const UNCONSCIOUS = 1 << 1;
    }
}

bitflags! {
    /// Human-only sub-traits.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct HumanTraits: u8 {
        const VAMPIRE    = 1 << 0;
        const YOKE       = 1 << 1;
        const ARMBINDER  = 1 << 2;
        const LEGS_BOUND = 1 << 3;
        const PETSUIT    = 1 << 4;

        const HAND_SHACKLE = Self::YOKE.bits() | Self::ARMBINDER.bits();
        const RESTRAINTS = Self::YOKE.bits()
            | Self::ARMBINDER.bits()
            | Self::LEGS_BOUND.bits()
            | Self::PETSUIT.bits();
    }
}

// ---------------------------------------------------------------------------
// Fragment
// ---------------------------------------------------------------------------

/// Matching data for a human actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HumanFragment {
    pub sex: Sex,
    pub traits: HumanTraits,
    pub status: Status,
}

/// Matching data for a creature actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CreatureFragment {
    pub race: RaceKey,
    pub sex: Sex,
    pub status: Status,
}

/// An observed actor state, matched against a role requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Fragment {
    /// No actor. Only optional roles accept it.
    Empty,
    Human(HumanFragment),
    Creature(CreatureFragment),
}

impl Fragment {
    /// A plain human of the given sex.
    pub fn human(sex: Sex) -> Self {
        Fragment::Human(HumanFragment {
            sex,
            traits: HumanTraits::empty(),
            status: Status::empty(),
        })
    }

    /// A creature of the given species and sex.
    ///
    /// Passing [`RaceKey::Human`] produces a human fragment instead.
    pub fn creature(race: RaceKey, sex: Sex) -> Self {
        if race.is_human() {
            return Fragment::human(sex);
        }
        Fragment::Creature(CreatureFragment {
            race,
            sex,
            status: Status::empty(),
        })
    }

    /// Returns a copy with `status` added.
    pub fn with_status(self, status: Status) -> Self {
        match self {
            Fragment::Empty => Fragment::Empty,
            Fragment::Human(mut h) => {
                h.status |= status;
                Fragment::Human(h)
            }
            Fragment::Creature(mut c) => {
                c.status |= status;
                Fragment::Creature(c)
            }
        }
    }

    /// Returns a copy with human `traits` added. Creatures are unaffected.
    pub fn with_traits(self, traits: HumanTraits) -> Self {
        match self {
            Fragment::Human(mut h) => {
                h.traits |= traits;
                Fragment::Human(h)
            }
            other => other,
        }
    }

    pub fn sex(&self) -> Option<Sex> {
        match self {
            Fragment::Empty => None,
            Fragment::Human(h) => Some(h.sex),
            Fragment::Creature(c) => Some(c.sex),
        }
    }

    pub fn status(&self) -> Status {
        match self {
            Fragment::Empty => Status::empty(),
            Fragment::Human(h) => h.status,
            Fragment::Creature(c) => c.status,
        }
    }

    pub fn race(&self) -> Option<RaceKey> {
        match self {
            Fragment::Empty => None,
            Fragment::Human(_) => Some(RaceKey::Human),
            Fragment::Creature(c) => Some(c.race),
        }
    }

    /// The relaxed form used by the solver's fallback pass.
    ///
    /// A female human (not futa) is reinterpreted as male. Every other
    /// fragment has no relaxed form.
    pub fn degendered(&self) -> Option<Fragment> {
        match self {
            Fragment::Human(h) if h.sex == Sex::Female => Some(Fragment::Human(HumanFragment {
                sex: Sex::Male,
                ..*h
            })),
            _ => None,
        }
    }

    /// Encode into the 11-bit wire form.
    pub fn to_bits(&self) -> u16 {
        let status = |s: Status| {
            let mut bits = 0;
            if s.contains(Status::SUBMISSIVE) {
                bits |= BIT_SUBMISSIVE;
            }
            if s.contains(Status::UNCONSCIOUS) {
                bits |= BIT_UNCONSCIOUS;
            }
            bits
        };
        match self {
            Fragment::Empty => 0,
            Fragment::Human(h) => {
                h.sex.to_bits()
                    | BIT_HUMAN
                    | ((h.traits.bits() as u16) << TRAIT_SHIFT)
                    | status(h.status)
            }
            Fragment::Creature(c) => {
                c.sex.to_bits() | ((c.race.id() as u16) << TRAIT_SHIFT) | status(c.status)
            }
        }
    }

    /// Decode the 11-bit wire form.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidFragment`] for bits outside the 11-bit
    /// range, a non-empty fragment without a sex, a human with the reserved
    /// trait bit set, or a creature species id that names no known race.
    pub fn from_bits(bits: u16) -> Result<Self, CoreError> {
        let invalid = |reason: &'static str| CoreError::InvalidFragment { bits, reason };

        if bits >> FRAGMENT_BITS != 0 {
            return Err(invalid("bits above the fragment width are set"));
        }
        if bits == 0 {
            return Ok(Fragment::Empty);
        }

        let sex = Sex::from_bits(bits).ok_or_else(|| invalid("no sex bit set"))?;
        let mut status = Status::empty();
        if bits & BIT_SUBMISSIVE != 0 {
            status |= Status::SUBMISSIVE;
        }
        if bits & BIT_UNCONSCIOUS != 0 {
            status |= Status::UNCONSCIOUS;
        }
        let payload = ((bits & TRAIT_MASK) >> TRAIT_SHIFT) as u8;

        if bits & BIT_HUMAN != 0 {
            let traits = HumanTraits::from_bits(payload)
                .ok_or_else(|| invalid("reserved human trait bit set"))?;
            return Ok(Fragment::Human(HumanFragment {
                sex,
                traits,
                status,
            }));
        }

        let race = RaceKey::from_u8(payload)
            .filter(|r| !r.is_human())
            .ok_or_else(|| invalid("unknown creature species id"))?;
        Ok(Fragment::Creature(CreatureFragment { race, sex, status }))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
