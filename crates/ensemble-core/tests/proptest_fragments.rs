//! Property tests for the fragment algebra.
//!
//! Arbitrary role templates are generated and every fragment derived from a
//! template must be accepted by that template.

use ensemble_core::prelude::*;
use proptest::prelude::*;

fn race_strategy() -> impl Strategy<Value = RaceKey> {
    prop::sample::select(RaceKey::ALL.to_vec())
}

fn slot_strategy() -> impl Strategy<Value = RequirementSlot> {
    (race_strategy(), 1u8..8, any::<u8>()).prop_map(|(race, sex, extra)| {
        RequirementSlot::new(
            race,
            SexSet::from_bits_truncate(sex),
            Extra::from_bits_truncate(extra),
        )
    })
}

fn sex_strategy() -> impl Strategy<Value = Sex> {
    prop::sample::select(Sex::ALL.to_vec())
}

fn fragment_strategy() -> impl Strategy<Value = Fragment> {
    let creature_races: Vec<RaceKey> = RaceKey::ALL
        .iter()
        .copied()
        .filter(|r| !r.is_human())
        .collect();
    prop_oneof![
        Just(Fragment::Empty),
        (sex_strategy(), 0u8..32, 0u8..4).prop_map(|(sex, traits, status)| {
            Fragment::Human(HumanFragment {
                sex,
                traits: HumanTraits::from_bits_truncate(traits),
                status: Status::from_bits_truncate(status),
            })
        }),
        (prop::sample::select(creature_races), sex_strategy(), 0u8..4).prop_map(
            |(race, sex, status)| {
                Fragment::Creature(CreatureFragment {
                    race,
                    sex,
                    status: Status::from_bits_truncate(status),
                })
            }
        ),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(2_000))]

    #[test]
    fn derived_fragments_fill_their_slot(slot in slot_strategy()) {
        let fragments = slot.make_fragments();
        prop_assert!(!fragments.is_empty());
        for fragment in fragments {
            prop_assert!(slot.can_fill(&fragment), "{:?} rejects {:?}", slot, fragment);
        }
    }

    #[test]
    fn accepted_fragments_are_derivable(slot in slot_strategy(), fragment in fragment_strategy()) {
        // Acceptance and enumeration describe the same set.
        if slot.can_fill(&fragment) {
            prop_assert!(slot.make_fragments().contains(&fragment));
        }
    }

    #[test]
    fn wire_form_is_stable(fragment in fragment_strategy()) {
        prop_assert_eq!(Fragment::from_bits(fragment.to_bits()).unwrap(), fragment);
    }
}
