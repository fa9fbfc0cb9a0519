//! Property-based soundness tests for scanner images.
//!
//! Run with: `cargo test --test property`

mod image_roundtrip;
mod run_equivalence;

use multiscan::Dfa;
use proptest::prelude::*;

/// Bytes below this bound get randomized transitions; everything else
/// keeps the default self-loop, so letter partitions stay small and the
/// generated automata still exercise class folding.
pub(crate) const ALPHABET: usize = 6;

/// Arbitrary small DFA: random transitions over the low alphabet, random
/// finals, random initial state.
pub(crate) fn arb_dfa() -> impl Strategy<Value = Dfa> {
    (1usize..6).prop_flat_map(|states| {
        (
            proptest::collection::vec(0..states as u32, states * ALPHABET),
            proptest::collection::vec(any::<bool>(), states),
            0..states as u32,
        )
            .prop_map(move |(targets, finals, initial)| {
                let mut dfa = Dfa::new(states, initial);
                for s in 0..states {
                    for b in 0..ALPHABET {
                        dfa.set_transition(s as u32, b as u8, targets[s * ALPHABET + b]);
                    }
                }
                for (s, &f) in finals.iter().enumerate() {
                    if f {
                        dfa.mark_final(s as u32);
                    }
                }
                dfa
            })
    })
}

/// Arbitrary input: mostly alphabet bytes, some outside it, varied length
/// so the run loop crosses its head/body/tail phase boundaries.
pub(crate) fn arb_input() -> impl Strategy<Value = Vec<u8>> {
    proptest::collection::vec(0u8..(ALPHABET as u8 + 3), 0..300)
}
