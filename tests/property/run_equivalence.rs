//! The aligned run loop must be indistinguishable from byte stepping.

use multiscan::{Absolute, Offset, Relocation, Scanner, State};
use proptest::prelude::*;

use crate::{arb_dfa, arb_input};

fn by_steps<R: Relocation>(s: &Scanner<'_, R>, mut st: State, bytes: &[u8]) -> State {
    for &b in bytes {
        s.step(&mut st, b);
    }
    st
}

proptest! {
    #[test]
    fn run_equals_stepping(dfa in arb_dfa(), input in arb_input(), skew in 0usize..16) {
        let s = Scanner::<Offset>::new(&dfa);
        // Skew the slice start so the head/tail phases see every word
        // alignment the allocator can produce.
        let padded: Vec<u8> = std::iter::repeat(0u8).take(skew).chain(input.iter().copied()).collect();
        let slice = &padded[skew.min(padded.len())..];
        let init = s.initial();
        prop_assert_eq!(s.run(init, slice), by_steps(&s, init, slice));
    }

    #[test]
    fn run_equals_stepping_absolute(dfa in arb_dfa(), input in arb_input()) {
        let s = Scanner::<Absolute>::new(&dfa);
        let init = s.initial();
        prop_assert_eq!(s.run(init, &input), by_steps(&s, init, &input));
    }

    #[test]
    fn run_is_associative(dfa in arb_dfa(), input in arb_input(), cut in 0usize..300) {
        let s = Scanner::<Offset>::new(&dfa);
        let cut = cut.min(input.len());
        let init = s.initial();
        let whole = s.run(init, &input);
        let mid = s.run(init, &input[..cut]);
        prop_assert_eq!(s.run(mid, &input[cut..]), whole);
    }

    #[test]
    fn accept_queries_agree_across_relocations(dfa in arb_dfa(), input in arb_input()) {
        let fast = Scanner::<Absolute>::new(&dfa);
        let reloc = Scanner::<Offset>::new(&dfa);
        let a = fast.run(fast.initial(), &input);
        let b = reloc.run(reloc.initial(), &input);
        prop_assert_eq!(fast.state_index(&a), reloc.state_index(&b));
        prop_assert_eq!(fast.is_final(&a), reloc.is_final(&b));
        prop_assert_eq!(fast.is_dead(&a), reloc.is_dead(&b));
        prop_assert_eq!(fast.accepted_regexps(&a), reloc.accepted_regexps(&b));
    }

    #[test]
    fn dead_states_never_move(dfa in arb_dfa(), input in arb_input()) {
        let s = Scanner::<Offset>::new(&dfa);
        let st = s.run(s.initial(), &input);
        if s.is_dead(&st) {
            let mut moved = st;
            for b in 0..=255u8 {
                s.step(&mut moved, b);
                prop_assert_eq!(moved, st);
            }
        }
    }
}
