//! Serialization and conversion must preserve observable behavior.

use multiscan::{Absolute, Offset, Relocation, Scanner};
use proptest::prelude::*;

use crate::{arb_dfa, arb_input};

/// Observable outcome of a run: where it ended and what it accepts.
fn outcome<R: Relocation>(s: &Scanner<'_, R>, input: &[u8]) -> (usize, bool, bool, Vec<usize>) {
    let st = s.run(s.initial(), input);
    (
        s.state_index(&st),
        s.is_final(&st),
        s.is_dead(&st),
        s.accepted_regexps(&st).to_vec(),
    )
}

proptest! {
    #[test]
    fn save_load_preserves_outcomes(dfa in arb_dfa(), input in arb_input()) {
        let s = Scanner::<Offset>::new(&dfa);
        let mut bytes = Vec::new();
        s.save(&mut bytes).unwrap();
        let loaded = Scanner::<Offset>::load(&mut bytes.as_slice()).unwrap();
        prop_assert_eq!(outcome(&s, &input), outcome(&loaded, &input));
    }

    #[test]
    fn save_mmap_preserves_outcomes(dfa in arb_dfa(), input in arb_input()) {
        let s = Scanner::<Offset>::new(&dfa);
        let mut bytes = Vec::new();
        s.save(&mut bytes).unwrap();
        // Word-aligned storage for in-place adoption.
        let mut words = vec![0usize; bytes.len().div_ceil(core::mem::size_of::<usize>())];
        let storage = unsafe {
            core::slice::from_raw_parts_mut(
                words.as_mut_ptr() as *mut u8,
                words.len() * core::mem::size_of::<usize>(),
            )
        };
        storage[..bytes.len()].copy_from_slice(&bytes);
        let (view, _) = Scanner::<Offset>::mmap(&storage[..]).unwrap();
        prop_assert_eq!(outcome(&s, &input), outcome(&view, &input));
    }

    #[test]
    fn relocation_round_trip_preserves_outcomes(dfa in arb_dfa(), input in arb_input()) {
        let fast = Scanner::<Absolute>::new(&dfa);
        let reloc: Scanner<'_, Offset> = fast.to_relocation();
        let back: Scanner<'_, Absolute> = reloc.to_relocation();
        prop_assert_eq!(outcome(&fast, &input), outcome(&reloc, &input));
        prop_assert_eq!(outcome(&fast, &input), outcome(&back, &input));
    }

    #[test]
    fn glue_agrees_with_running_both(a in arb_dfa(), b in arb_dfa(), input in arb_input()) {
        let sa = Scanner::<Offset>::new(&a);
        let sb = Scanner::<Offset>::new(&b);
        let g = Scanner::glue(&sa, &sb, 0);
        prop_assert!(!g.empty());

        let fa = sa.run(sa.initial(), &input);
        let fb = sb.run(sb.initial(), &input);
        let fg = g.run(g.initial(), &input);

        prop_assert_eq!(g.is_final(&fg), sa.is_final(&fa) || sb.is_final(&fb));
        let mut expected: Vec<usize> = sa.accepted_regexps(&fa).to_vec();
        expected.extend(
            sb.accepted_regexps(&fb)
                .iter()
                .map(|id| id + sa.regexps_count()),
        );
        prop_assert_eq!(g.accepted_regexps(&fg).to_vec(), expected);
    }
}
