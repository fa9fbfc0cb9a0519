//! Agglutination: running two scanners in a single pass.
//!
//! The glued scanner is the reachable product of the two state spaces over
//! a joint byte partition. Regexp IDs keep their disjoint meaning: the
//! second scanner's IDs are shifted by the first's regexp count, and a
//! product state accepts the union of what its components accept.
//!
//! Products can blow up quadratically; callers pass `max_size` to bound
//! construction, and an overflowing glue yields the empty scanner rather
//! than an error (inspect with [`Scanner::empty`]).

use ahash::AHashMap;

use crate::dfa::Partition;
use crate::relocation::Relocation;
use crate::row::{FLAG_DEAD, FLAG_FINAL};

use super::builder::ImageBuilder;
use super::{Scanner, State};

impl<'a, R: Relocation> Scanner<'a, R> {
    /// Builds a scanner equivalent to running `a` and `b` side by side.
    ///
    /// With `max_size > 0`, a product exceeding that many states aborts
    /// and returns the empty scanner. Gluing with an empty scanner yields
    /// a copy of the other operand.
    pub fn glue(a: &Scanner<'_, R>, b: &Scanner<'_, R>, max_size: usize) -> Scanner<'static, R> {
        if a.empty() {
            return b.to_relocation::<R>();
        }
        if b.empty() {
            return a.to_relocation::<R>();
        }

        // Joint partition: bytes equivalent only if both scanners agree.
        let letters = Partition::group_by(|byte| {
            (
                a.letters()[byte as usize],
                b.letters()[byte as usize],
            )
        });
        let reps: Vec<u8> = letters.representatives().collect();

        // Breadth-first discovery of reachable product states.
        let mut index: AHashMap<(usize, usize), usize> = AHashMap::new();
        let mut pairs: Vec<(State, State)> = Vec::new();
        let start = (a.initial(), b.initial());
        index.insert((a.state_index(&start.0), b.state_index(&start.1)), 0);
        pairs.push(start);
        let mut at = 0;
        while at < pairs.len() {
            let (sa, sb) = pairs[at];
            at += 1;
            for &rep in &reps {
                let (mut na, mut nb) = (sa, sb);
                a.step(&mut na, rep);
                b.step(&mut nb, rep);
                let key = (a.state_index(&na), b.state_index(&nb));
                if !index.contains_key(&key) {
                    if max_size > 0 && pairs.len() >= max_size {
                        return Scanner::default();
                    }
                    index.insert(key, pairs.len());
                    pairs.push((na, nb));
                }
            }
        }

        // Accepted-ID lists and the exact final-table length up front.
        let shift = a.regexps_count();
        let mut lists: Vec<Vec<usize>> = Vec::with_capacity(pairs.len());
        let mut final_entries = pairs.len();
        for &(sa, sb) in &pairs {
            let mut ids: Vec<usize> = a.accepted_regexps(&sa).to_vec();
            ids.extend(b.accepted_regexps(&sb).iter().map(|id| id + shift));
            final_entries += ids.len();
            lists.push(ids);
        }

        let mut builder = ImageBuilder::<R>::init(
            pairs.len(),
            &letters,
            final_entries,
            0,
            a.regexps_count() + b.regexps_count(),
        );
        for (i, &(sa, sb)) in pairs.iter().enumerate() {
            for &rep in &reps {
                let (mut na, mut nb) = (sa, sb);
                a.step(&mut na, rep);
                b.step(&mut nb, rep);
                let dst = index[&(a.state_index(&na), b.state_index(&nb))];
                builder.set_transition(i, rep, dst);
            }
            let mut flags = 0;
            if a.is_final(&sa) || b.is_final(&sb) {
                flags |= FLAG_FINAL;
            }
            if a.is_dead(&sa) && b.is_dead(&sb) {
                flags |= FLAG_DEAD;
            }
            builder.set_flags(i, flags);
        }
        for ids in &lists {
            builder.push_final_list(ids);
        }
        builder.seal()
    }
}
