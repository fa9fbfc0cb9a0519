//! Image population from a canonized DFA.
//!
//! The build order is fixed: allocate and mark up, write the letter table,
//! default every row header, let the driver set transitions and flags, emit
//! the final tables in state order, then synthesize shortcut masks and
//! seal. A sealed image is never mutated again.

use crate::dfa::{Dfa, Partition};
use crate::relocation::Relocation;
use crate::row::{broadcast, EXIT_MASK_COUNT, FLAG_DEAD, FLAG_FINAL, NO_EXIT, NO_SHORTCUT};

use super::{Letter, Locals, Scanner, END};

/// Incremental writer over a freshly allocated owned image.
pub(crate) struct ImageBuilder<R: Relocation> {
    img: Scanner<'static, R>,
    /// Cursor into the final table; also the next state's list offset.
    final_end: usize,
    /// States whose final list has been emitted so far.
    finals_done: usize,
}

impl<R: Relocation> ImageBuilder<R> {
    /// Allocates a zeroed image: letter table written, headers defaulted,
    /// transitions and final tables still blank.
    ///
    /// `final_entries` is the exact final-table length: one terminator per
    /// state plus the total number of accepted-regexp IDs.
    pub(crate) fn init(
        states: usize,
        letters: &Partition,
        final_entries: usize,
        start_state: usize,
        regexps_count: usize,
    ) -> Self {
        assert!(states > 0);
        assert!(start_state < states);
        assert!(regexps_count >= 1);
        assert!(final_entries >= states);
        let m = Locals {
            states_count: u32::try_from(states).expect("state count exceeds image limits"),
            letters_count: letters.size() as u32,
            regexps_count: u32::try_from(regexps_count).expect("regexp count exceeds image limits"),
            initial: 0,
            final_table_size: u32::try_from(final_entries).expect("final table exceeds image limits"),
            relocation_signature: R::SIGNATURE,
        };
        let mut img = Scanner::<R>::alloc(m);
        let rw = img.row_width();
        assert!(
            states
                .checked_mul(rw)
                .is_some_and(|cells| cells <= R::MAX_MATRIX_CELLS),
            "transition matrix exceeds the relocation's addressable range"
        );
        img.set_initial_bytes(start_state * rw * R::CELL_BYTES);

        for c in 0..letters.size() {
            for &b in letters.bytes_of(c) {
                img.letters_mut()[b as usize] = (c + R::HEADER_CELLS) as Letter;
            }
        }
        for i in 0..states {
            img.header_at_mut(i * rw).reset();
        }
        Self {
            img,
            final_end: 0,
            finals_done: 0,
        }
    }

    /// Writes the transition for `byte` (and thus for its whole letter
    /// class) from `src` to `dst`, both dense state indices.
    pub(crate) fn set_transition(&mut self, src: usize, byte: u8, dst: usize) {
        let states = self.img.locals().states_count as usize;
        assert!(src < states);
        assert!(dst < states);
        let rw = self.img.row_width();
        let letter = self.img.letters()[byte as usize] as usize;
        self.img.transitions_mut()[src * rw + letter] = R::diff(src * rw, dst * rw);
    }

    /// Sets the state's flag word.
    pub(crate) fn set_flags(&mut self, state: usize, flags: usize) {
        assert!(state < self.img.locals().states_count as usize);
        let rw = self.img.row_width();
        self.img.header_at_mut(state * rw).set_flags(flags);
    }

    /// Emits the accepted-regexp list for the next state in order.
    ///
    /// Lists must arrive ascending and exactly fill the final table by the
    /// time every state has one.
    pub(crate) fn push_final_list(&mut self, ids: &[usize]) {
        let state = self.finals_done;
        assert!(state < self.img.locals().states_count as usize);
        debug_assert!(ids.windows(2).all(|w| w[0] < w[1]));
        let begin = self.final_end;
        self.img.final_index_mut()[state] = begin;
        let table = self.img.final_table_mut();
        for (slot, &id) in table[begin..begin + ids.len()].iter_mut().zip(ids) {
            *slot = id;
        }
        table[begin + ids.len()] = END;
        self.final_end = begin + ids.len() + 1;
        self.finals_done += 1;
    }

    /// Emits single-regexp final lists from the flags set so far: `[0]`
    /// for final states, empty otherwise.
    pub(crate) fn finish_build(&mut self) {
        let states = self.img.locals().states_count as usize;
        let rw = self.img.row_width();
        for state in self.finals_done..states {
            if self.img.header_at(state * rw).flags() & FLAG_FINAL != 0 {
                self.push_final_list(&[0]);
            } else {
                self.push_final_list(&[]);
            }
        }
    }

    /// Synthesizes shortcut masks, checks completeness, and returns the
    /// sealed image.
    pub(crate) fn seal(mut self) -> Scanner<'static, R> {
        assert_eq!(
            self.finals_done,
            self.img.locals().states_count as usize,
            "every state needs a final list before sealing"
        );
        assert_eq!(
            self.final_end, self.img.locals().final_table_size as usize,
            "final table not exactly filled"
        );
        self.build_shortcuts();
        self.img
    }

    /// For each state, finds the set of bytes leaving it. States with at
    /// most [`EXIT_MASK_COUNT`] such bytes get them broadcast into their
    /// exit masks; states with none get [`NO_EXIT`]; everyone else gets
    /// [`NO_SHORTCUT`]. Unused slots duplicate the last real mask so a
    /// slot-equality check can tell how many are real.
    fn build_shortcuts(&mut self) {
        let states = self.img.locals().states_count as usize;
        let letters_count = self.img.locals().letters_count as usize;
        let rw = self.img.row_width();

        // Invert the letter table: bytes per row-cell index.
        let mut bytes_of: Vec<Vec<u8>> = vec![Vec::new(); R::HEADER_CELLS + letters_count];
        for b in 0..=255u8 {
            let letter = self.img.letters()[b as usize] as usize;
            bytes_of[letter].push(b);
        }

        for i in 0..states {
            let row = i * rw;
            let mut ind = 0;
            let mut last_mask = NO_EXIT;
            let mut overflowed = false;
            for (letter, bytes) in bytes_of.iter().enumerate().skip(R::HEADER_CELLS) {
                let cell = self.img.transitions()[row + letter];
                if R::go(row, cell) == row {
                    continue;
                }
                if ind + bytes.len() > EXIT_MASK_COUNT {
                    overflowed = true;
                    break;
                }
                for &b in bytes {
                    last_mask = broadcast(b);
                    self.img.header_at_mut(row).set_mask(ind, last_mask);
                    ind += 1;
                }
            }
            if overflowed {
                last_mask = NO_SHORTCUT;
                ind = 0;
            }
            while ind < EXIT_MASK_COUNT {
                self.img.header_at_mut(row).set_mask(ind, last_mask);
                ind += 1;
            }
        }
    }
}

impl<R: Relocation> Scanner<'static, R> {
    /// Builds a scanner from a canonized DFA: derives the byte partition
    /// and the dead set, writes every transition, and seals the image.
    pub fn new(dfa: &Dfa) -> Self {
        let (letters, dead) = dfa.canonize();
        let states = dfa.size();
        let mut builder = ImageBuilder::<R>::init(
            states,
            &letters,
            dfa.finals_count() + states,
            dfa.initial() as usize,
            1,
        );
        let reps: Vec<u8> = letters.representatives().collect();
        for s in 0..states as u32 {
            for &rep in &reps {
                builder.set_transition(s as usize, rep, dfa.next(s, rep) as usize);
            }
            let mut flags = 0;
            if dfa.is_final(s) {
                flags |= FLAG_FINAL;
            }
            if dead[s as usize] {
                flags |= FLAG_DEAD;
            }
            builder.set_flags(s as usize, flags);
        }
        builder.finish_build();
        builder.seal()
    }
}
