//! The aligned run driver.
//!
//! Consumes input in three phases: a byte-at-a-time head up to word
//! alignment, a vector-word-aligned body, and a word/byte tail. Inside the
//! body the driver switches between three modes based on the current row's
//! first exit mask:
//!
//! - `NO_EXIT`: the state loops on every byte; nothing downstream can
//!   change it, so the run returns immediately.
//! - `NO_SHORTCUT`: chunked stepping — each vector word is split into its
//!   machine words and each word's bytes are fed to the stepper low to
//!   high, straight-line per chunk.
//! - otherwise: shortcut skipping — scan whole vector words for any byte
//!   equal to one of the state's exit bytes, using the vector-aligned
//!   duplicated-mask reads, and only resume stepping at the first hit.
//!
//! Counters for the body's behavior are compiled in under the `run-stats`
//! feature and are zero-cost otherwise.

use crate::align::{VectorWord, WORD_BYTES, WORDS_PER_VECTOR};
use crate::relocation::Relocation;
use crate::row::{word_has_byte, NO_EXIT, NO_SHORTCUT};

use super::{Scanner, State};

/// Counters describing what the aligned body did during a run.
#[cfg(feature = "run-stats")]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Vector words examined by shortcut skipping.
    pub mask_checks: u64,
    /// Machine words consumed by chunked stepping.
    pub words_stepped: u64,
    /// Times the body entered shortcut skipping.
    pub shortcut_runs: u64,
    /// Runs cut short by a `NO_EXIT` state.
    pub early_exits: u64,
}

#[cfg(not(feature = "run-stats"))]
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct RunStats;

impl RunStats {
    #[inline(always)]
    fn note_mask_check(&mut self) {
        #[cfg(feature = "run-stats")]
        {
            self.mask_checks = self.mask_checks.saturating_add(1);
        }
    }

    #[inline(always)]
    fn note_words_stepped(&mut self, _n: u64) {
        #[cfg(feature = "run-stats")]
        {
            self.words_stepped = self.words_stepped.saturating_add(_n);
        }
    }

    #[inline(always)]
    fn note_shortcut_run(&mut self) {
        #[cfg(feature = "run-stats")]
        {
            self.shortcut_runs = self.shortcut_runs.saturating_add(1);
        }
    }

    #[inline(always)]
    fn note_early_exit(&mut self) {
        #[cfg(feature = "run-stats")]
        {
            self.early_exits = self.early_exits.saturating_add(1);
        }
    }
}

impl<'a, R: Relocation> Scanner<'a, R> {
    /// Consumes every byte of `bytes` in order and returns the resulting
    /// state. Equivalent to stepping byte by byte, at vector speed.
    pub fn run(&self, state: State, bytes: &[u8]) -> State {
        let mut stats = RunStats::default();
        self.run_impl(state, bytes, &mut stats)
    }

    /// [`Self::run`] with body counters, for profiling and tests.
    #[cfg(feature = "run-stats")]
    pub fn run_with_stats(&self, state: State, bytes: &[u8]) -> (State, RunStats) {
        let mut stats = RunStats::default();
        let state = self.run_impl(state, bytes, &mut stats);
        (state, stats)
    }

    fn run_impl(&self, state: State, bytes: &[u8], stats: &mut RunStats) -> State {
        if !self.is_valid_state(state.0) || bytes.is_empty() {
            return state;
        }
        let mut s = state.0;
        if self.mask0(s) == NO_EXIT {
            stats.note_early_exit();
            return state;
        }
        // Safety: usize has no invalid bit patterns; align_to only
        // reinterprets the aligned middle.
        let (head, words, tail) = unsafe { bytes.align_to::<usize>() };
        for &b in head {
            s = self.next_state(s, b);
        }
        s = self.run_aligned(s, words, stats);
        for &b in tail {
            s = self.next_state(s, b);
        }
        State(s)
    }

    /// The word-aligned driver: body phases over `words`.
    fn run_aligned(&self, mut s: usize, words: &[usize], stats: &mut RunStats) -> usize {
        if words.is_empty() || self.mask0(s) == NO_EXIT {
            return s;
        }
        // Safety: VectorWord is plain machine words; align_to only
        // reinterprets the 16-byte-aligned middle.
        let (head, vectors, tail) = unsafe { words.align_to::<VectorWord>() };
        for &w in head {
            s = self.step_word(s, w);
        }
        stats.note_words_stepped(head.len() as u64);

        if !vectors.is_empty() {
            if self.mask0(s) == NO_EXIT {
                stats.note_early_exit();
                return s;
            }
            let mut no_shortcut = self.mask0(s) == NO_SHORTCUT;
            let mut i = 0;
            loop {
                while no_shortcut && i != vectors.len() {
                    s = self.step_vector(s, &vectors[i]);
                    i += 1;
                    stats.note_words_stepped(WORDS_PER_VECTOR as u64);
                    no_shortcut = self.mask0(s) == NO_SHORTCUT;
                }
                if i == vectors.len() {
                    break;
                }
                if self.mask0(s) == NO_EXIT {
                    stats.note_early_exit();
                    return s;
                }
                stats.note_shortcut_run();
                i = self.skip_vectors(s, vectors, i, stats);
                // Step through the vector that contained an exit byte to
                // resynchronize, then re-evaluate the new state's mask.
                no_shortcut = true;
            }
        }

        for &w in tail {
            s = self.step_word(s, w);
        }
        stats.note_words_stepped(tail.len() as u64);
        s
    }

    /// First exit mask of the row at cell offset `s`, as a scalar.
    #[inline(always)]
    fn mask0(&self, s: usize) -> usize {
        self.header_at(s).mask(0)
    }

    /// Feeds one machine word's bytes, low to high, to the stepper.
    /// The byte count is compile-time known, so this is straight-line
    /// after inlining.
    #[inline(always)]
    fn step_word(&self, mut s: usize, word: usize) -> usize {
        let mut chunk = usize::from_le(word);
        for _ in 0..WORD_BYTES {
            s = self.next_state(s, (chunk & 0xff) as u8);
            chunk >>= 8;
        }
        s
    }

    /// Chunked stepping over one vector word.
    #[inline(always)]
    fn step_vector(&self, mut s: usize, chunk: &VectorWord) -> usize {
        for &w in &chunk.words {
            s = self.step_word(s, w);
        }
        s
    }

    /// Shortcut skipping: advances over `vectors[i..]` while no byte of the
    /// chunk matches any of the state's exit masks; returns the index of
    /// the first vector word with a hit (or `vectors.len()`).
    fn skip_vectors(
        &self,
        s: usize,
        vectors: &[VectorWord],
        mut i: usize,
        stats: &mut RunStats,
    ) -> usize {
        let hdr = self.header_at(s);
        let align_offset = self.mask_align_offset();
        // Spare slots duplicate the last real mask, so slot equality tells
        // how many masks are live.
        let two_masks = hdr.mask(0) != hdr.mask(1);
        let m0 = hdr.mask_vector(0, align_offset);
        let m1 = hdr.mask_vector(1, align_offset);
        while i != vectors.len() {
            stats.note_mask_check();
            let chunk = &vectors[i];
            let mut hit = vector_has_any(chunk, m0);
            if two_masks {
                hit |= vector_has_any(chunk, m1);
            }
            if hit {
                break;
            }
            i += 1;
        }
        i
    }
}

/// True when any byte lane of `chunk` equals the broadcast byte of `mask`
/// (a vector-aligned duplicated-mask slice).
#[inline(always)]
fn vector_has_any(chunk: &VectorWord, mask: &[usize]) -> bool {
    debug_assert_eq!(mask.len(), WORDS_PER_VECTOR);
    let mut hit = false;
    for j in 0..WORDS_PER_VECTOR {
        hit |= word_has_byte(chunk.words[j], mask[j]);
    }
    hit
}
