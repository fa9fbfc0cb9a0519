//! Fuzz target for image deserialization and in-place adoption.
//!
//! Loading is the only place the crate handles untrusted bytes; every
//! outcome must be a clean `Result`, never a panic, hang, or out-of-bounds
//! access in the accept queries afterwards.
//!
//! # Running
//!
//! ```bash
//! cargo install cargo-fuzz
//! cargo +nightly fuzz run fuzz_load_image
//! cargo +nightly fuzz run fuzz_load_image -- -max_len=65536
//! ```

#![no_main]

use libfuzzer_sys::fuzz_target;
use multiscan::{Absolute, Offset, Scanner, State};

/// Cap validation cost per input so the fuzzer stays fast.
const MAX_INPUT: usize = 1 << 16;

fuzz_target!(|data: &[u8]| {
    if data.len() > MAX_INPUT {
        return;
    }

    if let Ok(s) = Scanner::<Offset>::load(&mut &data[..]) {
        exercise(&s);
    }
    if let Ok(s) = Scanner::<Absolute>::load(&mut &data[..]) {
        exercise(&s);
    }

    // Word-aligned copy for the adoption path.
    let mut words = vec![0usize; data.len().div_ceil(core::mem::size_of::<usize>())];
    let storage = unsafe {
        core::slice::from_raw_parts_mut(
            words.as_mut_ptr() as *mut u8,
            words.len() * core::mem::size_of::<usize>(),
        )
    };
    storage[..data.len()].copy_from_slice(data);
    if let Ok((view, _tail)) = Scanner::<Offset>::mmap(&storage[..data.len()]) {
        exercise(&view);
    }
});

/// A validated image must be safe to drive with arbitrary input.
fn exercise<R: multiscan::Relocation>(s: &Scanner<'_, R>) {
    let mut st = State::default();
    s.initialize(&mut st);
    st = s.run(st, b"fuzz probe \x00\xff\x80 input");
    let _ = s.is_final(&st);
    let _ = s.is_dead(&st);
    let _ = s.accepted_regexps(&st);
    for i in 0..s.size().min(64) {
        let st = s.index_to_state(i);
        let _ = s.accepted_regexps(&st);
    }
}
