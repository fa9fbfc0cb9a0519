//! Transition-cell relocation strategies.
//!
//! A transition cell encodes "which row comes next" in one of two ways:
//!
//! - [`Offset`]: a 32-bit signed difference between the source and target
//!   rows, measured in cells. The image is position-independent and may be
//!   adopted in place from a memory mapping; cells are half the width of a
//!   machine word on 64-bit platforms, which also halves the transition
//!   matrix.
//! - [`Absolute`]: a word-sized cell holding the target row's position
//!   outright, so `go` is a plain load with no add. The fastest inner loop,
//!   at twice the matrix size; the mmap adoption path is not offered for it.
//!
//! States are opaque cell offsets into the transition matrix (row starts),
//! so both encodings stay within the image and survive a buffer move; the
//! variants still differ in cell width and in the work `go` performs. Each
//! variant carries a distinct signature embedded in the image header, and a
//! loader for one refuses images of the other.

use crate::align::{VECTOR_BYTES, WORD_BYTES};
use crate::row::HEADER_WORDS;

/// A transition-cell encoding. Implemented by [`Offset`] and [`Absolute`].
pub trait Relocation: Copy + Default + 'static {
    /// Numeric signature stored in the image header.
    const SIGNATURE: usize;

    /// The transition cell type.
    type Cell: Copy + PartialEq + core::fmt::Debug + Default + 'static;

    /// Bytes per transition cell.
    const CELL_BYTES: usize = core::mem::size_of::<Self::Cell>();

    /// Transition cells per vector word; rows are padded to a multiple of
    /// this so every row starts vector-aligned relative to the matrix base.
    const CELLS_PER_VECTOR: usize = VECTOR_BYTES / core::mem::size_of::<Self::Cell>();

    /// Transition cells occupied by the row header.
    const HEADER_CELLS: usize = HEADER_WORDS * WORD_BYTES / core::mem::size_of::<Self::Cell>();

    /// Largest transition matrix (in cells) the cell encoding can span.
    const MAX_MATRIX_CELLS: usize;

    /// Applies a transition cell to a source row offset, yielding the
    /// target row offset (both in cells).
    fn go(state: usize, cell: Self::Cell) -> usize;

    /// Encodes the transition from row offset `from` to row offset `to`.
    fn diff(from: usize, to: usize) -> Self::Cell;
}

/// Signed-difference cells; position-independent, mmap-safe.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Offset;

impl Relocation for Offset {
    const SIGNATURE: usize = 1;

    // 32-bit cells cap the matrix at 4G cells; in exchange the matrix is
    // half the size of word-wide cells on 64-bit platforms.
    type Cell = i32;

    const MAX_MATRIX_CELLS: usize = i32::MAX as usize;

    #[inline(always)]
    fn go(state: usize, cell: i32) -> usize {
        state.wrapping_add(cell as isize as usize)
    }

    #[inline(always)]
    fn diff(from: usize, to: usize) -> i32 {
        let d = to.wrapping_sub(from) as isize;
        debug_assert!(i32::try_from(d).is_ok(), "transition matrix exceeds i32 cell range");
        d as i32
    }
}

/// Word-sized cells holding the target row outright; the fastest `go`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Absolute;

impl Relocation for Absolute {
    const SIGNATURE: usize = 2;

    type Cell = usize;

    const MAX_MATRIX_CELLS: usize = usize::MAX;

    #[inline(always)]
    fn go(_state: usize, cell: usize) -> usize {
        cell
    }

    #[inline(always)]
    fn diff(_from: usize, to: usize) -> usize {
        to
    }
}
