//! Framed image format: save, load, and in-place mmap adoption.
//!
//! # Stream layout
//! Streams are expected to start word-aligned; all padding is relative to
//! the stream start.
//! - frame: magic (4) || version (u32) || `Locals` size (u32)
//! - `Locals`: states (u32) || letters (u32) || regexps (u32) ||
//!   initial byte offset (u64) || final-table size (u32) ||
//!   relocation signature (u64)
//! - zero padding to word alignment
//! - `Settings`: exit-mask count (u64) || row-header size (u64)
//! - zero padding to word alignment
//! - image buffer, exactly `buf_size()` bytes
//! - zero padding to word alignment
//!
//! Integers are native-endian: the image body is live machine data, not an
//! interchange format. A foreign-endian or foreign-word-size stream fails
//! the frame check; an image built with different mask-layout constants
//! fails the `Settings` compare; an image of the other relocation variant
//! fails the signature check.
//!
//! Adoption in place (`mmap`) is offered for the `Offset` variant only —
//! its cells are the relocatable encoding. `load` deep-copies and works
//! for both variants. Both paths run full structural validation before
//! returning, so the hot loop never re-checks.

use std::io;

use crate::align::{align_up, is_aligned, WORD_BYTES};
use crate::errors::LoadError;
use crate::relocation::{Offset, Relocation};
use crate::row::{RowHeader, EXIT_MASK_COUNT};

use super::{Locals, Scanner};

const IMAGE_MAGIC: [u8; 4] = *b"MSCN";
const IMAGE_VERSION: u32 = 1;
const FRAME_BYTES: usize = 12;
const LOCALS_BYTES: usize = 32;
const SETTINGS_BYTES: usize = 16;

/// Conservative ceiling on a loadable image, against hostile headers.
const MAX_IMAGE_BYTES: usize = 1 << 31;

fn encode_frame() -> [u8; FRAME_BYTES] {
    let mut out = [0u8; FRAME_BYTES];
    out[0..4].copy_from_slice(&IMAGE_MAGIC);
    out[4..8].copy_from_slice(&IMAGE_VERSION.to_ne_bytes());
    out[8..12].copy_from_slice(&(LOCALS_BYTES as u32).to_ne_bytes());
    out
}

fn check_frame(bytes: &[u8; FRAME_BYTES]) -> Result<(), LoadError> {
    if bytes[0..4] != IMAGE_MAGIC {
        return Err(LoadError::BadHeader);
    }
    let version = u32::from_ne_bytes(bytes[4..8].try_into().unwrap());
    let locals_size = u32::from_ne_bytes(bytes[8..12].try_into().unwrap());
    if version != IMAGE_VERSION || locals_size as usize != LOCALS_BYTES {
        return Err(LoadError::BadHeader);
    }
    Ok(())
}

impl Locals {
    fn encode(&self) -> [u8; LOCALS_BYTES] {
        let mut out = [0u8; LOCALS_BYTES];
        out[0..4].copy_from_slice(&self.states_count.to_ne_bytes());
        out[4..8].copy_from_slice(&self.letters_count.to_ne_bytes());
        out[8..12].copy_from_slice(&self.regexps_count.to_ne_bytes());
        out[12..20].copy_from_slice(&(self.initial as u64).to_ne_bytes());
        out[20..24].copy_from_slice(&self.final_table_size.to_ne_bytes());
        out[24..32].copy_from_slice(&(self.relocation_signature as u64).to_ne_bytes());
        out
    }

    fn decode(bytes: &[u8; LOCALS_BYTES]) -> Result<Self, LoadError> {
        let word = |range: core::ops::Range<usize>| -> Result<usize, LoadError> {
            let v = u64::from_ne_bytes(bytes[range].try_into().unwrap());
            usize::try_from(v).map_err(|_| LoadError::corrupt("field exceeds this platform's word"))
        };
        Ok(Self {
            states_count: u32::from_ne_bytes(bytes[0..4].try_into().unwrap()),
            letters_count: u32::from_ne_bytes(bytes[4..8].try_into().unwrap()),
            regexps_count: u32::from_ne_bytes(bytes[8..12].try_into().unwrap()),
            initial: word(12..20)?,
            final_table_size: u32::from_ne_bytes(bytes[20..24].try_into().unwrap()),
            relocation_signature: word(24..32)?,
        })
    }
}

/// Platform-visible layout constants baked into every image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Settings {
    exit_mask_count: usize,
    row_header_size: usize,
}

impl Settings {
    fn expected() -> Self {
        Self {
            exit_mask_count: EXIT_MASK_COUNT,
            row_header_size: core::mem::size_of::<RowHeader>(),
        }
    }

    fn encode(&self) -> [u8; SETTINGS_BYTES] {
        let mut out = [0u8; SETTINGS_BYTES];
        out[0..8].copy_from_slice(&(self.exit_mask_count as u64).to_ne_bytes());
        out[8..16].copy_from_slice(&(self.row_header_size as u64).to_ne_bytes());
        out
    }

    fn decode(bytes: &[u8; SETTINGS_BYTES]) -> Self {
        Self {
            exit_mask_count: u64::from_ne_bytes(bytes[0..8].try_into().unwrap()) as usize,
            row_header_size: u64::from_ne_bytes(bytes[8..16].try_into().unwrap()) as usize,
        }
    }
}

fn write_padding<W: io::Write>(w: &mut W, pos: &mut usize) -> io::Result<()> {
    let target = align_up(*pos, WORD_BYTES);
    if target > *pos {
        w.write_all(&[0u8; WORD_BYTES][..target - *pos])?;
        *pos = target;
    }
    Ok(())
}

fn skip_padding<Rd: io::Read>(r: &mut Rd, pos: &mut usize) -> Result<(), LoadError> {
    let target = align_up(*pos, WORD_BYTES);
    if target > *pos {
        let mut scratch = [0u8; WORD_BYTES];
        r.read_exact(&mut scratch[..target - *pos])?;
        *pos = target;
    }
    Ok(())
}

impl<'a, R: Relocation> Scanner<'a, R> {
    /// Serializes the image to `w` in the framed format above.
    pub fn save<W: io::Write>(&self, w: &mut W) -> io::Result<()> {
        let mut pos = 0usize;
        w.write_all(&encode_frame())?;
        pos += FRAME_BYTES;
        w.write_all(&self.locals().encode())?;
        pos += LOCALS_BYTES;
        write_padding(w, &mut pos)?;
        w.write_all(&Settings::expected().encode())?;
        pos += SETTINGS_BYTES;
        write_padding(w, &mut pos)?;
        if self.empty() {
            // The empty scanner still frames a zeroed letter table so the
            // stream round-trips through the common path.
            w.write_all(&vec![0u8; self.buf_size()])?;
        } else {
            w.write_all(self.image_bytes())?;
        }
        pos += self.buf_size();
        write_padding(w, &mut pos)?;
        Ok(())
    }

    /// Deserializes an image from `r` into an owned, validated scanner.
    pub fn load<Rd: io::Read>(r: &mut Rd) -> Result<Scanner<'static, R>, LoadError> {
        let mut pos = 0usize;
        let mut frame = [0u8; FRAME_BYTES];
        r.read_exact(&mut frame)?;
        pos += FRAME_BYTES;
        check_frame(&frame)?;

        let mut locals = [0u8; LOCALS_BYTES];
        r.read_exact(&mut locals)?;
        pos += LOCALS_BYTES;
        let m = Locals::decode(&locals)?;
        if m.relocation_signature != R::SIGNATURE {
            return Err(LoadError::SignatureMismatch {
                expected: R::SIGNATURE,
                actual: m.relocation_signature,
            });
        }
        skip_padding(r, &mut pos)?;

        let mut settings = [0u8; SETTINGS_BYTES];
        r.read_exact(&mut settings)?;
        pos += SETTINGS_BYTES;
        if Settings::decode(&settings) != Settings::expected() {
            return Err(LoadError::PlatformMismatch);
        }
        skip_padding(r, &mut pos)?;

        let size = Scanner::<'static, R>::buf_size_for(&m)
            .ok_or(LoadError::corrupt("geometry overflow"))?;
        if size > MAX_IMAGE_BYTES {
            return Err(LoadError::corrupt("image exceeds the size ceiling"));
        }
        let mut img = Scanner::<'static, R>::alloc(m);
        r.read_exact(img.image_bytes_mut(size))?;
        img.validate()?;
        Ok(img)
    }

    fn image_bytes(&self) -> &[u8] {
        self.region(0, self.buf_size())
    }

    fn image_bytes_mut(&mut self, len: usize) -> &mut [u8] {
        self.region_mut(0, len)
    }
}

impl<'a> Scanner<'a, Offset> {
    /// Adopts a saved image in place, without copying: the returned
    /// scanner aliases `bytes`, and the second element is the word-aligned
    /// unconsumed tail.
    ///
    /// Only the `Offset` variant stores relocatable cells, so only it
    /// offers this; `Absolute` images go through [`Scanner::load`].
    pub fn mmap(bytes: &'a [u8]) -> Result<(Scanner<'a, Offset>, &'a [u8]), LoadError> {
        if !is_aligned(bytes.as_ptr(), WORD_BYTES) {
            return Err(LoadError::Misaligned);
        }
        let need = |n: usize| -> Result<(), LoadError> {
            if bytes.len() < n {
                Err(LoadError::ShortImage)
            } else {
                Ok(())
            }
        };
        need(FRAME_BYTES)?;
        check_frame(bytes[..FRAME_BYTES].try_into().unwrap())?;
        let mut pos = FRAME_BYTES;

        need(pos + LOCALS_BYTES)?;
        let m = Locals::decode(bytes[pos..pos + LOCALS_BYTES].try_into().unwrap())?;
        pos = align_up(pos + LOCALS_BYTES, WORD_BYTES);
        if m.relocation_signature != Offset::SIGNATURE {
            return Err(LoadError::SignatureMismatch {
                expected: Offset::SIGNATURE,
                actual: m.relocation_signature,
            });
        }

        need(pos + SETTINGS_BYTES)?;
        if Settings::decode(bytes[pos..pos + SETTINGS_BYTES].try_into().unwrap())
            != Settings::expected()
        {
            return Err(LoadError::PlatformMismatch);
        }
        pos = align_up(pos + SETTINGS_BYTES, WORD_BYTES);

        let size =
            Scanner::<'a, Offset>::buf_size_for(&m).ok_or(LoadError::corrupt("geometry overflow"))?;
        if size > MAX_IMAGE_BYTES {
            return Err(LoadError::corrupt("image exceeds the size ceiling"));
        }
        need(pos.checked_add(size).ok_or(LoadError::ShortImage)?)?;
        let scanner = Scanner::adopt(m, &bytes[pos..pos + size])?;
        let consumed = align_up(pos + size, WORD_BYTES).min(bytes.len());
        Ok((scanner, &bytes[consumed..]))
    }
}
