//! 32×32 bit matrices over GF(2)
//! =============================
//! The diffusion layer of the network is a Boolean matrix packed as 32 words
//! of 32 bits, row-major: bit `k` of row `j` selects state byte `k` into
//! output byte `j`. Addition is XOR, so applying the matrix to a 32-byte
//! state is 32 masked byte-XOR reductions.
//!
//! Inversion is Gauss–Jordan elimination on 64-bit augmented rows (low half
//! the matrix, high half the identity). A column without a pivot at or below
//! the elimination position means the matrix is singular and the layer
//! cannot be run backwards.

use crate::error::SolveError;
use crate::{State, STATE_BYTES};

/// Square bit matrix acting on a 32-byte state.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct BitMatrix {
    rows: [u32; STATE_BYTES],
}

/// XOR together the bytes of `v` selected by the set bits of `row`.
#[inline(always)]
fn dot_row(mut row: u32, v: &State) -> u8 {
    let mut acc = 0;
    while row != 0 {
        acc ^= v[row.trailing_zeros() as usize];
        row &= row - 1; // clear lowest set bit
    }
    acc
}

impl BitMatrix {
    /// Matrix dimension (rows == columns == state bytes).
    pub const DIM: usize = STATE_BYTES;

    pub const fn from_rows(rows: [u32; STATE_BYTES]) -> Self {
        Self { rows }
    }

    pub const fn identity() -> Self {
        let mut rows = [0u32; STATE_BYTES];
        let mut i = 0;
        while i < STATE_BYTES {
            rows[i] = 1 << i;
            i += 1;
        }
        Self { rows }
    }

    pub fn rows(&self) -> &[u32; STATE_BYTES] {
        &self.rows
    }

    /// Entry at (`row`, `col`).
    pub fn bit(&self, row: usize, col: usize) -> bool {
        self.rows[row] >> col & 1 == 1
    }

    /// Apply the matrix to a 32-byte state: output byte `j` is the XOR of
    /// the input bytes selected by row `j`.
    pub fn apply(&self, v: &State) -> State {
        let mut out = [0u8; STATE_BYTES];
        for (o, &row) in out.iter_mut().zip(self.rows.iter()) {
            *o = dot_row(row, v);
        }
        out
    }

    /// GF(2) matrix product `self * rhs`.
    pub fn mul(&self, rhs: &Self) -> Self {
        let mut rows = [0u32; STATE_BYTES];
        for (out, &row) in rows.iter_mut().zip(self.rows.iter()) {
            let mut bits = row;
            while bits != 0 {
                *out ^= rhs.rows[bits.trailing_zeros() as usize];
                bits &= bits - 1;
            }
        }
        Self { rows }
    }

    /// Invert via Gauss–Jordan elimination. The input is left untouched;
    /// all work happens on the augmented copy.
    pub fn invert(&self) -> Result<Self, SolveError> {
        // Augmented rows: low 32 bits = matrix, high 32 bits = identity.
        let mut aug = [0u64; STATE_BYTES];
        for (r, a) in aug.iter_mut().enumerate() {
            *a = self.rows[r] as u64 | 1u64 << (Self::DIM + r);
        }

        for c in 0..Self::DIM {
            // First row at or below the elimination position with bit c set.
            let pivot = (c..Self::DIM)
                .find(|&r| aug[r] >> c & 1 == 1)
                .ok_or(SolveError::SingularMatrix { column: c })?;
            aug.swap(c, pivot);

            // Full reduction: clear bit c from every other row, above and
            // below, so the low half ends as the identity.
            for r in 0..Self::DIM {
                if r != c && aug[r] >> c & 1 == 1 {
                    aug[r] ^= aug[c];
                }
            }
        }

        let mut rows = [0u32; STATE_BYTES];
        for (r, a) in rows.iter_mut().zip(aug.iter()) {
            *r = (a >> Self::DIM) as u32;
        }
        Ok(Self { rows })
    }
}

impl core::fmt::Debug for BitMatrix {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        writeln!(f, "BitMatrix [")?;
        for row in &self.rows {
            writeln!(f, "    {row:032b}")?;
        }
        write!(f, "]")
    }
}
