//! The substitution–permutation network itself.
//!
//! Forward semantics, per round:
//!
//! * **diffuse** — multiply the 32-byte state by the GF(2) bit matrix;
//! * **substitute** — push even-indexed bytes through the even table and
//!   odd-indexed bytes through the odd table.
//!
//! After the configured number of rounds the state is compressed to 16
//! output bytes by XOR-pairing the two tables:
//! `out[i] = even[state[2i]] ^ odd[state[2i+1]]`.
//!
//! [`Spn::new`] inverts the diffusion matrix once and caches it; that is the
//! only fallible step, and everything downstream (seeding, searching)
//! borrows this immutable instance.

use crate::error::SolveError;
use crate::matrix::BitMatrix;
use crate::sbox::{Classify, SboxInverse};
use crate::{Output, State, TARGET_BYTES};

pub struct Spn {
    sbox_even: [u8; 256],
    sbox_odd: [u8; 256],
    diffusion: BitMatrix,
    inverse_diffusion: BitMatrix,
    inv_even: SboxInverse,
    inv_odd: SboxInverse,
    rounds: usize,
}

impl Spn {
    /// Build an instance, deriving the inverse relations and the inverse
    /// diffusion matrix up front.
    pub fn new(
        sbox_even: [u8; 256],
        sbox_odd: [u8; 256],
        diffusion: BitMatrix,
        rounds: usize,
    ) -> Result<Self, SolveError> {
        let inverse_diffusion = diffusion.invert()?;
        Ok(Self {
            inv_even: SboxInverse::build(&sbox_even),
            inv_odd: SboxInverse::build(&sbox_odd),
            sbox_even,
            sbox_odd,
            diffusion,
            inverse_diffusion,
            rounds,
        })
    }

    pub fn rounds(&self) -> usize {
        self.rounds
    }

    pub fn sbox_even(&self) -> &[u8; 256] {
        &self.sbox_even
    }

    pub fn sbox_odd(&self) -> &[u8; 256] {
        &self.sbox_odd
    }

    pub fn inverse_even(&self) -> &SboxInverse {
        &self.inv_even
    }

    pub fn inverse_odd(&self) -> &SboxInverse {
        &self.inv_odd
    }

    pub fn inverse_diffusion(&self) -> &BitMatrix {
        &self.inverse_diffusion
    }

    fn substitute(&self, state: &mut State) {
        for (j, b) in state.iter_mut().enumerate() {
            *b = if j % 2 == 0 {
                self.sbox_even[*b as usize]
            } else {
                self.sbox_odd[*b as usize]
            };
        }
    }

    /// One forward round: substitute(diffuse(state)).
    pub fn round_forward(&self, state: &State) -> State {
        let mut out = self.diffusion.apply(state);
        self.substitute(&mut out);
        out
    }

    /// XOR-pair the final state down to the 16 output bytes.
    pub fn compress(&self, state: &State) -> Output {
        let mut out = [0u8; TARGET_BYTES];
        for (i, o) in out.iter_mut().enumerate() {
            *o = self.sbox_even[state[2 * i] as usize] ^ self.sbox_odd[state[2 * i + 1] as usize];
        }
        out
    }

    /// Full forward pass: all rounds, then compression. This is what a
    /// discovered preimage is verified against.
    pub fn transform(&self, input: &State) -> Output {
        let mut st = *input;
        for _ in 0..self.rounds {
            st = self.round_forward(&st);
        }
        self.compress(&st)
    }

    /// Invert the substitution of one byte, dispatching on position parity.
    pub fn classify_position(&self, pos: usize, y: u8) -> Classify<'_> {
        if pos % 2 == 0 {
            self.inv_even.classify(y)
        } else {
            self.inv_odd.classify(y)
        }
    }

    /// Preimage set for one byte position (empty = dead end).
    pub fn preimages_at(&self, pos: usize, y: u8) -> &[u8] {
        if pos % 2 == 0 {
            self.inv_even.preimages(y)
        } else {
            self.inv_odd.preimages(y)
        }
    }
}

// -----------------------------------------------------------------------
//  TESTS
// -----------------------------------------------------------------------
#[cfg(test)]
mod tests {
    use super::*;
    use crate::challenge;

    fn spn(rounds: usize) -> Spn {
        Spn::new(
            challenge::SBOX_EVEN,
            challenge::SBOX_ODD,
            BitMatrix::from_rows(challenge::DIFFUSION),
            rounds,
        )
        .unwrap()
    }

    #[test]
    fn transform_is_deterministic() {
        let spn = spn(8);
        let input: State = core::array::from_fn(|i| i as u8);
        assert_eq!(spn.transform(&input), spn.transform(&input));
    }

    #[test]
    fn backward_candidates_contain_the_forward_source() {
        // Run one round forward, then check that inverting the substitution
        // and the diffusion can reproduce the state we started from.
        let spn = spn(1);
        let start: State = core::array::from_fn(|i| (i as u8).wrapping_mul(73).wrapping_add(5));
        let after = spn.round_forward(&start);

        // The pre-substitution vector is diffuse(start); every byte of it
        // must appear in the preimage set of the corresponding output byte.
        let mut presub = [0u8; 32];
        for (j, &y) in after.iter().enumerate() {
            let pre = spn.preimages_at(j, y);
            assert!(!pre.is_empty(), "round output byte {j} has no preimage");
            let expected = match spn.classify_position(j, y) {
                Classify::DeadEnd => unreachable!(),
                Classify::Forced(x) => x,
                Classify::Branching(xs) => {
                    // Pick whichever branch matches the known source.
                    let want = spn.diffusion.apply(&start)[j];
                    assert!(xs.contains(&want));
                    want
                }
            };
            presub[j] = expected;
        }
        assert_eq!(spn.inverse_diffusion().apply(&presub), start);
    }

    #[test]
    fn zero_rounds_is_just_compression() {
        let spn = spn(0);
        let state: State = core::array::from_fn(|i| (3 * i) as u8);
        assert_eq!(spn.transform(&state), spn.compress(&state));
    }

    #[test]
    fn compress_xors_the_two_tables() {
        let spn = spn(1);
        let state: State = core::array::from_fn(|i| (i * 7) as u8);
        let out = spn.compress(&state);
        for i in 0..TARGET_BYTES {
            let even = challenge::SBOX_EVEN[state[2 * i] as usize];
            let odd = challenge::SBOX_ODD[state[2 * i + 1] as usize];
            assert_eq!(out[i], even ^ odd);
        }
    }
}
