//! MiMC-Feistel sponge over the BN254 scalar field.
//!
//! This is the circomlib `MiMCSponge` construction: 220 Feistel rounds with
//! an `x^5` S-box, round constants expanded from `keccak256("mimcsponge")`,
//! and a sponge that absorbs one element per permutation into the left lane.

use ark_ff::{Field, PrimeField, Zero};
use once_cell::sync::Lazy;

use crate::field::Fr;
use crate::transcript::keccak256;

/// Number of Feistel rounds per permutation.
pub const ROUNDS: usize = 220;

/// Seed from which the round constants are expanded.
pub const SEED: &[u8] = b"mimcsponge";

static ROUND_CONSTANTS: Lazy<Vec<Fr>> = Lazy::new(|| {
    let mut constants = vec![Fr::zero(); ROUNDS];
    let mut c = keccak256(SEED);
    for slot in constants.iter_mut().take(ROUNDS - 1).skip(1) {
        c = keccak256(&c);
        *slot = Fr::from_be_bytes_mod_order(&c);
    }
    constants
});

/// Round constants `c[0..220]`; the first and last are zero.
pub fn round_constants() -> &'static [Fr] {
    &ROUND_CONSTANTS
}

/// MiMC sponge hasher.
#[derive(Debug, Clone, Copy)]
pub struct MimcSponge {
    constants: &'static [Fr],
}

impl Default for MimcSponge {
    fn default() -> Self {
        Self::new()
    }
}

impl MimcSponge {
    /// Creates a hasher bound to the shared round constants.
    pub fn new() -> Self {
        Self {
            constants: round_constants(),
        }
    }

    /// Applies the keyed Feistel permutation to `(xl, xr)`.
    pub fn permute(&self, mut xl: Fr, mut xr: Fr, key: Fr) -> (Fr, Fr) {
        let last = ROUNDS - 1;
        for (i, c) in self.constants.iter().enumerate() {
            let t = xl + key + c;
            let t5 = t.square().square() * t;
            if i < last {
                let next_xl = xr + t5;
                xr = xl;
                xl = next_xl;
            } else {
                xr += t5;
            }
        }
        (xl, xr)
    }

    /// Absorbs `inputs` and squeezes `outputs` elements (at least one).
    pub fn multi_hash(&self, inputs: &[Fr], key: Fr, outputs: usize) -> Vec<Fr> {
        let mut r = Fr::zero();
        let mut c = Fr::zero();
        for input in inputs {
            r += input;
            (r, c) = self.permute(r, c, key);
        }
        let mut out = Vec::with_capacity(outputs.max(1));
        out.push(r);
        for _ in 1..outputs {
            (r, c) = self.permute(r, c, key);
            out.push(r);
        }
        out
    }

    /// Two-to-one compression used by the identity tree.
    pub fn hash_pair(&self, left: Fr, right: Fr) -> Fr {
        let mut r = left;
        let mut c = Fr::zero();
        (r, c) = self.permute(r, c, Fr::zero());
        r += right;
        (r, _) = self.permute(r, c, Fr::zero());
        r
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::from_decimal;

    fn fr(s: &str) -> Fr {
        from_decimal(s).unwrap()
    }

    #[test]
    fn constants_have_zero_ends() {
        let c = round_constants();
        assert_eq!(c.len(), ROUNDS);
        assert!(c[0].is_zero());
        assert!(c[ROUNDS - 1].is_zero());
        assert!(c[1..ROUNDS - 1].iter().all(|v| !v.is_zero()));
    }

    #[test]
    fn hash_of_one_two_matches_circomlib() {
        let sponge = MimcSponge::new();
        let expected =
            fr("19814528709687996974327303300007262407299502847885145507292406548098437687919");
        assert_eq!(sponge.hash_pair(Fr::from(1u64), Fr::from(2u64)), expected);
        assert_eq!(
            sponge.multi_hash(&[Fr::from(1u64), Fr::from(2u64)], Fr::zero(), 1),
            vec![expected]
        );
    }

    #[test]
    fn squeezes_extra_outputs() {
        let sponge = MimcSponge::new();
        let out = sponge.multi_hash(&[Fr::from(1u64), Fr::from(2u64)], Fr::zero(), 3);
        assert_eq!(
            out,
            vec![
                fr("19814528709687996974327303300007262407299502847885145507292406548098437687919"),
                fr("21479918933254162297266020499931408698629819071798560668427831994080392652265"),
                fr("5864304407125602198417538232776668609689728417208547813776331040141674798262"),
            ]
        );
        assert_eq!(sponge.multi_hash(&[Fr::from(1u64)], Fr::zero(), 0).len(), 1);
    }

    #[test]
    fn tornado_zero_chain() {
        let sponge = MimcSponge::new();
        let z0 = fr("21663839004416932945382355908790599225266501822907911457504978515578255421292");
        let z1 = sponge.hash_pair(z0, z0);
        assert_eq!(
            z1,
            fr("16923532097304556005972200564242292693309333953544141029519619077135960040221")
        );
        assert_eq!(
            sponge.hash_pair(z1, z1),
            fr("7833458610320835472520144237082236871909694928684820466656733259024982655488")
        );
    }

    #[test]
    fn key_changes_the_permutation() {
        let sponge = MimcSponge::new();
        let a = sponge.permute(Fr::from(3u64), Fr::zero(), Fr::zero());
        let b = sponge.permute(Fr::from(3u64), Fr::zero(), Fr::from(1u64));
        assert_ne!(a, b);
    }
}
