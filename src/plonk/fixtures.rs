//! Key/proof pairs that satisfy the pairing equation, for tests.
//!
//! The SRS trapdoor `tau` is known here, so the two opening commitments can
//! be solved for directly: with `u = 0` the equation reduces to
//! `(tau - xi) * Wxi = F0 - E0`, and the `u`-linear part reduces to
//! `(tau - xi * w) * Wxiw = Z - eval_zw * G`.  Both hold for every `u`, so
//! the proof verifies once `u` is rederived from the solved commitments.

use ark_bn254::{G1Affine, G2Affine};
use ark_ec::{AffineRepr, CurveGroup};
use ark_ff::{Field, Zero};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::keys::{Proof, PublicSignals, VerificationKey};
use super::verifier::{
    batched_commitment, batched_evaluation, lagrange_evaluations, linearization,
    public_input_evaluation, quotient_evaluation, Challenges,
};
use crate::field::{domain_generator, Fr};

pub(crate) const POWER: usize = 3;

pub(crate) struct Fixture {
    pub key: VerificationKey,
    pub proof: Proof,
    pub public: PublicSignals,
}

fn scalar(rng: &mut StdRng) -> Fr {
    Fr::from(rng.gen::<u128>()) * Fr::from(rng.gen::<u128>())
}

fn point(rng: &mut StdRng) -> G1Affine {
    (G1Affine::generator() * scalar(rng)).into_affine()
}

/// Verification key together with its SRS trapdoor.
pub(crate) struct Setup {
    pub key: VerificationKey,
    tau: Fr,
}

impl Setup {
    /// Random key for `n_public` public inputs.
    pub fn new(n_public: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let tau = scalar(&mut rng);
        let omega = domain_generator(POWER).expect("small domain");
        let key = VerificationKey {
            n_public,
            power: POWER,
            k1: Fr::from(2u64),
            k2: Fr::from(3u64),
            qm: point(&mut rng),
            ql: point(&mut rng),
            qr: point(&mut rng),
            qo: point(&mut rng),
            qc: point(&mut rng),
            s1: point(&mut rng),
            s2: point(&mut rng),
            s3: point(&mut rng),
            x2: (G2Affine::generator() * tau).into_affine(),
            w: omega,
            omega,
        };
        Self { key, tau }
    }

    /// Proof for `public` that passes the pairing check under this key.
    pub fn prove(&self, public: Vec<Fr>, seed: u64) -> (Proof, PublicSignals) {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut proof = Proof {
            a: point(&mut rng),
            b: point(&mut rng),
            c: point(&mut rng),
            z: point(&mut rng),
            t1: point(&mut rng),
            t2: point(&mut rng),
            t3: point(&mut rng),
            eval_a: scalar(&mut rng),
            eval_b: scalar(&mut rng),
            eval_c: scalar(&mut rng),
            eval_s1: scalar(&mut rng),
            eval_s2: scalar(&mut rng),
            eval_zw: scalar(&mut rng),
            eval_r: scalar(&mut rng),
            wxi: G1Affine::generator(),
            wxiw: G1Affine::generator(),
        };
        let public = PublicSignals(public);
        let key = &self.key;

        let mut ch = Challenges::derive(&proof, &public, key.power);
        ch.u = Fr::zero();
        let lagrange = lagrange_evaluations(key, &ch).expect("xi outside the domain");
        let pl = public_input_evaluation(&public, &lagrange);
        let t = quotient_evaluation(&proof, &ch, pl, lagrange[1]).expect("nonzero zh");
        let d = linearization(key, &proof, &ch, lagrange[1]);
        let f0 = batched_commitment(key, &proof, &ch, d);
        let e0 = batched_evaluation(&proof, &ch, t);

        let inv_xi = (self.tau - ch.xi).inverse().expect("tau differs from xi");
        let inv_xiw = (self.tau - ch.xi * key.omega)
            .inverse()
            .expect("tau differs from xi * w");
        proof.wxi = ((f0 - e0) * inv_xi).into_affine();
        proof.wxiw = ((proof.z.into_group() - G1Affine::generator() * proof.eval_zw) * inv_xiw)
            .into_affine();
        (proof, public)
    }
}

/// Fresh key plus one proof for `public`; `seed` varies the randomness.
pub(crate) fn build(public: Vec<Fr>, seed: u64) -> Fixture {
    let setup = Setup::new(public.len(), seed);
    let (proof, public) = setup.prove(public, seed.wrapping_add(1_000));
    Fixture {
        key: setup.key,
        proof,
        public,
    }
}
