//! The PLONK verification pipeline.
//!
//! Each step is a separate function so the order of the computation reads
//! top to bottom in [`verify`]: transcript challenges, Lagrange evaluations
//! at `xi`, the public-input polynomial, the quotient evaluation `t`, the
//! linearization commitment `D`, the batched commitment `F`, the batched
//! evaluation `E` and the final pairing equation.

use ark_bn254::{G1Affine, G1Projective, G2Affine};
use ark_ec::{AffineRepr, CurveGroup};
use ark_ff::{Field, One, Zero};
use tracing::debug;

use super::keys::{Proof, ProofError, PublicSignals, VerificationKey};
use crate::curve::pairing_eq;
use crate::field::{div, FieldError, Fr};
use crate::transcript::Transcript;

/// Fiat–Shamir challenges and the derived vanishing-polynomial values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenges {
    /// Permutation challenge.
    pub beta: Fr,
    /// Permutation challenge.
    pub gamma: Fr,
    /// Quotient separation challenge.
    pub alpha: Fr,
    /// Evaluation point.
    pub xi: Fr,
    /// `xi^(2^power)`.
    pub xin: Fr,
    /// Vanishing polynomial at `xi`, `xin - 1`.
    pub zh: Fr,
    /// Batching powers; `v[1]` is the challenge and `v[i] = v[1]^i`.  `v[0]` is unused.
    pub v: [Fr; 7],
    /// Opening batching challenge.
    pub u: Fr,
}

impl Challenges {
    /// Replays the transcript for `proof` and `public`.
    pub fn derive(proof: &Proof, public: &PublicSignals, power: usize) -> Self {
        let mut transcript = Transcript::new();
        for signal in public.as_slice() {
            transcript.append_scalar(signal);
        }
        transcript.append_point(&proof.a);
        transcript.append_point(&proof.b);
        transcript.append_point(&proof.c);
        let beta = transcript.challenge();

        transcript.append_scalar(&beta);
        let gamma = transcript.challenge();

        transcript.append_point(&proof.z);
        let alpha = transcript.challenge();

        transcript.append_point(&proof.t1);
        transcript.append_point(&proof.t2);
        transcript.append_point(&proof.t3);
        let xi = transcript.challenge();

        for eval in [
            &proof.eval_a,
            &proof.eval_b,
            &proof.eval_c,
            &proof.eval_s1,
            &proof.eval_s2,
            &proof.eval_zw,
            &proof.eval_r,
        ] {
            transcript.append_scalar(eval);
        }
        let mut v = [Fr::zero(); 7];
        v[1] = transcript.challenge();
        for i in 2..v.len() {
            v[i] = v[i - 1] * v[1];
        }

        transcript.append_point(&proof.wxi);
        transcript.append_point(&proof.wxiw);
        let u = transcript.challenge();

        let mut xin = xi;
        for _ in 0..power {
            xin.square_in_place();
        }
        Self {
            beta,
            gamma,
            alpha,
            xi,
            xin,
            zh: xin - Fr::one(),
            v,
            u,
        }
    }
}

/// Lagrange basis evaluations `L[1..=max(1, nPublic)]` at `xi`; index 0 is unused.
pub fn lagrange_evaluations(
    key: &VerificationKey,
    ch: &Challenges,
) -> Result<Vec<Fr>, FieldError> {
    let n = Fr::from(1u64 << key.power);
    let count = key.n_public.max(1);
    let mut evaluations = Vec::with_capacity(count + 1);
    evaluations.push(Fr::zero());
    let mut w = Fr::one();
    for _ in 0..count {
        evaluations.push(div(w * ch.zh, n * (ch.xi - w))?);
        w *= key.omega;
    }
    Ok(evaluations)
}

/// Public-input polynomial at `xi`: `-sum(public[i] * L[i + 1])`.
pub fn public_input_evaluation(public: &PublicSignals, lagrange: &[Fr]) -> Fr {
    public
        .as_slice()
        .iter()
        .zip(lagrange.iter().skip(1))
        .fold(Fr::zero(), |acc, (signal, l)| acc - *signal * l)
}

/// Quotient polynomial evaluation `t` at `xi`.
pub fn quotient_evaluation(
    proof: &Proof,
    ch: &Challenges,
    pl: Fr,
    l1: Fr,
) -> Result<Fr, FieldError> {
    let e1 = proof.eval_a + ch.beta * proof.eval_s1 + ch.gamma;
    let e2 = proof.eval_b + ch.beta * proof.eval_s2 + ch.gamma;
    let e3 = proof.eval_c + ch.gamma;
    let permutation = e1 * e2 * e3 * proof.eval_zw * ch.alpha;
    let numerator = proof.eval_r + pl - permutation - l1 * ch.alpha.square();
    div(numerator, ch.zh)
}

/// Linearization commitment `D`.
pub fn linearization(
    key: &VerificationKey,
    proof: &Proof,
    ch: &Challenges,
    l1: Fr,
) -> G1Projective {
    let v1 = ch.v[1];
    let mut d = key.qm * (proof.eval_a * proof.eval_b * v1)
        + key.ql * (proof.eval_a * v1)
        + key.qr * (proof.eval_b * v1)
        + key.qo * (proof.eval_c * v1)
        + key.qc * v1;

    let beta_xi = ch.beta * ch.xi;
    let grand_product = (proof.eval_a + beta_xi + ch.gamma)
        * (proof.eval_b + beta_xi * key.k1 + ch.gamma)
        * (proof.eval_c + beta_xi * key.k2 + ch.gamma)
        * ch.alpha
        * v1
        + l1 * ch.alpha.square() * v1
        + ch.u;
    d += proof.z * grand_product;

    let cross = (proof.eval_a + ch.beta * proof.eval_s1 + ch.gamma)
        * (proof.eval_b + ch.beta * proof.eval_s2 + ch.gamma)
        * ch.alpha
        * v1
        * ch.beta
        * proof.eval_zw;
    d -= key.s3 * cross;
    d
}

/// Batched commitment `F`.
pub fn batched_commitment(
    key: &VerificationKey,
    proof: &Proof,
    ch: &Challenges,
    d: G1Projective,
) -> G1Projective {
    proof.t1.into_group()
        + proof.t2 * ch.xin
        + proof.t3 * ch.xin.square()
        + d
        + proof.a * ch.v[2]
        + proof.b * ch.v[3]
        + proof.c * ch.v[4]
        + key.s1 * ch.v[5]
        + key.s2 * ch.v[6]
}

/// Batched evaluation point `E`.
pub fn batched_evaluation(proof: &Proof, ch: &Challenges, t: Fr) -> G1Projective {
    let scalar = t
        + ch.v[1] * proof.eval_r
        + ch.v[2] * proof.eval_a
        + ch.v[3] * proof.eval_b
        + ch.v[4] * proof.eval_c
        + ch.v[5] * proof.eval_s1
        + ch.v[6] * proof.eval_s2
        + ch.u * proof.eval_zw;
    G1Affine::generator() * scalar
}

/// Final pairing equation
/// `e(Wxi + u*Wxiw, X2) == e(xi*Wxi + u*xi*w*Wxiw + F - E, G2)`.
pub fn final_check(
    key: &VerificationKey,
    proof: &Proof,
    ch: &Challenges,
    f: G1Projective,
    e: G1Projective,
) -> bool {
    let a1 = proof.wxi.into_group() + proof.wxiw * ch.u;
    let b1 = proof.wxi * ch.xi + proof.wxiw * (ch.u * ch.xi * key.omega) + f - e;
    pairing_eq(
        a1.into_affine(),
        key.x2,
        b1.into_affine(),
        G2Affine::generator(),
    )
}

/// Verifies `proof` against `key` and `public`.
///
/// `Ok(false)` means the pairing equation failed; errors are reserved for
/// inputs the pipeline cannot evaluate.
pub fn verify(
    key: &VerificationKey,
    proof: &Proof,
    public: &PublicSignals,
) -> Result<bool, ProofError> {
    if public.len() != key.n_public {
        return Err(ProofError::PublicCount {
            expected: key.n_public,
            found: public.len(),
        });
    }
    let ch = Challenges::derive(proof, public, key.power);
    let lagrange = lagrange_evaluations(key, &ch)?;
    let l1 = lagrange[1];
    let pl = public_input_evaluation(public, &lagrange);
    let t = quotient_evaluation(proof, &ch, pl, l1)?;
    let d = linearization(key, proof, &ch, l1);
    let f = batched_commitment(key, proof, &ch, d);
    let e = batched_evaluation(proof, &ch, t);
    let accepted = final_check(key, proof, &ch, f, e);
    debug!(accepted, n_public = key.n_public, power = key.power, "plonk verification");
    Ok(accepted)
}
