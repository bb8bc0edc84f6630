//! Verification keys, proofs and public signals, plus their snarkjs JSON forms.

use ark_bn254::{G1Affine, G2Affine};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::curve::{g1_from_decimal, g1_to_decimal, g2_from_decimal, g2_to_decimal, CurveError};
use crate::field::{domain_generator, from_decimal, to_decimal, FieldError, Fr};

/// Protocol tag carried by keys and proofs.
pub const PROTOCOL: &str = "plonk";

/// Accepted curve tags.
pub const CURVES: [&str; 2] = ["bn128", "bn254"];

/// Largest circuit-size exponent the scalar field supports.
pub const MAX_POWER: usize = 28;

/// Errors raised while decoding keys, proofs or public signals.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProofError {
    #[error(transparent)]
    /// A scalar or coordinate was not a canonical field numeral.
    Field(#[from] FieldError),
    #[error("invalid point {what}: {reason}")]
    /// A commitment failed to decode as a curve point.
    Point {
        /// Name of the offending commitment.
        what: &'static str,
        /// Decoding failure.
        reason: CurveError,
    },
    #[error("unsupported {what} {found:?}")]
    /// The protocol tag, curve tag or domain size is not supported.
    Unsupported {
        /// Which attribute was rejected.
        what: &'static str,
        /// Value that was supplied.
        found: String,
    },
    #[error("expected {expected} public signals, found {found}")]
    /// The number of public signals does not match the key.
    PublicCount {
        /// Count declared by the verification key.
        expected: usize,
        /// Count that was supplied.
        found: usize,
    },
    #[error("invalid json: {0}")]
    /// The JSON document could not be decoded.
    Json(String),
}

impl ProofError {
    fn point(what: &'static str, err: CurveError) -> Self {
        match err {
            CurveError::Field(inner) => Self::Field(inner),
            reason => Self::Point { what, reason },
        }
    }
}

fn g1(what: &'static str, coords: &[String]) -> Result<G1Affine, ProofError> {
    g1_from_decimal(coords).map_err(|err| ProofError::point(what, err))
}

fn check_tags(protocol: &str, curve: &str) -> Result<(), ProofError> {
    if !protocol.is_empty() && protocol != PROTOCOL {
        return Err(ProofError::Unsupported {
            what: "protocol",
            found: protocol.to_string(),
        });
    }
    if !curve.is_empty() && !CURVES.contains(&curve) {
        return Err(ProofError::Unsupported {
            what: "curve",
            found: curve.to_string(),
        });
    }
    Ok(())
}

/// snarkjs verification key document.
///
/// Field order is significant: the administrator digest is taken over the
/// compact serialization of this struct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationKeyJson {
    /// Protocol tag, `plonk`.
    pub protocol: String,
    /// Curve tag, `bn128`.
    pub curve: String,
    /// Number of public inputs.
    #[serde(rename = "nPublic")]
    pub n_public: usize,
    /// Circuit-size exponent.
    pub power: usize,
    /// First coset shift.
    pub k1: String,
    /// Second coset shift.
    pub k2: String,
    /// Multiplication selector commitment.
    #[serde(rename = "Qm")]
    pub qm: Vec<String>,
    /// Left selector commitment.
    #[serde(rename = "Ql")]
    pub ql: Vec<String>,
    /// Right selector commitment.
    #[serde(rename = "Qr")]
    pub qr: Vec<String>,
    /// Output selector commitment.
    #[serde(rename = "Qo")]
    pub qo: Vec<String>,
    /// Constant selector commitment.
    #[serde(rename = "Qc")]
    pub qc: Vec<String>,
    /// First permutation commitment.
    #[serde(rename = "S1")]
    pub s1: Vec<String>,
    /// Second permutation commitment.
    #[serde(rename = "S2")]
    pub s2: Vec<String>,
    /// Third permutation commitment.
    #[serde(rename = "S3")]
    pub s3: Vec<String>,
    /// SRS point `[tau]_2`.
    #[serde(rename = "X_2")]
    pub x2: Vec<Vec<String>>,
    /// Declared domain generator.
    pub w: String,
}

impl VerificationKeyJson {
    /// Parses a verification key document.
    pub fn parse(input: &str) -> Result<Self, ProofError> {
        serde_json::from_str(input).map_err(|err| ProofError::Json(err.to_string()))
    }

    /// SHA-256 of the compact serialization.
    pub fn digest(&self) -> Result<[u8; 32], ProofError> {
        let bytes = serde_json::to_vec(self).map_err(|err| ProofError::Json(err.to_string()))?;
        let mut out = [0u8; 32];
        out.copy_from_slice(&Sha256::digest(&bytes));
        Ok(out)
    }

    /// Hex form of [`VerificationKeyJson::digest`].
    pub fn digest_hex(&self) -> Result<String, ProofError> {
        self.digest().map(hex::encode)
    }
}

/// Decoded PLONK verification key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationKey {
    /// Number of public inputs.
    pub n_public: usize,
    /// Circuit-size exponent; the domain has `2^power` points.
    pub power: usize,
    /// First coset shift.
    pub k1: Fr,
    /// Second coset shift.
    pub k2: Fr,
    /// Multiplication selector commitment.
    pub qm: G1Affine,
    /// Left selector commitment.
    pub ql: G1Affine,
    /// Right selector commitment.
    pub qr: G1Affine,
    /// Output selector commitment.
    pub qo: G1Affine,
    /// Constant selector commitment.
    pub qc: G1Affine,
    /// First permutation commitment.
    pub s1: G1Affine,
    /// Second permutation commitment.
    pub s2: G1Affine,
    /// Third permutation commitment.
    pub s3: G1Affine,
    /// SRS point `[tau]_2`.
    pub x2: G2Affine,
    /// Generator as declared in the key document.
    pub w: Fr,
    /// Generator recomputed from the root-of-unity ladder.
    pub omega: Fr,
}

impl TryFrom<&VerificationKeyJson> for VerificationKey {
    type Error = ProofError;

    fn try_from(json: &VerificationKeyJson) -> Result<Self, Self::Error> {
        check_tags(&json.protocol, &json.curve)?;
        if json.power > MAX_POWER {
            return Err(ProofError::Unsupported {
                what: "power",
                found: json.power.to_string(),
            });
        }
        Ok(Self {
            n_public: json.n_public,
            power: json.power,
            k1: from_decimal(&json.k1)?,
            k2: from_decimal(&json.k2)?,
            qm: g1("Qm", &json.qm)?,
            ql: g1("Ql", &json.ql)?,
            qr: g1("Qr", &json.qr)?,
            qo: g1("Qo", &json.qo)?,
            qc: g1("Qc", &json.qc)?,
            s1: g1("S1", &json.s1)?,
            s2: g1("S2", &json.s2)?,
            s3: g1("S3", &json.s3)?,
            x2: g2_from_decimal(&json.x2).map_err(|err| ProofError::point("X_2", err))?,
            w: from_decimal(&json.w)?,
            omega: domain_generator(json.power)?,
        })
    }
}

impl From<&VerificationKey> for VerificationKeyJson {
    fn from(key: &VerificationKey) -> Self {
        Self {
            protocol: PROTOCOL.into(),
            curve: CURVES[0].into(),
            n_public: key.n_public,
            power: key.power,
            k1: to_decimal(&key.k1),
            k2: to_decimal(&key.k2),
            qm: g1_to_decimal(&key.qm),
            ql: g1_to_decimal(&key.ql),
            qr: g1_to_decimal(&key.qr),
            qo: g1_to_decimal(&key.qo),
            qc: g1_to_decimal(&key.qc),
            s1: g1_to_decimal(&key.s1),
            s2: g1_to_decimal(&key.s2),
            s3: g1_to_decimal(&key.s3),
            x2: g2_to_decimal(&key.x2),
            w: to_decimal(&key.w),
        }
    }
}

/// snarkjs PLONK proof document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofJson {
    /// Wire commitment `a`.
    #[serde(rename = "A")]
    pub a: Vec<String>,
    /// Wire commitment `b`.
    #[serde(rename = "B")]
    pub b: Vec<String>,
    /// Wire commitment `c`.
    #[serde(rename = "C")]
    pub c: Vec<String>,
    /// Permutation grand-product commitment.
    #[serde(rename = "Z")]
    pub z: Vec<String>,
    /// Low quotient commitment.
    #[serde(rename = "T1")]
    pub t1: Vec<String>,
    /// Middle quotient commitment.
    #[serde(rename = "T2")]
    pub t2: Vec<String>,
    /// High quotient commitment.
    #[serde(rename = "T3")]
    pub t3: Vec<String>,
    /// Evaluation of `a` at `xi`.
    pub eval_a: String,
    /// Evaluation of `b` at `xi`.
    pub eval_b: String,
    /// Evaluation of `c` at `xi`.
    pub eval_c: String,
    /// Evaluation of `S1` at `xi`.
    pub eval_s1: String,
    /// Evaluation of `S2` at `xi`.
    pub eval_s2: String,
    /// Evaluation of `Z` at `xi * w`.
    pub eval_zw: String,
    /// Evaluation of the linearization polynomial at `xi`.
    pub eval_r: String,
    /// Opening proof at `xi`.
    #[serde(rename = "Wxi")]
    pub wxi: Vec<String>,
    /// Opening proof at `xi * w`.
    #[serde(rename = "Wxiw")]
    pub wxiw: Vec<String>,
    /// Protocol tag.
    #[serde(default)]
    pub protocol: String,
    /// Curve tag.
    #[serde(default)]
    pub curve: String,
}

impl ProofJson {
    /// Parses a proof document.
    pub fn parse(input: &str) -> Result<Self, ProofError> {
        serde_json::from_str(input).map_err(|err| ProofError::Json(err.to_string()))
    }
}

/// Decoded PLONK proof.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proof {
    /// Wire commitment `a`.
    pub a: G1Affine,
    /// Wire commitment `b`.
    pub b: G1Affine,
    /// Wire commitment `c`.
    pub c: G1Affine,
    /// Permutation grand-product commitment.
    pub z: G1Affine,
    /// Low quotient commitment.
    pub t1: G1Affine,
    /// Middle quotient commitment.
    pub t2: G1Affine,
    /// High quotient commitment.
    pub t3: G1Affine,
    /// Evaluation of `a` at `xi`.
    pub eval_a: Fr,
    /// Evaluation of `b` at `xi`.
    pub eval_b: Fr,
    /// Evaluation of `c` at `xi`.
    pub eval_c: Fr,
    /// Evaluation of `S1` at `xi`.
    pub eval_s1: Fr,
    /// Evaluation of `S2` at `xi`.
    pub eval_s2: Fr,
    /// Evaluation of `Z` at `xi * w`.
    pub eval_zw: Fr,
    /// Evaluation of the linearization polynomial at `xi`.
    pub eval_r: Fr,
    /// Opening proof at `xi`.
    pub wxi: G1Affine,
    /// Opening proof at `xi * w`.
    pub wxiw: G1Affine,
}

impl TryFrom<&ProofJson> for Proof {
    type Error = ProofError;

    fn try_from(json: &ProofJson) -> Result<Self, Self::Error> {
        check_tags(&json.protocol, &json.curve)?;
        Ok(Self {
            a: g1("A", &json.a)?,
            b: g1("B", &json.b)?,
            c: g1("C", &json.c)?,
            z: g1("Z", &json.z)?,
            t1: g1("T1", &json.t1)?,
            t2: g1("T2", &json.t2)?,
            t3: g1("T3", &json.t3)?,
            eval_a: from_decimal(&json.eval_a)?,
            eval_b: from_decimal(&json.eval_b)?,
            eval_c: from_decimal(&json.eval_c)?,
            eval_s1: from_decimal(&json.eval_s1)?,
            eval_s2: from_decimal(&json.eval_s2)?,
            eval_zw: from_decimal(&json.eval_zw)?,
            eval_r: from_decimal(&json.eval_r)?,
            wxi: g1("Wxi", &json.wxi)?,
            wxiw: g1("Wxiw", &json.wxiw)?,
        })
    }
}

impl From<&Proof> for ProofJson {
    fn from(proof: &Proof) -> Self {
        Self {
            a: g1_to_decimal(&proof.a),
            b: g1_to_decimal(&proof.b),
            c: g1_to_decimal(&proof.c),
            z: g1_to_decimal(&proof.z),
            t1: g1_to_decimal(&proof.t1),
            t2: g1_to_decimal(&proof.t2),
            t3: g1_to_decimal(&proof.t3),
            eval_a: to_decimal(&proof.eval_a),
            eval_b: to_decimal(&proof.eval_b),
            eval_c: to_decimal(&proof.eval_c),
            eval_s1: to_decimal(&proof.eval_s1),
            eval_s2: to_decimal(&proof.eval_s2),
            eval_zw: to_decimal(&proof.eval_zw),
            eval_r: to_decimal(&proof.eval_r),
            wxi: g1_to_decimal(&proof.wxi),
            wxiw: g1_to_decimal(&proof.wxiw),
            protocol: PROTOCOL.into(),
            curve: CURVES[0].into(),
        }
    }
}

/// Public inputs of a proof, in circuit order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PublicSignals(pub Vec<Fr>);

impl PublicSignals {
    /// Decodes canonical decimal strings.
    pub fn parse(values: &[String]) -> Result<Self, ProofError> {
        values
            .iter()
            .map(|v| from_decimal(v).map_err(ProofError::from))
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }

    /// Parses a JSON array of decimal strings.
    pub fn parse_json(input: &str) -> Result<Self, ProofError> {
        let values: Vec<String> =
            serde_json::from_str(input).map_err(|err| ProofError::Json(err.to_string()))?;
        Self::parse(&values)
    }

    /// Number of signals.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no signals.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Signals in order.
    pub fn as_slice(&self) -> &[Fr] {
        &self.0
    }

    /// Decimal renderings in order.
    pub fn to_decimal_strings(&self) -> Vec<String> {
        self.0.iter().map(to_decimal).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plonk::fixtures;

    #[test]
    fn key_and_proof_json_are_accepted_back() {
        let fx = fixtures::build(vec![Fr::from(65u64), Fr::from(7u64)], 1);
        let key_json = VerificationKeyJson::from(&fx.key);
        let text = serde_json::to_string(&key_json).unwrap();
        let parsed = VerificationKeyJson::parse(&text).unwrap();
        assert_eq!(VerificationKey::try_from(&parsed).unwrap(), fx.key);

        let proof_json = ProofJson::from(&fx.proof);
        let parsed = ProofJson::parse(&serde_json::to_string(&proof_json).unwrap()).unwrap();
        assert_eq!(Proof::try_from(&parsed).unwrap(), fx.proof);
    }

    #[test]
    fn digest_ignores_whitespace_and_member_order() {
        let fx = fixtures::build(vec![Fr::from(1u64), Fr::from(2u64)], 2);
        let key_json = VerificationKeyJson::from(&fx.key);
        let mut value = serde_json::to_value(&key_json).unwrap();
        let reordered = serde_json::to_string_pretty(value.as_object_mut().unwrap()).unwrap();
        let parsed = VerificationKeyJson::parse(&reordered).unwrap();
        assert_eq!(parsed.digest().unwrap(), key_json.digest().unwrap());
        assert_eq!(key_json.digest_hex().unwrap().len(), 64);

        let mut other = key_json.clone();
        other.power += 1;
        assert_ne!(other.digest().unwrap(), key_json.digest().unwrap());
    }

    #[test]
    fn rejects_bad_documents() {
        let fx = fixtures::build(vec![Fr::from(1u64), Fr::from(2u64)], 3);
        let mut key_json = VerificationKeyJson::from(&fx.key);
        key_json.protocol = "groth16".into();
        assert!(matches!(
            VerificationKey::try_from(&key_json),
            Err(ProofError::Unsupported { what: "protocol", .. })
        ));

        let mut key_json = VerificationKeyJson::from(&fx.key);
        key_json.power = MAX_POWER + 1;
        assert!(matches!(
            VerificationKey::try_from(&key_json),
            Err(ProofError::Unsupported { what: "power", .. })
        ));

        let mut proof_json = ProofJson::from(&fx.proof);
        proof_json.eval_a = "not-a-number".into();
        assert!(matches!(
            Proof::try_from(&proof_json),
            Err(ProofError::Field(FieldError::InvalidNumeral(_)))
        ));

        let mut proof_json = ProofJson::from(&fx.proof);
        proof_json.t2 = vec!["1".into(), "3".into(), "1".into()];
        assert_eq!(
            Proof::try_from(&proof_json),
            Err(ProofError::Point {
                what: "T2",
                reason: CurveError::NotOnCurve
            })
        );

        assert!(matches!(
            ProofJson::parse("{\"A\": []}"),
            Err(ProofError::Json(_))
        ));
    }

    #[test]
    fn public_signals_parse() {
        let signals = PublicSignals::parse_json("[\"65\", \"12\"]").unwrap();
        assert_eq!(signals.as_slice(), &[Fr::from(65u64), Fr::from(12u64)]);
        assert_eq!(signals.to_decimal_strings(), vec!["65", "12"]);
        assert!(PublicSignals::parse_json("[\"-1\"]").is_err());
        assert!(PublicSignals::parse_json("{}").is_err());
    }
}
