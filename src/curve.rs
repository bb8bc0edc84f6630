//! BN254 group helpers.
//!
//! Points arrive as vectors of decimal coordinate strings (snarkjs layout:
//! `[x, y, z]` for G1 and `[[x0, x1], [y0, y1], [z0, z1]]` for G2, where a
//! zero `z` marks the identity).  Transcripts consume the 64-byte
//! uncompressed G1 form: big-endian `x || y`, or 64 zero bytes with the
//! `0x40` flag set in the first byte for the identity.

use crate::field::{from_decimal, to_bytes_be, to_decimal, FieldError, Fq, FIELD_BYTES};
use ark_bn254::{Bn254, Fq2, G1Affine, G2Affine};
use ark_ec::{pairing::Pairing, AffineRepr};
use thiserror::Error;

/// Width of the uncompressed G1 encoding.
pub const G1_UNCOMPRESSED_BYTES: usize = 2 * FIELD_BYTES;

const INFINITY_FLAG: u8 = 0x40;

/// Errors raised while decoding curve points.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CurveError {
    #[error(transparent)]
    /// A coordinate was not a canonical base-field numeral.
    Field(#[from] FieldError),
    #[error("expected 2 or 3 coordinates, found {0}")]
    /// The coordinate vector had the wrong length.
    Arity(usize),
    #[error("invalid projective z coordinate {0:?}")]
    /// The projective `z` was neither zero nor one.
    InvalidZ(String),
    #[error("point is not on the curve")]
    /// The affine coordinates do not satisfy the curve equation.
    NotOnCurve,
    #[error("point is not in the prime-order subgroup")]
    /// The G2 point lies outside the pairing subgroup.
    NotInSubgroup,
}

/// Decodes a G1 point from `[x, y]` or `[x, y, z]` decimal coordinates.
pub fn g1_from_decimal(coords: &[String]) -> Result<G1Affine, CurveError> {
    if !(2..=3).contains(&coords.len()) {
        return Err(CurveError::Arity(coords.len()));
    }
    if let Some(z) = coords.get(2) {
        match z.as_str() {
            "0" => return Ok(G1Affine::zero()),
            "1" => {}
            other => return Err(CurveError::InvalidZ(other.to_string())),
        }
    }
    let x: Fq = from_decimal(&coords[0])?;
    let y: Fq = from_decimal(&coords[1])?;
    let point = G1Affine::new_unchecked(x, y);
    // G1 has cofactor one, so the curve check is also the subgroup check.
    if !point.is_on_curve() {
        return Err(CurveError::NotOnCurve);
    }
    Ok(point)
}

fn fq2_from_decimal(pair: &[String]) -> Result<Fq2, CurveError> {
    if pair.len() != 2 {
        return Err(CurveError::Arity(pair.len()));
    }
    Ok(Fq2::new(from_decimal(&pair[0])?, from_decimal(&pair[1])?))
}

/// Decodes a G2 point from `[[x0, x1], [y0, y1]]` with an optional `[z0, z1]`.
pub fn g2_from_decimal(coords: &[Vec<String>]) -> Result<G2Affine, CurveError> {
    if !(2..=3).contains(&coords.len()) {
        return Err(CurveError::Arity(coords.len()));
    }
    if let Some(z) = coords.get(2) {
        let z = fq2_from_decimal(z)?;
        if z == Fq2::from(0u64) {
            return Ok(G2Affine::zero());
        }
        if z != Fq2::from(1u64) {
            return Err(CurveError::InvalidZ(z.to_string()));
        }
    }
    let point = G2Affine::new_unchecked(fq2_from_decimal(&coords[0])?, fq2_from_decimal(&coords[1])?);
    if !point.is_on_curve() {
        return Err(CurveError::NotOnCurve);
    }
    if !point.is_in_correct_subgroup_assuming_on_curve() {
        return Err(CurveError::NotInSubgroup);
    }
    Ok(point)
}

/// Encodes a G1 point in the 64-byte uncompressed transcript form.
pub fn g1_to_uncompressed(point: &G1Affine) -> [u8; G1_UNCOMPRESSED_BYTES] {
    let mut out = [0u8; G1_UNCOMPRESSED_BYTES];
    match point.xy() {
        None => out[0] |= INFINITY_FLAG,
        Some((x, y)) => {
            out[..FIELD_BYTES].copy_from_slice(&to_bytes_be(x));
            out[FIELD_BYTES..].copy_from_slice(&to_bytes_be(y));
        }
    }
    out
}

/// Renders a G1 point as snarkjs-style `[x, y, z]` decimal strings.
pub fn g1_to_decimal(point: &G1Affine) -> Vec<String> {
    match point.xy() {
        None => vec!["0".into(), "1".into(), "0".into()],
        Some((x, y)) => vec![to_decimal(x), to_decimal(y), "1".into()],
    }
}

/// Renders a G2 point as snarkjs-style `[[x0, x1], [y0, y1], [z0, z1]]`.
pub fn g2_to_decimal(point: &G2Affine) -> Vec<Vec<String>> {
    let pair = |v: &Fq2| vec![to_decimal(&v.c0), to_decimal(&v.c1)];
    match point.xy() {
        None => vec![
            vec!["0".into(), "0".into()],
            vec!["1".into(), "0".into()],
            vec!["0".into(), "0".into()],
        ],
        Some((x, y)) => vec![pair(x), pair(y), vec!["1".into(), "0".into()]],
    }
}

/// Checks the pairing equality `e(a, b) == e(c, d)`.
pub fn pairing_eq(a: G1Affine, b: G2Affine, c: G1Affine, d: G2Affine) -> bool {
    Bn254::pairing(a, b) == Bn254::pairing(c, d)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::Fr;
    use ark_ec::CurveGroup;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn generator_decodes_and_encodes() {
        let g = g1_from_decimal(&strings(&["1", "2", "1"])).unwrap();
        assert_eq!(g, G1Affine::generator());
        let bytes = g1_to_uncompressed(&g);
        assert_eq!(bytes[31], 1);
        assert_eq!(bytes[63], 2);
        assert!(bytes[..31].iter().all(|&b| b == 0));
        assert_eq!(g1_to_decimal(&g), strings(&["1", "2", "1"]));
    }

    #[test]
    fn identity_uses_flag_byte() {
        let zero = g1_from_decimal(&strings(&["0", "1", "0"])).unwrap();
        assert!(zero.is_zero());
        let bytes = g1_to_uncompressed(&zero);
        assert_eq!(bytes[0], 0x40);
        assert!(bytes[1..].iter().all(|&b| b == 0));
    }

    #[test]
    fn rejects_bad_points() {
        assert_eq!(
            g1_from_decimal(&strings(&["1", "3"])),
            Err(CurveError::NotOnCurve)
        );
        assert_eq!(
            g1_from_decimal(&strings(&["1", "2", "7"])),
            Err(CurveError::InvalidZ("7".into()))
        );
        assert_eq!(g1_from_decimal(&strings(&["1"])), Err(CurveError::Arity(1)));
        assert!(matches!(
            g1_from_decimal(&strings(&["1", "x2"])),
            Err(CurveError::Field(FieldError::InvalidNumeral(_)))
        ));
    }

    #[test]
    fn g2_decimal_form_is_accepted_back() {
        let h = (G2Affine::generator() * Fr::from(7u64)).into_affine();
        let decoded = g2_from_decimal(&g2_to_decimal(&h)).unwrap();
        assert_eq!(decoded, h);
        let mut broken = g2_to_decimal(&h);
        broken[1][0] = "5".into();
        assert_eq!(g2_from_decimal(&broken), Err(CurveError::NotOnCurve));
    }

    #[test]
    fn pairing_is_bilinear() {
        let g = G1Affine::generator();
        let h = G2Affine::generator();
        let g3 = (g * Fr::from(3u64)).into_affine();
        let h3 = (h * Fr::from(3u64)).into_affine();
        assert!(pairing_eq(g3, h, g, h3));
        assert!(!pairing_eq(g3, h, g, h));
    }
}
