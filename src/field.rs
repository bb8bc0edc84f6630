//! Finite field helpers over the BN254 scalar and base fields.
//!
//! Arithmetic is provided by `ark-bn254`; this module adds the pieces the
//! verifier, the sponge and the state machine need on top of it: strict
//! decimal decoding, fixed-width big-endian encoding, checked division and
//! the nonresidue ladder of power-of-two roots of unity.  Every element
//! produced here is canonically reduced into `[0, p)`.

use ark_ff::{BigInteger, Field, One, PrimeField, Zero};
use num_bigint::BigUint;
use once_cell::sync::Lazy;
use thiserror::Error;

pub use ark_bn254::{Fq, Fr};

/// Width in bytes of an encoded field element.
pub const FIELD_BYTES: usize = 32;

/// Errors raised while decoding or dividing field elements.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("invalid decimal numeral {0:?}")]
    /// The string is empty or contains non-digit characters.
    InvalidNumeral(String),
    #[error("invalid hex string {0:?}")]
    /// The string is empty or contains non-hex characters.
    InvalidHex(String),
    #[error("value {0} is not below the field modulus")]
    /// The decoded integer is not a canonical field element.
    NonCanonical(String),
    #[error("expected {expected} bytes, found {found}")]
    /// A fixed-width encoding had the wrong length.
    InvalidLength {
        /// Required width in bytes.
        expected: usize,
        /// Width that was supplied.
        found: usize,
    },
    #[error("division by zero")]
    /// The divisor was the zero element.
    DivisionByZero,
    #[error("no root of unity of order 2^{0}")]
    /// The requested evaluation domain exceeds the field's two-adicity.
    DomainTooLarge(usize),
}

/// Decodes a canonical decimal numeral into a field element.
///
/// Leading zeros are tolerated; values at or above the modulus are
/// rejected instead of being silently reduced, so every element has a
/// single accepted spelling.
pub fn from_decimal<F: PrimeField>(s: &str) -> Result<F, FieldError> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(FieldError::InvalidNumeral(s.to_string()));
    }
    let value = BigUint::parse_bytes(s.as_bytes(), 10)
        .ok_or_else(|| FieldError::InvalidNumeral(s.to_string()))?;
    let modulus: BigUint = F::MODULUS.into();
    if value >= modulus {
        return Err(FieldError::NonCanonical(s.to_string()));
    }
    Ok(F::from(value))
}

/// Decodes a hex string (no `0x` prefix) and reduces it into the field.
pub fn from_hex_mod_order<F: PrimeField>(s: &str) -> Result<F, FieldError> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(FieldError::InvalidHex(s.to_string()));
    }
    let value = BigUint::parse_bytes(s.as_bytes(), 16)
        .ok_or_else(|| FieldError::InvalidHex(s.to_string()))?;
    Ok(F::from(value))
}

/// Renders an element as its canonical decimal numeral.
pub fn to_decimal<F: PrimeField>(value: &F) -> String {
    let n: BigUint = (*value).into();
    n.to_string()
}

/// Renders an element as lowercase hex without leading zeros.
pub fn to_hex<F: PrimeField>(value: &F) -> String {
    let n: BigUint = (*value).into();
    n.to_str_radix(16)
}

/// Minimal big-endian bytes of the element's integer value (empty for zero).
pub fn to_minimal_bytes<F: PrimeField>(value: &F) -> Vec<u8> {
    if value.is_zero() {
        return Vec::new();
    }
    let n: BigUint = (*value).into();
    n.to_bytes_be()
}

/// Encodes an element as exactly [`FIELD_BYTES`] big-endian bytes.
pub fn to_bytes_be<F: PrimeField>(value: &F) -> [u8; FIELD_BYTES] {
    let bytes = value.into_bigint().to_bytes_be();
    let mut out = [0u8; FIELD_BYTES];
    let offset = FIELD_BYTES.saturating_sub(bytes.len());
    out[offset..].copy_from_slice(&bytes[bytes.len().saturating_sub(FIELD_BYTES)..]);
    out
}

/// Decodes exactly [`FIELD_BYTES`] big-endian bytes into a canonical element.
pub fn from_bytes_be<F: PrimeField>(bytes: &[u8]) -> Result<F, FieldError> {
    if bytes.len() != FIELD_BYTES {
        return Err(FieldError::InvalidLength {
            expected: FIELD_BYTES,
            found: bytes.len(),
        });
    }
    let value = BigUint::from_bytes_be(bytes);
    let modulus: BigUint = F::MODULUS.into();
    if value >= modulus {
        return Err(FieldError::NonCanonical(value.to_string()));
    }
    Ok(F::from(value))
}

/// Divides `a` by `b`, failing on a zero divisor.
pub fn div<F: Field>(a: F, b: F) -> Result<F, FieldError> {
    b.inverse()
        .map(|inv| a * inv)
        .ok_or(FieldError::DivisionByZero)
}

/// Computes the ladder `w[0..=s]` of power-of-two roots of unity.
///
/// Starting from `start`, the first quadratic nonresidue `g` is located by
/// Euler's criterion.  With `p - 1 = 2^s * t` (t odd), `w[s] = g^t` and each
/// lower rung is the square of the one above, so `w[i]` has order `2^i`.
pub fn root_ladder<F: PrimeField>(start: F) -> Vec<F> {
    let modulus: BigUint = F::MODULUS.into();
    let half = &modulus >> 1u32;
    let minus_one = -F::one();
    let mut nqr = start;
    while nqr.pow(half.to_u64_digits()) != minus_one {
        nqr += F::one();
    }

    let p_minus_one = modulus - 1u32;
    let s = p_minus_one.trailing_zeros().unwrap_or(0) as usize;
    let t = &p_minus_one >> s;

    let mut ladder = vec![F::one(); s + 1];
    ladder[s] = nqr.pow(t.to_u64_digits());
    for i in (0..s).rev() {
        ladder[i] = ladder[i + 1].square();
    }
    ladder
}

static SCALAR_ROOTS: Lazy<Vec<Fr>> = Lazy::new(|| root_ladder(Fr::from(2u64)));

/// Returns the primitive root of unity generating the domain of size `2^power`.
pub fn domain_generator(power: usize) -> Result<Fr, FieldError> {
    SCALAR_ROOTS
        .get(power)
        .copied()
        .ok_or(FieldError::DomainTooLarge(power))
}

#[cfg(test)]
mod tests {
    use super::*;

    const R: &str =
        "21888242871839275222246405745257275088548364400416034343698204186575808495617";

    #[test]
    fn decimal_rejects_noncanonical_and_garbage() {
        assert_eq!(
            from_decimal::<Fr>(R),
            Err(FieldError::NonCanonical(R.to_string()))
        );
        assert!(matches!(
            from_decimal::<Fr>("12a"),
            Err(FieldError::InvalidNumeral(_))
        ));
        assert!(matches!(
            from_decimal::<Fr>(""),
            Err(FieldError::InvalidNumeral(_))
        ));
        assert!(matches!(
            from_decimal::<Fr>("-1"),
            Err(FieldError::InvalidNumeral(_))
        ));
        let below: Fr = from_decimal(
            "21888242871839275222246405745257275088548364400416034343698204186575808495616",
        )
        .unwrap();
        assert_eq!(below, -Fr::one());
    }

    #[test]
    fn hex_reduces_into_field() {
        let modulus_hex = "30644e72e131a029b85045b68181585d2833e84879b9709143e1f593f0000001";
        assert!(from_hex_mod_order::<Fr>(modulus_hex).unwrap().is_zero());
        assert_eq!(from_hex_mod_order::<Fr>("ff").unwrap(), Fr::from(255u64));
        assert!(from_hex_mod_order::<Fr>("0xff").is_err());
    }

    #[test]
    fn big_endian_encoding_is_fixed_width() {
        let bytes = to_bytes_be(&Fr::from(258u64));
        assert_eq!(bytes[..30], [0u8; 30]);
        assert_eq!(bytes[30..], [1u8, 2u8]);
        assert_eq!(from_bytes_be::<Fr>(&bytes).unwrap(), Fr::from(258u64));
        assert_eq!(
            from_bytes_be::<Fr>(&bytes[1..]),
            Err(FieldError::InvalidLength {
                expected: 32,
                found: 31
            })
        );
        assert!(from_bytes_be::<Fr>(&[0xffu8; 32]).is_err());
    }

    #[test]
    fn minimal_bytes_and_renderings() {
        assert!(to_minimal_bytes(&Fr::zero()).is_empty());
        assert_eq!(to_minimal_bytes(&Fr::from(0x4142u64)), b"AB".to_vec());
        assert_eq!(to_decimal(&Fr::from(1234u64)), "1234");
        assert_eq!(to_hex(&Fr::from(0xabcdu64)), "abcd");
    }

    #[test]
    fn division_by_zero_is_an_error() {
        assert_eq!(div(Fr::one(), Fr::zero()), Err(FieldError::DivisionByZero));
        assert_eq!(div(Fr::from(6u64), Fr::from(3u64)).unwrap(), Fr::from(2u64));
    }

    #[test]
    fn ladder_rungs_have_expected_order() {
        assert_eq!(domain_generator(0).unwrap(), Fr::one());
        for power in [1usize, 3, 11, 28] {
            let w = domain_generator(power).unwrap();
            let mut x = w;
            for _ in 0..power - 1 {
                x = x.square();
            }
            assert_eq!(x, -Fr::one(), "w^(2^(power-1)) must be -1");
            assert_eq!(x.square(), Fr::one());
        }
        assert_eq!(domain_generator(29), Err(FieldError::DomainTooLarge(29)));
    }
}
