//! Document-chip authentication seam.
//!
//! Registration carries the data a passport chip produced: the identity
//! commitment `h`, the active-authentication signature over it, the chip's
//! public-key data group (DG15) and the security object (SOD).  Checking
//! them is delegated to a [`ChipAuthenticator`].

use serde::{Deserialize, Serialize};

/// Registration payload (`vdata`), every field hex encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationData {
    /// Identity commitment inserted into the tree.
    pub h: String,
    /// Active-authentication signature over `h`.
    #[serde(rename = "aaSig")]
    pub aa_sig: String,
    /// DG15 data group holding the chip public key.
    pub dg15: String,
    /// Document security object.
    pub sod: String,
}

impl RegistrationData {
    /// Structural check: `h` is non-empty hex and the binary fields decode.
    pub fn check_encoding(&self) -> Result<(), String> {
        if self.h.is_empty() || !self.h.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(format!("h is not a hex string: {:?}", self.h));
        }
        for (name, value) in [
            ("aaSig", &self.aa_sig),
            ("dg15", &self.dg15),
            ("sod", &self.sod),
        ] {
            if value.is_empty() {
                return Err(format!("{name} is empty"));
            }
            hex::decode(value).map_err(|err| format!("{name}: {err}"))?;
        }
        Ok(())
    }

    /// Key under which the chip is recorded as used.
    pub fn identity_key(&self) -> String {
        self.dg15.to_ascii_lowercase()
    }
}

/// Verifies document chips during registration.
pub trait ChipAuthenticator: Send + Sync {
    /// Passive authentication: the SOD is signed by a trusted issuer and
    /// lists the hash of `dg15`.
    fn verify_passive(&self, dg15: &str, sod: &str) -> bool;

    /// Active authentication: `aa_sig` is a signature over `h` by the key in `dg15`.
    fn verify_active(&self, h: &str, aa_sig: &str, dg15: &str) -> bool;
}

/// Accepts every chip.
///
/// For replaying blocks whose registrations were authenticated upstream.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrustAll;

impl ChipAuthenticator for TrustAll {
    fn verify_passive(&self, _dg15: &str, _sod: &str) -> bool {
        true
    }

    fn verify_active(&self, _h: &str, _aa_sig: &str, _dg15: &str) -> bool {
        true
    }
}
