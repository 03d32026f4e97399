//! Server identity verification for the transport layer.
//!
//! Fingerprints use the OpenSSH form: `SHA256:` followed by the base64
//! encoding (padding optional) of the SHA-256 digest of the host key blob.

use std::fmt;
use std::str::FromStr;

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD};

use crate::error::Error;

const SHA256_PREFIX: &str = "SHA256:";
const SHA256_LEN: usize = 32;

/// A parsed SHA-256 host-key fingerprint.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct HostKeyFingerprint([u8; SHA256_LEN]);

impl HostKeyFingerprint {
    pub fn from_digest(digest: [u8; SHA256_LEN]) -> Self {
        Self(digest)
    }

    pub fn digest(&self) -> &[u8; SHA256_LEN] {
        &self.0
    }
}

impl FromStr for HostKeyFingerprint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let encoded = s.trim().strip_prefix(SHA256_PREFIX).ok_or_else(|| {
            Error::InvalidFingerprint(format!("expected '{SHA256_PREFIX}<base64>', got '{s}'"))
        })?;

        let bytes = STANDARD_NO_PAD
            .decode(encoded.trim_end_matches('='))
            .or_else(|_| STANDARD.decode(encoded))
            .map_err(|e| Error::InvalidFingerprint(format!("invalid base64: {e}")))?;

        let digest: [u8; SHA256_LEN] = bytes.try_into().map_err(|raw: Vec<u8>| {
            Error::InvalidFingerprint(format!(
                "expected a {SHA256_LEN}-byte digest, got {} bytes",
                raw.len()
            ))
        })?;

        Ok(Self(digest))
    }
}

impl fmt::Display for HostKeyFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{SHA256_PREFIX}{}", STANDARD_NO_PAD.encode(self.0))
    }
}

impl fmt::Debug for HostKeyFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HostKeyFingerprint({self})")
    }
}

/// How a transport must treat the identity the server presents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostKeyPolicy {
    /// Accept whatever key the server presents.
    AcceptAny,
    /// Accept only a key whose SHA-256 digest matches.
    Fingerprint(HostKeyFingerprint),
}

impl HostKeyPolicy {
    /// Check the presented key digest against this policy.
    pub fn verify(&self, presented: &HostKeyFingerprint) -> Result<(), Error> {
        match self {
            Self::AcceptAny => Ok(()),
            Self::Fingerprint(expected) if expected == presented => Ok(()),
            Self::Fingerprint(expected) => Err(Error::HostKeyMismatch {
                expected: expected.to_string(),
                presented: presented.to_string(),
            }),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const FP: &str = "SHA256:47DEQpj8HBSa+/TImW+5JCeuQeRkm5NMpJWZG3hSuFU";

    #[test]
    fn parses_openssh_fingerprint() {
        let fp: HostKeyFingerprint = FP.parse().unwrap();
        assert_eq!(fp.to_string(), FP);
    }

    #[test]
    fn accepts_padded_form() {
        let padded = format!("{FP}=");
        let fp: HostKeyFingerprint = padded.parse().unwrap();
        assert_eq!(fp.to_string(), FP);
    }

    #[test]
    fn rejects_missing_prefix() {
        let err = "47DEQpj8HBSa".parse::<HostKeyFingerprint>().unwrap_err();
        assert!(err.to_string().contains("SHA256:"));
    }

    #[test]
    fn rejects_wrong_length() {
        let err = "SHA256:AAAA".parse::<HostKeyFingerprint>().unwrap_err();
        assert!(err.to_string().contains("32-byte"));
    }

    #[test]
    fn policy_verification() {
        let fp: HostKeyFingerprint = FP.parse().unwrap();
        let other = HostKeyFingerprint::from_digest([7; 32]);

        assert!(HostKeyPolicy::AcceptAny.verify(&other).is_ok());
        assert!(HostKeyPolicy::Fingerprint(fp).verify(&fp).is_ok());
        assert!(matches!(
            HostKeyPolicy::Fingerprint(fp).verify(&other),
            Err(Error::HostKeyMismatch { .. })
        ));
    }
}
