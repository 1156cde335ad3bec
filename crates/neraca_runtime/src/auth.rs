use crate::errors::RuntimeError;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

const HASHED_PREFIX: &str = "sha256:";

/// Shared secret guarding write endpoints. Candidates are compared by SHA-256
/// digest in constant time. Without a configured secret every check fails.
#[derive(Clone, Default)]
pub struct SharedSecret {
    digest: Option<[u8; 32]>,
}

impl std::fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedSecret")
            .field("configured", &self.is_configured())
            .finish()
    }
}

fn digest(value: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    out
}

impl SharedSecret {
    /// Accepts a plain secret or a pre-hashed `sha256:<hex>` value.
    pub fn new(secret: Option<&str>) -> Result<Self, RuntimeError> {
        let Some(secret) = secret.filter(|s| !s.is_empty()) else {
            return Ok(Self::disabled());
        };

        let digest = if let Some(hex_digest) = secret.strip_prefix(HASHED_PREFIX) {
            let bytes = hex::decode(hex_digest)
                .map_err(|e| RuntimeError::InternalError(format!("Invalid secret digest: {}", e)))?;
            <[u8; 32]>::try_from(bytes.as_slice())
                .map_err(|_| RuntimeError::InternalError("Secret digest must be 32 bytes".to_string()))?
        } else {
            digest(secret)
        };

        Ok(Self { digest: Some(digest) })
    }

    pub fn disabled() -> Self {
        Self { digest: None }
    }

    pub fn is_configured(&self) -> bool {
        self.digest.is_some()
    }

    pub fn verify(&self, candidate: Option<&str>) -> Result<(), RuntimeError> {
        let wrong = || RuntimeError::Unauthorized("Wrong Password".to_string());
        let expected = self.digest.ok_or_else(wrong)?;
        let candidate = candidate.ok_or_else(wrong)?;

        if bool::from(digest(candidate)[..].ct_eq(&expected[..])) {
            Ok(())
        } else {
            Err(wrong())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_secret() {
        let secret = SharedSecret::new(Some("1234")).unwrap();
        assert!(secret.verify(Some("1234")).is_ok());
        assert_eq!(
            secret.verify(Some("4321")),
            Err(RuntimeError::Unauthorized("Wrong Password".to_string()))
        );
        assert!(secret.verify(None).is_err());
    }

    #[test]
    fn test_prehashed_secret() {
        let hashed = format!("sha256:{}", hex::encode(digest("rahasia")));
        let secret = SharedSecret::new(Some(&hashed)).unwrap();
        assert!(secret.verify(Some("rahasia")).is_ok());
        assert!(secret.verify(Some(&hashed)).is_err());
    }

    #[test]
    fn test_unconfigured_secret_rejects_everything() {
        let secret = SharedSecret::new(None).unwrap();
        assert!(!secret.is_configured());
        assert!(secret.verify(Some("")).is_err());
        assert!(secret.verify(None).is_err());
    }

    #[test]
    fn test_bad_digest_is_rejected_at_startup() {
        assert!(SharedSecret::new(Some("sha256:zz")).is_err());
        assert!(SharedSecret::new(Some("sha256:abcd")).is_err());
    }
}
