use hmac::{Hmac, Mac};
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::CryptoError;

type HmacSha256 = Hmac<Sha256>;

/// Length in bytes of an HMAC-SHA256 tag.
pub const SIGNATURE_LENGTH: usize = 32;

/// Shared secret used to sign and verify tokens.
///
/// The keyed MAC is prepared once at construction, so an unusable secret is
/// reported when configuration is loaded rather than on first use.
#[derive(Clone)]
pub struct SigningSecret {
    bytes: Zeroizing<Vec<u8>>,
    mac: HmacSha256,
}

impl SigningSecret {
    /// Construct a secret from raw bytes. Empty or whitespace-only input is
    /// rejected.
    pub fn new<B>(bytes: B) -> Result<Self, CryptoError>
    where
        B: Into<Vec<u8>>,
    {
        let bytes = Zeroizing::new(bytes.into());
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Err(CryptoError::EmptySecret);
        }
        let mac = <HmacSha256 as Mac>::new_from_slice(&bytes)
            .map_err(|_| CryptoError::EmptySecret)?;
        Ok(Self { bytes, mac })
    }

    /// Raw secret bytes, for handing to signing libraries.
    pub fn expose(&self) -> &[u8] {
        &self.bytes
    }
}

impl std::fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningSecret")
            .field("bytes", &"***redacted***")
            .finish()
    }
}

/// Compute HMAC-SHA256 of `message` under `secret`.
pub fn sign(secret: &SigningSecret, message: &[u8]) -> [u8; SIGNATURE_LENGTH] {
    let mut mac = secret.mac.clone();
    mac.update(message);
    let digest = mac.finalize().into_bytes();
    let mut out = [0u8; SIGNATURE_LENGTH];
    out.copy_from_slice(&digest);
    out
}

/// Recompute the tag for `message` and compare it with `signature` in
/// constant time.
pub fn verify(secret: &SigningSecret, message: &[u8], signature: &[u8]) -> bool {
    let mut mac = secret.mac.clone();
    mac.update(message);
    mac.verify_slice(signature).is_ok()
}
