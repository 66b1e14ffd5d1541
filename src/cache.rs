use sha2::{Digest, Sha256};

/// Cache key for one extraction request: the image bytes and the user
/// instruction, digested together. Identical re-uploads hit the cache and
/// skip the paid model call.
pub fn extraction_digest(image: Option<&[u8]>, instruction: &str) -> String {
    let mut hasher = Sha256::new();
    if let Some(bytes) = image {
        hasher.update(bytes);
    }
    hasher.update([0x1f]); // separator so (img, "a") != (img + "a", "")
    hasher.update(instruction.as_bytes());
    hex::encode(hasher.finalize())
}

/// A cached raw extraction with an integrity fingerprint.
///
/// The fingerprint is recomputed on read and mismatches are discarded,
/// so a corrupted entry degrades to a fresh upstream call instead of a
/// bad report.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CachedExtraction {
    /// Cleaned model reply, ready for serde parsing.
    payload: String,
    /// SHA-256 of the payload, hex encoded.
    fingerprint: String,
}

impl CachedExtraction {
    pub fn new(payload: String) -> Self {
        let fingerprint = fingerprint_of(&payload);
        Self {
            payload,
            fingerprint,
        }
    }

    /// Returns the payload only when the fingerprint still matches.
    pub fn verified_payload(&self) -> Option<&str> {
        if fingerprint_of(&self.payload) == self.fingerprint {
            Some(&self.payload)
        } else {
            None
        }
    }
}

fn fingerprint_of(payload: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(payload.as_bytes());
    hex::encode(hasher.finalize())
}
