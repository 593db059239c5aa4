use sha2::{Digest, Sha256};

/// Content hash identifying one audit run's input.
///
/// SHA-256 of the addendum's full extracted text, hex-encoded. Equal text
/// yields equal fingerprints, which keys the result cache and lets a session
/// survive re-submission of the same addendum.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn of_text(text: &str) -> Self {
        let digest = Sha256::digest(text.as_bytes());
        let hex: String = digest.iter().map(|byte| format!("{byte:02x}")).collect();
        Self(hex)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Short prefix for logs; the full hash is rarely useful to a human.
        f.write_str(&self.0[..12.min(self.0.len())])
    }
}
