//! Emails submitted for detection.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// An email as sent to the detection service
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Email {
    /// Sender address or display name
    #[serde(default)]
    pub sender: String,

    /// Subject line
    #[serde(default)]
    pub subject: String,

    /// Plain-text body; highlight offsets index into this
    #[serde(default)]
    pub body: String,
}

impl Email {
    pub fn new(
        sender: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            sender: sender.into(),
            subject: subject.into(),
            body: body.into(),
        }
    }

    /// Deterministic 16-hex-char identity of this email
    ///
    /// Fields are length-prefixed so that moving text between the sender,
    /// subject and body never produces the same ident.
    pub fn ident(&self) -> String {
        let mut hasher = Sha256::new();
        for field in [&self.sender, &self.subject, &self.body] {
            hasher.update((field.len() as u64).to_le_bytes());
            hasher.update(field.as_bytes());
        }
        let result = hasher.finalize();
        hex::encode(&result[..8]) // 16 hex chars = 8 bytes
    }
}

/// Compute the key identifying a batch of emails
///
/// Order matters: the service answers positionally, so a reordered batch
/// is a different batch.
pub fn batch_key(emails: &[Email]) -> String {
    let mut hasher = Sha256::new();
    for email in emails {
        hasher.update(email.ident().as_bytes());
    }
    format!("sha256:{}", hex::encode(hasher.finalize()))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum EmailBatchFile {
    Wrapped { emails: Vec<Email> },
    Bare(Vec<Email>),
}

/// Parse a batch of emails from JSON
///
/// Accepts either a bare array or the request shape `{"emails": [...]}`.
pub fn parse_email_batch(json: &str) -> serde_json::Result<Vec<Email>> {
    let batch: EmailBatchFile = serde_json::from_str(json)?;
    Ok(match batch {
        EmailBatchFile::Wrapped { emails } => emails,
        EmailBatchFile::Bare(emails) => emails,
    })
}
