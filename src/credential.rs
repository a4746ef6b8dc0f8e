//! Stored credential tokens.
//!
//! A password in the config file is either plain text or `<base64 ciphertext>,<iv>`
//! produced with the shared quicklinks key. The token is parsed when the config
//! is loaded and decrypted when the password is actually needed.

use std::fmt;
use std::str::FromStr;

use crate::cipher;
use crate::errors::LinkError;

/// Secret key shared with the external producer of encrypted tokens. Both sides
/// MUST use the same value; only its first 32 characters are significant.
pub const SHARED_SECRET_KEY: &str = "QuicklinksIsHandyToolInProntoOften";

/// A password as stored in configuration.
#[derive(Clone, PartialEq, Eq)]
pub enum StoredCredential {
    Plain(String),
    Encrypted { ciphertext: String, iv: String },
}

impl StoredCredential {
    /// Parse a config token by comma-separated field count.
    pub fn parse(token: &str) -> Result<Self, LinkError> {
        let fields: Vec<&str> = token.split(',').collect();
        match fields.as_slice() {
            [plain] => Ok(StoredCredential::Plain((*plain).to_string())),
            [ciphertext, iv] => Ok(StoredCredential::Encrypted {
                ciphertext: (*ciphertext).to_string(),
                iv: (*iv).to_string(),
            }),
            _ => Err(LinkError::invalid_parameter(
                "password",
                format!("more than 2 comma separated entries ({})", fields.len()),
            )),
        }
    }

    /// Encrypt `plaintext` with the shared key and `iv`, producing an encrypted token.
    pub fn seal(plaintext: &str, iv: &str) -> Result<Self, LinkError> {
        if iv.contains(',') {
            return Err(LinkError::invalid_parameter(
                "initialisation vector",
                "must not contain ',' (the token separator)",
            ));
        }
        let ciphertext = cipher::encrypt(plaintext, SHARED_SECRET_KEY, iv)?;
        Ok(StoredCredential::Encrypted {
            ciphertext,
            iv: iv.to_string(),
        })
    }

    /// Decrypt with the shared key.
    pub fn reveal(&self) -> Result<String, LinkError> {
        self.reveal_with(SHARED_SECRET_KEY)
    }

    /// Decrypt with an explicit key (plain tokens are returned verbatim).
    pub fn reveal_with(&self, key: &str) -> Result<String, LinkError> {
        match self {
            StoredCredential::Plain(p) => Ok(p.clone()),
            StoredCredential::Encrypted { ciphertext, iv } => cipher::decrypt(ciphertext, key, iv),
        }
    }

    pub fn is_encrypted(&self) -> bool {
        matches!(self, StoredCredential::Encrypted { .. })
    }

    /// Render back into config token form.
    pub fn to_token(&self) -> String {
        match self {
            StoredCredential::Plain(p) => p.clone(),
            StoredCredential::Encrypted { ciphertext, iv } => format!("{ciphertext},{iv}"),
        }
    }
}

impl FromStr for StoredCredential {
    type Err = LinkError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

// Never print secrets, not even the ciphertext.
impl fmt::Debug for StoredCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoredCredential::Plain(_) => f.write_str("StoredCredential::Plain(<redacted>)"),
            StoredCredential::Encrypted { .. } => f.write_str("StoredCredential::Encrypted(<redacted>)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_is_redacted() {
        let c = StoredCredential::parse("hunter2").unwrap();
        assert!(!format!("{c:?}").contains("hunter2"));
    }

    #[test]
    fn token_roundtrip() {
        let sealed = StoredCredential::seal("sillypassword", "0123456789abcdefXYZ").unwrap();
        let again = StoredCredential::parse(&sealed.to_token()).unwrap();
        assert_eq!(again, sealed);
        assert_eq!(again.reveal().unwrap(), "sillypassword");
    }
}
