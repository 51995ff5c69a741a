// Copyright (c) 2025 ADBC Drivers Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Key-pair (JWT) authentication.
//!
//! A [`KeyPairAuthenticator`] owns the [`Credentials`] for the process and
//! produces RS256-signed bearer tokens with these claims:
//!
//! | Claim | Value |
//! |-------|-------|
//! | `iss` | `{ACCOUNT}.{USER}.SHA256:{base64(sha256(DER(publicKey)))}` |
//! | `sub` | `{ACCOUNT}.{USER}` |
//! | `iat` | issue time |
//! | `exp` | issue time + 59 minutes |
//!
//! ## Caching
//!
//! The private key is parsed once and kept for the life of the authenticator.
//! The last issued token is reused until it is within
//! [`TOKEN_REFRESH_BUFFER_MINS`] of expiry.
//!
//! Neither cache holds a lock while signing. Two callers that observe a
//! stale token at the same moment will both sign a new one and the last
//! write wins. Every token produced this way is valid, so the race only
//! costs a redundant signature.

use crate::auth::AuthProvider;
use crate::error::{Error, Result};
use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use rsa::pkcs1::{DecodeRsaPrivateKey, EncodeRsaPrivateKey};
use rsa::pkcs8::{DecodePrivateKey, EncodePublicKey};
use rsa::RsaPrivateKey;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use std::sync::{Arc, OnceLock, RwLock};
use tracing::{debug, info, warn};

/// Lifetime of an issued token. The SQL API rejects lifetimes over 60 minutes.
pub const TOKEN_LIFETIME_MINS: i64 = 59;

/// A cached token is replaced once it is this close to expiry.
pub const TOKEN_REFRESH_BUFFER_MINS: i64 = 5;

/// Where the PEM-encoded private key comes from.
#[derive(Clone)]
pub enum PrivateKeySource {
    /// Path to a PEM file.
    File(PathBuf),
    /// PEM text supplied directly (e.g. from a secret store).
    Inline(String),
}

impl std::fmt::Debug for PrivateKeySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PrivateKeySource::File(path) => f.debug_tuple("File").field(path).finish(),
            PrivateKeySource::Inline(_) => f.debug_tuple("Inline").field(&"<redacted>").finish(),
        }
    }
}

/// Account identity and signing key material.
#[derive(Clone)]
pub struct Credentials {
    pub account: String,
    pub user: String,
    pub private_key: PrivateKeySource,
    pub passphrase: Option<String>,
}

impl Credentials {
    pub fn new(
        account: impl Into<String>,
        user: impl Into<String>,
        private_key: PrivateKeySource,
    ) -> Self {
        Self {
            account: account.into(),
            user: user.into(),
            private_key,
            passphrase: None,
        }
    }

    pub fn with_passphrase(mut self, passphrase: impl Into<String>) -> Self {
        self.passphrase = Some(passphrase.into());
        self
    }

    /// `{ACCOUNT}.{USER}`, upper-cased. Used as the token subject.
    pub fn qualified_username(&self) -> String {
        format!(
            "{}.{}",
            self.account.to_uppercase(),
            self.user.to_uppercase()
        )
    }

    fn read_pem(&self) -> Result<String> {
        match &self.private_key {
            PrivateKeySource::Inline(content) => {
                info!("Loading private key from inline content");
                // Secret stores often flatten newlines into literal "\n".
                if !content.contains('\n') && content.contains("\\n") {
                    Ok(content.replace("\\n", "\n"))
                } else {
                    Ok(content.clone())
                }
            }
            PrivateKeySource::File(path) => {
                info!("Loading private key from file: {}", path.display());
                std::fs::read_to_string(path).map_err(|e| {
                    Error::credential(format!(
                        "Failed to read private key file {}: {}",
                        path.display(),
                        e
                    ))
                })
            }
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("account", &self.account)
            .field("user", &self.user)
            .field("private_key", &self.private_key)
            .field(
                "passphrase",
                &self.passphrase.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

/// A signed bearer token and its validity window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthToken {
    token: String,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl AuthToken {
    pub fn as_str(&self) -> &str {
        &self.token
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// True once `now` is within the refresh buffer of expiry.
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at - Duration::minutes(TOKEN_REFRESH_BUFFER_MINS)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    iss: String,
    sub: String,
    iat: i64,
    exp: i64,
}

/// Parsed key plus the identity strings derived from it.
struct SigningKey {
    encoding_key: EncodingKey,
    issuer: String,
    subject: String,
    fingerprint: String,
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKey")
            .field("issuer", &self.issuer)
            .field("subject", &self.subject)
            .finish_non_exhaustive()
    }
}

impl SigningKey {
    fn load(credentials: &Credentials) -> Result<Self> {
        let pem = credentials.read_pem()?;
        let private_key = parse_private_key(&pem, credentials.passphrase.as_deref())?;

        let fingerprint = public_key_fingerprint(&private_key)?;
        let der = private_key.to_pkcs1_der().map_err(|e| {
            Error::credential(format!("Failed to encode private key for signing: {}", e))
        })?;

        let subject = credentials.qualified_username();
        Ok(Self {
            encoding_key: EncodingKey::from_rsa_der(der.as_bytes()),
            issuer: format!("{}.{}", subject, fingerprint),
            subject,
            fingerprint,
        })
    }

    fn issue(&self, now: DateTime<Utc>) -> Result<AuthToken> {
        let expires_at = now + Duration::minutes(TOKEN_LIFETIME_MINS);
        let claims = Claims {
            iss: self.issuer.clone(),
            sub: self.subject.clone(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::RS256), &claims, &self.encoding_key)
            .map_err(|e| Error::credential(format!("Failed to sign JWT: {}", e)))?;

        Ok(AuthToken {
            token,
            issued_at: now,
            expires_at,
        })
    }
}

/// Parse PKCS#8 (plain or encrypted) or PKCS#1 PEM.
fn parse_private_key(pem: &str, passphrase: Option<&str>) -> Result<RsaPrivateKey> {
    let pem = pem.trim();

    if pem.contains("BEGIN ENCRYPTED PRIVATE KEY") {
        let passphrase = passphrase.ok_or_else(|| {
            Error::credential("Private key is encrypted but no passphrase is configured")
        })?;
        return RsaPrivateKey::from_pkcs8_encrypted_pem(pem, passphrase.as_bytes())
            .map_err(|e| Error::credential(format!("Failed to decrypt private key: {}", e)));
    }

    if passphrase.is_some() {
        warn!("Private key passphrase configured but the key is not encrypted; ignoring it");
    }

    if pem.contains("BEGIN RSA PRIVATE KEY") {
        return RsaPrivateKey::from_pkcs1_pem(pem)
            .map_err(|e| Error::credential(format!("Failed to parse private key: {}", e)));
    }

    RsaPrivateKey::from_pkcs8_pem(pem)
        .map_err(|e| Error::credential(format!("Failed to parse private key: {}", e)))
}

/// `SHA256:` + base64 of the SHA-256 digest of the SubjectPublicKeyInfo DER.
fn public_key_fingerprint(private_key: &RsaPrivateKey) -> Result<String> {
    let der = private_key
        .to_public_key()
        .to_public_key_der()
        .map_err(|e| Error::credential(format!("Failed to encode public key: {}", e)))?;
    let digest = Sha256::digest(der.as_bytes());
    Ok(format!("SHA256:{}", STANDARD.encode(digest)))
}

/// Issues and caches key-pair JWTs.
///
/// One instance is created at startup and shared (behind an `Arc`) by every
/// request. Token generation never touches the network.
#[derive(Debug)]
pub struct KeyPairAuthenticator {
    credentials: Credentials,
    signing_key: OnceLock<Arc<SigningKey>>,
    cached_token: RwLock<Option<AuthToken>>,
}

impl KeyPairAuthenticator {
    /// Create an authenticator. The key is not read until first use.
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            signing_key: OnceLock::new(),
            cached_token: RwLock::new(None),
        }
    }

    /// Create an authenticator and load the key immediately, so a bad key
    /// fails at startup rather than on the first query.
    pub fn try_new(credentials: Credentials) -> Result<Self> {
        let auth = Self::new(credentials);
        auth.signing_key()?;
        Ok(auth)
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Public key fingerprint in the form registered with the account
    /// (`SHA256:...`).
    pub fn public_key_fingerprint(&self) -> Result<String> {
        Ok(self.signing_key()?.fingerprint.clone())
    }

    /// Current token, regenerated if absent or close to expiry.
    pub fn get_token(&self) -> Result<AuthToken> {
        self.token_at(Utc::now())
    }

    /// Same as [`get_token`](Self::get_token) with an explicit clock reading.
    pub fn token_at(&self, now: DateTime<Utc>) -> Result<AuthToken> {
        if let Some(token) = self.cached() {
            if !token.needs_refresh(now) {
                return Ok(token);
            }
        }

        let token = self.signing_key()?.issue(now)?;
        debug!(
            "Issued new JWT for {} (expires {})",
            self.credentials.qualified_username(),
            token.expires_at
        );

        let mut cached = self
            .cached_token
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *cached = Some(token.clone());

        Ok(token)
    }

    fn cached(&self) -> Option<AuthToken> {
        self.cached_token
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn signing_key(&self) -> Result<Arc<SigningKey>> {
        if let Some(key) = self.signing_key.get() {
            return Ok(Arc::clone(key));
        }
        let loaded = Arc::new(SigningKey::load(&self.credentials).inspect_err(|e| {
            tracing::error!("Failed to load private key: {}", e);
        })?);
        Ok(Arc::clone(self.signing_key.get_or_init(|| loaded)))
    }
}

impl AuthProvider for KeyPairAuthenticator {
    fn get_auth_header(&self) -> Result<String> {
        Ok(format!("Bearer {}", self.get_token()?.as_str()))
    }

    fn token_type(&self) -> &'static str {
        "KEYPAIR_JWT"
    }
}
