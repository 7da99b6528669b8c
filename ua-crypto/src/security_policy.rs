// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0

//! The supported security policies and the fixed symmetric parameters of
//! each.

use std::{fmt, str::FromStr};

use log::debug;
use serde::{Deserialize, Serialize};
use ua_types::{ByteString, Error, StatusCode};

use crate::{
    hash::{p_sha, HashAlgorithm},
    keys::DerivedKeys,
    random, AesKey,
};

/// Symmetric parameters of a security policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyParams {
    /// Policy URI.
    pub uri: &'static str,
    /// Digest for signatures and key derivation. `None` for the `None` policy.
    pub hash: Option<HashAlgorithm>,
    /// Length of the derived signing key.
    pub signing_key_length: usize,
    /// Length of the AES key.
    pub encryption_key_length: usize,
    /// AES block size, also the IV length.
    pub block_size: usize,
    /// Length of the nonces exchanged when opening a channel.
    pub nonce_length: usize,
}

const POLICY_NONE_URI: &str = "http://opcfoundation.org/UA/SecurityPolicy#None";

static POLICY_TABLE: [(SecurityPolicy, PolicyParams); 5] = [
    (
        SecurityPolicy::None,
        PolicyParams {
            uri: POLICY_NONE_URI,
            hash: None,
            signing_key_length: 0,
            encryption_key_length: 0,
            block_size: 0,
            nonce_length: 0,
        },
    ),
    (
        SecurityPolicy::Basic256,
        PolicyParams {
            uri: "http://opcfoundation.org/UA/SecurityPolicy#Basic256",
            hash: Some(HashAlgorithm::Sha1),
            signing_key_length: 24,
            encryption_key_length: 32,
            block_size: 16,
            nonce_length: 32,
        },
    ),
    (
        SecurityPolicy::Basic256Sha256,
        PolicyParams {
            uri: "http://opcfoundation.org/UA/SecurityPolicy#Basic256Sha256",
            hash: Some(HashAlgorithm::Sha256),
            signing_key_length: 32,
            encryption_key_length: 32,
            block_size: 16,
            nonce_length: 32,
        },
    ),
    (
        SecurityPolicy::Aes128Sha256RsaOaep,
        PolicyParams {
            uri: "http://opcfoundation.org/UA/SecurityPolicy#Aes128_Sha256_RsaOaep",
            hash: Some(HashAlgorithm::Sha256),
            signing_key_length: 32,
            encryption_key_length: 16,
            block_size: 16,
            nonce_length: 32,
        },
    ),
    (
        SecurityPolicy::Aes256Sha256RsaPss,
        PolicyParams {
            uri: "http://opcfoundation.org/UA/SecurityPolicy#Aes256_Sha256_RsaPss",
            hash: Some(HashAlgorithm::Sha256),
            signing_key_length: 32,
            encryption_key_length: 32,
            block_size: 16,
            nonce_length: 32,
        },
    ),
];

/// A security policy. The parameters of each policy live in one immutable
/// table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SecurityPolicy {
    /// No signing or encryption.
    None,
    /// HMAC-SHA1 signatures, AES-256-CBC, `P_SHA1`.
    Basic256,
    /// HMAC-SHA256 signatures, AES-256-CBC, `P_SHA256`.
    Basic256Sha256,
    /// HMAC-SHA256 signatures, AES-128-CBC, `P_SHA256`.
    #[serde(rename = "Aes128-Sha256-RsaOaep")]
    Aes128Sha256RsaOaep,
    /// HMAC-SHA256 signatures, AES-256-CBC, `P_SHA256`.
    #[serde(rename = "Aes256-Sha256-RsaPss")]
    Aes256Sha256RsaPss,
}

impl fmt::Display for SecurityPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_uri())
    }
}

impl FromStr for SecurityPolicy {
    type Err = Error;

    /// Parse a policy from its URI or its short name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        POLICY_TABLE
            .iter()
            .find(|(p, params)| params.uri == s || p.short_name() == s)
            .map(|(p, _)| *p)
            .ok_or_else(|| {
                Error::new(
                    StatusCode::BadSecurityPolicyRejected,
                    format!("Unknown security policy {s}"),
                )
            })
    }
}

impl SecurityPolicy {
    /// Every supported policy.
    pub fn all() -> impl Iterator<Item = SecurityPolicy> {
        POLICY_TABLE.iter().map(|(p, _)| *p)
    }

    /// The symmetric parameters of this policy.
    pub fn params(&self) -> &'static PolicyParams {
        // The table has one row per variant, in declaration order.
        &POLICY_TABLE[*self as usize].1
    }

    /// Policy URI.
    pub fn to_uri(&self) -> &'static str {
        self.params().uri
    }

    /// Short name, the fragment of the URI.
    pub fn short_name(&self) -> &'static str {
        match self {
            SecurityPolicy::None => "None",
            SecurityPolicy::Basic256 => "Basic256",
            SecurityPolicy::Basic256Sha256 => "Basic256Sha256",
            SecurityPolicy::Aes128Sha256RsaOaep => "Aes128-Sha256-RsaOaep",
            SecurityPolicy::Aes256Sha256RsaPss => "Aes256-Sha256-RsaPss",
        }
    }

    /// `true` for every policy but `None`.
    pub fn is_secure(&self) -> bool {
        self.params().hash.is_some()
    }

    /// Digest used for signatures.
    pub fn hash(&self) -> Option<HashAlgorithm> {
        self.params().hash
    }

    /// Length of a signature, zero for `None`.
    pub fn signature_size(&self) -> usize {
        self.hash().map_or(0, |h| h.size())
    }

    /// A fresh nonce of the length this policy requires. The `None` policy
    /// uses an empty nonce.
    pub fn random_nonce(&self) -> ByteString {
        match self.params().nonce_length {
            0 => ByteString::null(),
            n => random::byte_string(n),
        }
    }

    /// Check a nonce received from the peer.
    pub fn validate_nonce(&self, nonce: &ByteString) -> Result<(), Error> {
        let expected = self.params().nonce_length;
        if expected == 0 || nonce.len() == expected {
            Ok(())
        } else {
            debug!(
                "Rejecting {} byte nonce for {}",
                nonce.len(),
                self.short_name()
            );
            Err(Error::new(
                StatusCode::BadNonceInvalid,
                format!(
                    "Nonce for {} must be {expected} bytes, got {}",
                    self.short_name(),
                    nonce.len()
                ),
            ))
        }
    }

    /// Derive the signing key, encryption key and IV used by one side of a
    /// channel. Keys protecting what the client sends are derived with the
    /// server nonce as secret and the client nonce as seed, and the other
    /// way around for what the server sends.
    pub fn derive_keys(&self, secret: &[u8], seed: &[u8]) -> Result<DerivedKeys, Error> {
        let params = self.params();
        let Some(hash) = params.hash else {
            return Err(Error::new(
                StatusCode::BadSecurityPolicyRejected,
                "No keys are derived for the None policy",
            ));
        };
        let total = params.signing_key_length + params.encryption_key_length + params.block_size;
        let bytes = p_sha(hash, secret, seed, total);
        let (signing_key, rest) = bytes.split_at(params.signing_key_length);
        let (encryption_key, iv) = rest.split_at(params.encryption_key_length);
        Ok(DerivedKeys {
            signing_key: signing_key.to_vec(),
            encryption_key: AesKey::new(*self, encryption_key),
            iv: iv.to_vec(),
        })
    }
}
