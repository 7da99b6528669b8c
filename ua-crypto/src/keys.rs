// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0

use ua_types::{ByteString, Error, StatusCode};

use crate::{hmac_sign, hmac_verify, AesKey, SecurityPolicy};

/// Keys protecting one direction of a channel under one token.
#[derive(Clone)]
pub struct DerivedKeys {
    /// HMAC key.
    pub signing_key: Vec<u8>,
    /// AES key.
    pub encryption_key: AesKey,
    /// Initialization vector.
    pub iv: Vec<u8>,
}

impl std::fmt::Debug for DerivedKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedKeys").finish_non_exhaustive()
    }
}

/// The keys of both directions of a channel under one token.
#[derive(Debug, Clone)]
pub struct ChannelKeys {
    policy: SecurityPolicy,
    /// Keys for what the client sends.
    client: Option<DerivedKeys>,
    /// Keys for what the server sends.
    server: Option<DerivedKeys>,
}

impl ChannelKeys {
    /// Derive channel keys from the nonces exchanged in `OpenSecureChannel`.
    /// The `None` policy has no keys.
    pub fn derive(
        policy: SecurityPolicy,
        client_nonce: &ByteString,
        server_nonce: &ByteString,
    ) -> Result<Self, Error> {
        if !policy.is_secure() {
            return Ok(Self {
                policy,
                client: None,
                server: None,
            });
        }
        policy.validate_nonce(client_nonce)?;
        policy.validate_nonce(server_nonce)?;
        let client_nonce = client_nonce.value.as_deref().unwrap_or_default();
        let server_nonce = server_nonce.value.as_deref().unwrap_or_default();
        Ok(Self {
            policy,
            client: Some(policy.derive_keys(server_nonce, client_nonce)?),
            server: Some(policy.derive_keys(client_nonce, server_nonce)?),
        })
    }

    /// The policy the keys were derived for.
    pub fn policy(&self) -> SecurityPolicy {
        self.policy
    }

    /// Keys for what the given side sends.
    pub fn sending(&self, is_server: bool) -> Option<&DerivedKeys> {
        if is_server {
            self.server.as_ref()
        } else {
            self.client.as_ref()
        }
    }

    /// Keys for what the given side receives.
    pub fn receiving(&self, is_server: bool) -> Option<&DerivedKeys> {
        self.sending(!is_server)
    }
}

impl DerivedKeys {
    /// Sign `data`.
    pub fn sign(&self, policy: SecurityPolicy, data: &[u8]) -> Result<Vec<u8>, Error> {
        let hash = policy.hash().ok_or_else(|| {
            Error::new(StatusCode::BadSecurityPolicyRejected, "Policy does not sign")
        })?;
        Ok(hmac_sign(hash, &self.signing_key, data))
    }

    /// Verify the signature over `data`.
    pub fn verify(&self, policy: SecurityPolicy, data: &[u8], signature: &[u8]) -> Result<(), Error> {
        let hash = policy.hash().ok_or_else(|| {
            Error::new(StatusCode::BadSecurityPolicyRejected, "Policy does not sign")
        })?;
        hmac_verify(hash, &self.signing_key, data, signature)
    }

    /// Encrypt block aligned data.
    pub fn encrypt(&self, data: &[u8]) -> Result<Vec<u8>, Error> {
        self.encryption_key.encrypt(data, &self.iv)
    }

    /// Decrypt block aligned data.
    pub fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>, Error> {
        self.encryption_key.decrypt(data, &self.iv)
    }
}

#[cfg(test)]
mod tests {
    use ua_types::{ByteString, StatusCode};

    use super::ChannelKeys;
    use crate::SecurityPolicy;

    #[test]
    fn directions_differ_and_agree() {
        let policy = SecurityPolicy::Basic256Sha256;
        let client_nonce = policy.random_nonce();
        let server_nonce = policy.random_nonce();
        let on_client = ChannelKeys::derive(policy, &client_nonce, &server_nonce).unwrap();
        let on_server = ChannelKeys::derive(policy, &client_nonce, &server_nonce).unwrap();

        let sent = on_client.sending(false).unwrap();
        let received = on_server.receiving(true).unwrap();
        let sig = sent.sign(policy, b"hello").unwrap();
        received.verify(policy, b"hello", &sig).unwrap();

        // The other direction uses different keys.
        let other = on_server.sending(true).unwrap();
        assert!(other.verify(policy, b"hello", &sig).is_err());
        assert_ne!(sent.iv, other.iv);
    }

    #[test]
    fn mismatched_nonces_fail_checks() {
        let _ = env_logger::builder().is_test(true).try_init();
        let policy = SecurityPolicy::Aes128Sha256RsaOaep;
        let server_nonce = policy.random_nonce();
        let on_client =
            ChannelKeys::derive(policy, &policy.random_nonce(), &server_nonce).unwrap();
        let on_server =
            ChannelKeys::derive(policy, &policy.random_nonce(), &server_nonce).unwrap();
        let sent = on_client.sending(false).unwrap();
        let received = on_server.receiving(true).unwrap();

        let sig = sent.sign(policy, b"hello").unwrap();
        let err = received.verify(policy, b"hello", &sig).unwrap_err();
        assert_eq!(err.status(), StatusCode::BadSecurityChecksFailed);

        let short = ByteString::from(vec![0u8; 3]);
        let err = ChannelKeys::derive(policy, &short, &server_nonce).unwrap_err();
        assert_eq!(err.status(), StatusCode::BadNonceInvalid);
    }

    #[test]
    fn none_policy_has_no_keys() {
        let keys = ChannelKeys::derive(
            SecurityPolicy::None,
            &Default::default(),
            &Default::default(),
        )
        .unwrap();
        assert!(keys.sending(true).is_none());
    }
}
