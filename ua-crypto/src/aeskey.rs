// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0

//! AES-CBC encryption with keys derived for a secure channel.

use aes::cipher::{
    block_padding::NoPadding, generic_array::GenericArray, BlockDecryptMut, BlockEncryptMut,
    KeyIvInit,
};
use log::error;
use ua_types::{Error, StatusCode};

use crate::SecurityPolicy;

type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;
type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;
type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

const AES_BLOCK_SIZE: usize = 16;
const AES128_KEY_SIZE: usize = 16;
const AES256_KEY_SIZE: usize = 32;

type EncryptResult = Result<Vec<u8>, Error>;

/// An AES key for a security policy. Input to [`AesKey::encrypt`] must be a
/// multiple of the block size; padding is added by the caller.
#[derive(Clone)]
pub struct AesKey {
    value: Vec<u8>,
    security_policy: SecurityPolicy,
}

impl std::fmt::Debug for AesKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AesKey")
            .field("security_policy", &self.security_policy)
            .finish_non_exhaustive()
    }
}

impl AesKey {
    /// Create a new AES key with the given security policy and raw value.
    pub fn new(security_policy: SecurityPolicy, value: &[u8]) -> AesKey {
        AesKey {
            value: value.to_vec(),
            security_policy,
        }
    }

    /// Raw value of the key.
    pub fn value(&self) -> &[u8] {
        &self.value
    }

    /// Block size of the cipher.
    pub fn block_size(&self) -> usize {
        if self.security_policy.is_secure() {
            AES_BLOCK_SIZE
        } else {
            0
        }
    }

    fn validate_aes_args(&self, src: &[u8], iv: &[u8]) -> Result<(), Error> {
        let expected_key = self.security_policy.params().encryption_key_length;
        if !matches!(expected_key, AES128_KEY_SIZE | AES256_KEY_SIZE) {
            Err(Error::new(
                StatusCode::BadSecurityPolicyRejected,
                format!("{} does not encrypt", self.security_policy.short_name()),
            ))
        } else if self.value.len() != expected_key {
            Err(Error::new(
                StatusCode::BadUnexpectedError,
                format!("Key is {} bytes, expected {expected_key}", self.value.len()),
            ))
        } else if iv.len() != AES_BLOCK_SIZE {
            Err(Error::new(
                StatusCode::BadUnexpectedError,
                format!("IV is not an expected size, len = {}", iv.len()),
            ))
        } else if src.len() % AES_BLOCK_SIZE != 0 {
            Err(Error::new(
                StatusCode::BadSecurityChecksFailed,
                format!("Length {} is not a multiple of the block size", src.len()),
            ))
        } else {
            Ok(())
        }
    }

    /// Encrypt `src` with the given IV.
    pub fn encrypt(&self, src: &[u8], iv: &[u8]) -> EncryptResult {
        self.validate_aes_args(src, iv)?;
        let iv = GenericArray::from_slice(iv);
        let mut dst = vec![0u8; src.len()];
        let res = if self.value.len() == AES128_KEY_SIZE {
            Aes128CbcEnc::new(GenericArray::from_slice(&self.value), iv)
                .encrypt_padded_b2b_mut::<NoPadding>(src, &mut dst)
                .map(|_| ())
        } else {
            Aes256CbcEnc::new(GenericArray::from_slice(&self.value), iv)
                .encrypt_padded_b2b_mut::<NoPadding>(src, &mut dst)
                .map(|_| ())
        };
        res.map_err(|e| {
            error!("Encryption of {} bytes failed: {e}", src.len());
            Error::new(StatusCode::BadUnexpectedError, e.to_string())
        })?;
        Ok(dst)
    }

    /// Decrypt `src` with the given IV.
    pub fn decrypt(&self, src: &[u8], iv: &[u8]) -> EncryptResult {
        self.validate_aes_args(src, iv)?;
        let iv = GenericArray::from_slice(iv);
        let mut dst = vec![0u8; src.len()];
        let res = if self.value.len() == AES128_KEY_SIZE {
            Aes128CbcDec::new(GenericArray::from_slice(&self.value), iv)
                .decrypt_padded_b2b_mut::<NoPadding>(src, &mut dst)
                .map(|_| ())
        } else {
            Aes256CbcDec::new(GenericArray::from_slice(&self.value), iv)
                .decrypt_padded_b2b_mut::<NoPadding>(src, &mut dst)
                .map(|_| ())
        };
        res.map_err(|e| {
            error!("Decryption of {} bytes failed: {e}", src.len());
            Error::new(StatusCode::BadSecurityChecksFailed, e.to_string())
        })?;
        Ok(dst)
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::AesKey;
    use crate::SecurityPolicy;

    #[test]
    fn aes_key_cross_thread() {
        let k = AesKey::new(SecurityPolicy::Basic256, &[1; 32]);
        let child = thread::spawn(move || k.encrypt(&[0u8; 16], &[0u8; 16]).map(|v| v.len()));
        assert_eq!(child.join().unwrap().unwrap(), 16);
    }

    #[test]
    fn encrypt_decrypt() {
        let iv = [7u8; 16];
        let plain: Vec<u8> = (0..48u8).collect();
        for (policy, len) in [
            (SecurityPolicy::Aes128Sha256RsaOaep, 16),
            (SecurityPolicy::Basic256Sha256, 32),
        ] {
            let key = AesKey::new(policy, &vec![3u8; len]);
            let cipher = key.encrypt(&plain, &iv).unwrap();
            assert_ne!(cipher, plain);
            assert_eq!(key.decrypt(&cipher, &iv).unwrap(), plain);
        }
    }

    #[test]
    fn bad_arguments() {
        let key = AesKey::new(SecurityPolicy::Basic256, &[1; 32]);
        assert!(key.encrypt(&[0u8; 15], &[0u8; 16]).is_err());
        assert!(key.encrypt(&[0u8; 16], &[0u8; 8]).is_err());
        let wrong = AesKey::new(SecurityPolicy::Basic256, &[1; 16]);
        assert!(wrong.encrypt(&[0u8; 16], &[0u8; 16]).is_err());
        let none = AesKey::new(SecurityPolicy::None, &[]);
        assert!(none.encrypt(&[0u8; 16], &[0u8; 16]).is_err());
    }
}
