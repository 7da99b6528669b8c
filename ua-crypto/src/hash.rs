// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0

//! HMAC signatures and the `P_SHA` pseudo random function used to derive
//! channel keys.

use hmac::{digest::KeyInit, Hmac, Mac};
use log::error;
use sha1::Sha1;
use sha2::Sha256;
use ua_types::{Error, StatusCode};

use crate::{SHA1_SIZE, SHA256_SIZE};

type HmacSha1 = Hmac<Sha1>;
type HmacSha256 = Hmac<Sha256>;

/// Digest underlying the HMAC and `P_SHA` functions of a policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    /// SHA1, 20 byte digests.
    Sha1,
    /// SHA256, 32 byte digests.
    Sha256,
}

impl HashAlgorithm {
    /// Size of a digest, which is also the size of a signature.
    pub fn size(&self) -> usize {
        match self {
            HashAlgorithm::Sha1 => SHA1_SIZE,
            HashAlgorithm::Sha256 => SHA256_SIZE,
        }
    }

    fn mac(&self, key: &[u8], chunks: &[&[u8]]) -> Vec<u8> {
        // HMAC accepts keys of any length, so construction cannot fail.
        match self {
            HashAlgorithm::Sha1 => {
                let Ok(mut mac) = <HmacSha1 as KeyInit>::new_from_slice(key) else {
                    return Vec::new();
                };
                chunks.iter().for_each(|c| mac.update(c));
                mac.finalize().into_bytes().to_vec()
            }
            HashAlgorithm::Sha256 => {
                let Ok(mut mac) = <HmacSha256 as KeyInit>::new_from_slice(key) else {
                    return Vec::new();
                };
                chunks.iter().for_each(|c| mac.update(c));
                mac.finalize().into_bytes().to_vec()
            }
        }
    }
}

/// The `P_SHA` function of RFC 2246: expand `secret` and `seed` into `length`
/// bytes.
pub fn p_sha(algorithm: HashAlgorithm, secret: &[u8], seed: &[u8], length: usize) -> Vec<u8> {
    let mut result = Vec::with_capacity(length + algorithm.size());
    // A(1) = HMAC(secret, seed), A(i) = HMAC(secret, A(i - 1))
    let mut a = algorithm.mac(secret, &[seed]);
    while result.len() < length {
        result.extend_from_slice(&algorithm.mac(secret, &[&a, seed]));
        a = algorithm.mac(secret, &[&a]);
    }
    result.truncate(length);
    result
}

/// Sign `data` with `key`.
pub fn hmac_sign(algorithm: HashAlgorithm, key: &[u8], data: &[u8]) -> Vec<u8> {
    algorithm.mac(key, &[data])
}

/// Verify `signature` over `data`, in constant time.
pub fn hmac_verify(
    algorithm: HashAlgorithm,
    key: &[u8],
    data: &[u8],
    signature: &[u8],
) -> Result<(), Error> {
    let verified = match algorithm {
        HashAlgorithm::Sha1 => <HmacSha1 as KeyInit>::new_from_slice(key).map(|mut mac| {
            mac.update(data);
            mac.verify_slice(signature).is_ok()
        }),
        HashAlgorithm::Sha256 => <HmacSha256 as KeyInit>::new_from_slice(key).map(|mut mac| {
            mac.update(data);
            mac.verify_slice(signature).is_ok()
        }),
    };
    match verified {
        Ok(true) => Ok(()),
        _ => {
            error!(
                "{algorithm:?} signature over {} bytes does not match",
                data.len()
            );
            Err(Error::new(
                StatusCode::BadSecurityChecksFailed,
                "Signature does not match",
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{hmac_sign, hmac_verify, p_sha, HashAlgorithm};
    use ua_types::StatusCode;

    #[test]
    fn p_sha_length_and_prefix() {
        let a = p_sha(HashAlgorithm::Sha256, b"secret", b"seed", 80);
        assert_eq!(a.len(), 80);
        // Shorter outputs are prefixes of longer ones.
        assert_eq!(p_sha(HashAlgorithm::Sha256, b"secret", b"seed", 20), a[..20]);
        assert_ne!(p_sha(HashAlgorithm::Sha1, b"secret", b"seed", 80), a);
        assert_ne!(p_sha(HashAlgorithm::Sha256, b"secret", b"seeds", 80), a);
    }

    #[test]
    fn p_sha256_known_vector() {
        // Test vector for the TLS 1.2 PRF with SHA256, without the label.
        let secret = [
            0x9b, 0xbe, 0x43, 0x6b, 0xa9, 0x40, 0xf0, 0x17, 0xb1, 0x76, 0x52, 0x84, 0x9a, 0x71,
            0xdb, 0x35,
        ];
        let mut seed = b"test label".to_vec();
        seed.extend_from_slice(&[
            0xa0, 0xba, 0x9f, 0x93, 0x6c, 0xda, 0x31, 0x18, 0x27, 0xa6, 0xf7, 0x96, 0xff, 0xd5,
            0x19, 0x8c,
        ]);
        let out = p_sha(HashAlgorithm::Sha256, &secret, &seed, 16);
        assert_eq!(
            out,
            [
                0xe3, 0xf2, 0x29, 0xba, 0x72, 0x7b, 0xe1, 0x7b, 0x8d, 0x12, 0x26, 0x20, 0x55, 0x7c,
                0xd4, 0x53
            ]
        );
    }

    #[test]
    fn sign_and_verify() {
        for alg in [HashAlgorithm::Sha1, HashAlgorithm::Sha256] {
            let sig = hmac_sign(alg, b"key", b"data");
            assert_eq!(sig.len(), alg.size());
            hmac_verify(alg, b"key", b"data", &sig).unwrap();
            let err = hmac_verify(alg, b"key", b"datA", &sig).unwrap_err();
            assert_eq!(err.status(), StatusCode::BadSecurityChecksFailed);
            assert!(hmac_verify(alg, b"key", b"data", &sig[1..]).is_err());
        }
    }
}
