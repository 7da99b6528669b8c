// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0

#![warn(missing_docs)]

//! Symmetric cryptography for OPC UA secure channels: the table of security
//! policies, nonce generation, key derivation with `P_SHA1` and `P_SHA256`,
//! HMAC signatures and AES-CBC encryption.

mod aeskey;
mod hash;
mod keys;
pub mod random;
mod security_policy;

pub use aeskey::AesKey;
pub use hash::{hmac_sign, hmac_verify, p_sha, HashAlgorithm};
pub use keys::{ChannelKeys, DerivedKeys};
pub use security_policy::{PolicyParams, SecurityPolicy};

/// Size of a SHA1 digest.
pub const SHA1_SIZE: usize = 20;
/// Size of a SHA256 digest.
pub const SHA256_SIZE: usize = 32;
