// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0

mod channels;
mod config;
mod subscriptions;
mod utils;
