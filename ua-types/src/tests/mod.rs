// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0

mod encoding;

use crate::ContextOwned;

pub(crate) fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub(crate) fn context() -> ContextOwned {
    init_test_logging();
    ContextOwned::default()
}
