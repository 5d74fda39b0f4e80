// Thin re-export module: implementation is in `blockchain/core.rs` to
// keep ledger responsibilities (chain management, validation) in
// separate submodules.

pub mod core;
pub use self::core::*;
