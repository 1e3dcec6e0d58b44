//! testspace configuration layer
//!
//! Every environment variable read lives here; the exec and workspace crates go
//! through the typed structs instead of calling `std::env::var` directly.
//!
//! - `loader`: `env_or`, `env_optional`, `env_bool`, `env_u64`
//! - `schema`: `ObservabilityConfig`, `SpaceConfig`
//! - `env_keys`: key constants

pub mod env_keys;
pub mod loader;
pub mod schema;

pub use loader::{env_bool, env_optional, env_or, env_u64};
pub use schema::{ObservabilityConfig, SpaceConfig};
