mod env;
mod types;

pub use env::{Environment, VaultSettings};
pub use types::{PalConfig, TimerConfig};
