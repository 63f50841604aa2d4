use std::time::Duration;

use crate::provider::MediaProvider;

pub mod cancel;
pub mod driver;
pub mod error;
pub mod provider;
pub mod request;
pub mod session;

pub type ProviderBox = Box<dyn MediaProvider + Send + Sync>;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_MAX_ATTEMPTS: u32 = 60;
pub const DEFAULT_POLL_RETRIES: u32 = 2;
