pub mod pricing;

pub use pricing::{get_cached_pricing, reload_pricing, ConfigError, PricingConfig};
