pub mod schema;

pub use schema::{CacheConfig, Config, ObservabilityConfig, PanelConfig, RoutesConfig};
