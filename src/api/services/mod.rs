pub mod health;
pub mod lookup;
pub mod types;

pub use health::{AppStartTime, HealthService, health_routes};
pub use lookup::{LookupService, lookup_routes};
pub use types::{ErrorEnvelope, IpQuery, LookupResult, QueryOrigin, SuccessEnvelope};
