pub mod config;
pub mod secrets;
pub mod tenant;

pub use config::{AppConfig, ConfigStore, ProviderConfig, RateLimitConfig};
pub use secrets::{EnvSecretBroker, SecretBroker};
pub use tenant::{hash_password, verify_password, AuthContext, AuthError, Claims, TokenIssuer, TokenType};
