pub mod claims;
pub mod clock;
pub mod codec;
pub mod config;
pub mod edge;
pub mod error;
pub mod extractors;
pub mod roles;
pub mod service;
#[cfg(feature = "standard")]
pub mod standard;

pub use claims::{Claims, Principal};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::TokenConfig;
pub use edge::EdgeTokenService;
pub use error::{AuthError, AuthResult, TokenError};
pub use extractors::{credential_from_headers, AuthContext, DEFAULT_COOKIE_NAME};
pub use roles::{Role, UnknownRole};
pub use service::{build_token_service, TokenEngine, TokenService};
#[cfg(feature = "standard")]
pub use standard::JwtTokenService;
