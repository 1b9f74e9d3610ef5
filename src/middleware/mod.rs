pub mod auth;
pub mod security_headers;

pub use auth::SessionGuard;
pub use security_headers::SecurityHeaders;
