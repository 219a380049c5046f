//! JWT authentication: token service, bearer middleware, extractor.

pub mod jwt;
pub mod middleware;

pub use jwt::AuthService;
pub use middleware::{auth_middleware, AuthUser};
