mod acl;
mod hmac;
mod jwt;

pub use acl::AclMiddlewareFactory;
pub use hmac::HmacMiddlewareFactory;
pub use jwt::JwtAuthMiddlewareFactory;
