//! Request-side helpers shared by route handlers.

pub mod cookies;

pub use cookies::CookieHelper;
