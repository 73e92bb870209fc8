//! Bearer-token authentication and per-route authorization.
//!
//! - `authenticate`: validates the token once per request and records the outcome (`AuthCtx`)
//! - `authorize`: route-level gate reading that outcome against a `Requirement`
pub mod authenticate;
pub mod authorize;
