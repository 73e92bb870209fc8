pub mod auth;
pub mod jwks;
