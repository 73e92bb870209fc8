pub mod health;
pub mod secret;
