pub mod auth;
pub(crate) mod authz;
pub mod health;
pub mod resources;
