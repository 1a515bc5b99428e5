pub mod auth;
pub mod config;
pub mod error;
pub mod graphql;
pub mod logging;
pub mod model;
pub mod profile;
pub mod render;
pub mod session;
