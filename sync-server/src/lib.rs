// Library exports for sync-server
// The binary and the integration tests build on these modules

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod pagination;
pub mod permissions;
pub mod routes;
pub mod session;
pub mod state;
pub mod validation;
pub mod visibility;
