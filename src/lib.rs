pub mod config;
pub mod constants;
pub mod detector;
pub mod extractors;
pub mod frame;
pub mod logging;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod sessions;
pub mod state;
pub mod validation;
