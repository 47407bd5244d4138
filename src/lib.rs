//! Request-authorization gateway for a healthcare RAG API.

pub mod audit;
pub mod auth;
pub mod config;
pub mod gate;
pub mod generation;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod security;
pub mod store;
pub mod util;

pub use config::GatewayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
