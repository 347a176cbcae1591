//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (axum setup, layer stack)
//!     → request.rs (request id assigned and echoed)
//!     → middleware/ (CORS → /ping probe → request logger)
//!     → routing (capability for method + path)
//!     → handler.rs (read body, dispatch, render)
//!     → response.rs (normalised JSON body)
//! ```

pub mod handler;
pub mod middleware;
pub mod request;
pub mod response;
pub mod server;

pub use request::X_REQUEST_ID;
pub use response::ApiResponse;
pub use server::HttpServer;
