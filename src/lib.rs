// Threadline - social feed backend

// Core types and primitives
pub mod core;

// Storage, media hosts, auth primitives and request middleware
pub mod infrastructure;

// Stored documents and aggregated views
pub mod models;

// Business operations
pub mod services;

// HTTP surface
pub mod api;

// Common utilities
pub mod app_state;
pub mod config;
pub mod error;

// Re-exports for convenience
pub use error::{AppError, AppResult};
