// Request-scoped authentication: the middleware resolves the viewer, extractors hand it to handlers

pub mod viewer_context_extractor;
pub mod viewer_context_middleware;

pub use viewer_context_extractor::{OptionalVc, Vc};
pub use viewer_context_middleware::*;
