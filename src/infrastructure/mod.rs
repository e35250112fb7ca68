// Core infrastructure modules
pub mod database;              // Database interface
pub mod sqlite_database;       // SQLite implementation of the database interface
pub mod id_generator;          // ID generation system
pub mod viewer;                // Viewer context
pub mod middleware;            // Request authentication
pub mod security;              // Password hashing and session tokens
pub mod media;                 // Media store contract and retry decorator
pub mod local_media;           // Filesystem media store
pub mod cloudinary;            // Cloudinary media store

// Re-export core infrastructure components
pub use database::DatabaseInterface;
pub use sqlite_database::SqliteDatabase;
pub use id_generator::EntityIdGenerator;
pub use viewer::ViewerContext;
pub use security::{CredentialHasher, TokenPair, TokenService};
pub use media::{build_media_store, MediaAsset, MediaError, MediaStore, RetryPolicy, RetryingMediaStore};
