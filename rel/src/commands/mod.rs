/// Discover command handlers
pub mod discover;

/// Version command handlers
pub mod version;
