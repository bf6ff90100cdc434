//! Repository layer
//!
//! Repositories are stateless HTTP clients that abstract communication
//! with Horde. They expose focused interfaces without any business logic.
//!
//! All repositories are trait-based to enable testing and mocking.

#[cfg(test)]
pub mod mock;
mod status;

// Re-export traits
pub use status::StatusRepository;

// Re-export implementations
pub use status::HttpStatusRepository;
