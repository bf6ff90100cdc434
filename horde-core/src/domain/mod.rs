//! Core domain types
//!
//! These types describe jobs as the local client tracks them. They are shared
//! between the store (which persists them) and the poller (which advances them).

pub mod image;
pub mod job;
