//! Data Transfer Objects for the Horde HTTP API
//!
//! Wire shapes for the generation endpoints. Fields follow the remote
//! service's snake_case naming.

pub mod check;
pub mod generate;
