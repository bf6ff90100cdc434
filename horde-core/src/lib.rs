//! Horde Core
//!
//! Core types shared by the Horde job client, the local job store and the poller.
//!
//! This crate contains:
//! - Domain types: pending jobs, completed images and the job status lattice
//! - DTOs: wire representations of the Horde generation API

pub mod domain;
pub mod dto;
