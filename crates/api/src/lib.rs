//! Axum-based HTTP service for TFWS trust states.
//!
//! This crate provides:
//! - `GET /api/v1/trust/domain/:domain` - probe the subject, score it and return a schema-valid trust state
//! - `GET /health` - liveness check
//!
//! plus the TOML/env configuration and the `.well-known` probe collaborator.

#![warn(missing_docs)]

pub mod config;
pub mod probe;
/// Service runtime and in-process app builder.
pub mod server;
