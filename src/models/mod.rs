//! Core data models for the upload pipeline.
//!
//! These entities serialize naturally as JSON via `serde` and are shared
//! between the storage backends and the HTTP handlers.

pub mod asset;
