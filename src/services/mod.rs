//! Storage backends behind the upload endpoint.

pub mod local_store;
pub mod remote_store;
pub mod staging;
pub mod storage_service;
