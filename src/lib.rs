//! haifriends API gateway: route-group mounting plus an image upload
//! endpoint backed by local disk or Cloudinary.

pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
