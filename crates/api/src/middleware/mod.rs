//! Request extractors guarding the API routes.

pub mod auth;
pub mod webhook;
