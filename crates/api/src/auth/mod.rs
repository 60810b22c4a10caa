//! Access-token handling.

pub mod jwt;
