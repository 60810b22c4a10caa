pub mod functions;
pub mod stories;
