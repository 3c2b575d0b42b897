//! Server composition, request dispatch and transport startup.
mod builder;
mod handler;
mod server_info;
mod startup;

pub use builder::{compose_server, compose_server_with_backend, ServerBuilder};
pub use handler::ImageSorceryServer;
pub use server_info::build_server_info;
pub use startup::{run_server, RuntimeExit};
