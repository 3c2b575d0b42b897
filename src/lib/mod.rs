//! Shared library modules providing error types, the image backend, file utilities, and telemetry initialization.

use std::{future::Future, pin::Pin};

pub mod backend;
pub mod errors;
pub mod fs;
pub mod paths;
pub mod telemetry;

/// Boxed, sendable future used at the dynamic-dispatch seams (middleware, handlers, backend).
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
