//! Command-line surface: flags, launch profile and config path resolution.
pub mod args;
pub mod profile;

pub use args::{LaunchProfileArgs, ParsedCommand};
pub use profile::{
    build_launch_args, normalize_endpoint_path, resolve_config_path, LaunchProfile,
    TransportMode, CONFIG_PATH_ENV, DEFAULT_HOST, DEFAULT_PATH, DEFAULT_PORT,
};
