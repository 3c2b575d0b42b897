//! Library crate root re-exporting server, tool, resource and prompt modules.

#[path = "lib/mod.rs"]
pub mod lib_mod;
pub use lib_mod as lib;
pub mod cli;
pub mod prompts;
pub mod resources;
pub mod server;
pub mod tools;

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    fn assert_split(area: &str, mod_path: &str, files: &[&str], needles: &[&str]) {
        for path in files {
            assert!(
                Path::new(path).exists(),
                "{area} layout: {} must exist",
                path
            );
        }

        let content = fs::read_to_string(mod_path)
            .unwrap_or_else(|_| panic!("{area} layout: failed to read {}", mod_path));
        for needle in needles {
            assert!(
                content.contains(needle),
                "{area} layout: {} must declare {}",
                mod_path,
                needle
            );
        }
    }

    #[test]
    fn runtime_layout_requires_split_modules() {
        assert_split(
            "runtime",
            "src/server/runtime/mod.rs",
            &[
                "src/server/runtime/builder.rs",
                "src/server/runtime/handler.rs",
                "src/server/runtime/server_info.rs",
                "src/server/runtime/startup.rs",
            ],
            &["builder", "handler", "server_info", "startup"],
        );
    }

    #[test]
    fn middleware_layout_requires_split_modules() {
        assert_split(
            "middleware",
            "src/server/middleware/mod.rs",
            &[
                "src/server/middleware/validation.rs",
                "src/server/middleware/telemetry.rs",
                "src/server/middleware/error_handling.rs",
            ],
            &["validation", "telemetry", "error_handling"],
        );
    }

    #[test]
    fn cli_layout_requires_split_modules() {
        assert_split(
            "CLI",
            "src/cli/mod.rs",
            &["src/cli/args.rs", "src/cli/profile.rs"],
            &["LaunchProfileArgs"],
        );
    }

    #[test]
    fn config_layout_requires_split_modules() {
        assert_split(
            "config",
            "src/server/config/mod.rs",
            &[
                "src/server/config/server.rs",
                "src/server/config/backend.rs",
                "src/server/config/models.rs",
                "src/server/config/middleware.rs",
                "src/server/config/defaults.rs",
                "src/server/config/telemetry.rs",
            ],
            &["server", "backend", "models", "middleware", "defaults", "telemetry"],
        );
    }
}
