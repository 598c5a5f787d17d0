//! Output formatting for CLI commands

use std::path::{Path, PathBuf};

use serde::Serialize;

/// Output context for consistent formatting across commands
///
/// Every command reports through this context as a JSON document.
#[derive(Debug, Clone)]
pub struct OutputContext {
    /// Working directory for relative path calculation
    root: PathBuf,
}

impl OutputContext {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Convert an absolute path to relative (if within the working directory)
    pub fn relative_path(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .map(|p| p.display().to_string())
            .unwrap_or_else(|_| path.display().to_string())
    }

    /// Print a successful response with data fields at top level
    pub fn print_success_flat<T: Serialize>(&self, data: T) {
        print_json(&success_flat(data));
    }

    pub fn print_error(&self, message: &str) {
        let response = serde_json::json!({
            "success": false,
            "error": message
        });
        print_json(&response);
    }
}

fn success_flat<T: Serialize>(data: T) -> serde_json::Value {
    let mut response = serde_json::to_value(data).unwrap_or(serde_json::json!({}));
    if let Some(obj) = response.as_object_mut() {
        obj.insert("success".to_string(), serde_json::json!(true));
    }
    response
}

fn print_json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("Failed to serialize output: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_path() {
        let ctx = OutputContext::new(PathBuf::from("/work"));

        assert_eq!(
            ctx.relative_path(Path::new("/work/.tie-lsp/config.toml")),
            ".tie-lsp/config.toml"
        );

        // Path outside the working directory stays absolute
        assert_eq!(
            ctx.relative_path(Path::new("/home/me/.config/tie-lsp/config.toml")),
            "/home/me/.config/tie-lsp/config.toml"
        );
    }

    #[test]
    fn test_success_flat_marks_success() {
        let value = success_flat(serde_json::json!({"port": 9000}));
        assert_eq!(value["success"], true);
        assert_eq!(value["port"], 9000);
    }
}
