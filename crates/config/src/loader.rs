use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{
    env_subst::substitute_env,
    error::{Context, Error, Result},
    schema::ChatTextConfig,
};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "chattext.toml",
    "chattext.yaml",
    "chattext.yml",
    "chattext.json",
];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> Result<ChatTextConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./chattext.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/chattext/chattext.{toml,yaml,yml,json}` (user-global)
///
/// Returns `ChatTextConfig::default()` if no config file is found.
pub fn discover_and_load() -> ChatTextConfig {
    if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(cfg) => return cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            },
        }
    } else {
        debug!("no config file found, using defaults");
    }
    ChatTextConfig::default()
}

/// Load an explicitly requested file, or fall back to discovery.
///
/// Unlike discovery, an explicit path that cannot be loaded is an error.
pub fn load_or_discover(path: Option<&Path>) -> Result<ChatTextConfig> {
    match path {
        Some(path) => {
            debug!(path = %path.display(), "loading config");
            load_config(path)
        },
        None => Ok(discover_and_load()),
    }
}

/// Find the first config file in standard locations.
pub(crate) fn find_config_file() -> Option<PathBuf> {
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    let config_dir = config_dir()?;
    CONFIG_FILENAMES
        .iter()
        .map(|name| config_dir.join(name))
        .find(|p| p.exists())
}

/// Returns the user-global config directory (`~/.config/chattext/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "chattext").map(|d| d.config_dir().to_path_buf())
}

pub(crate) fn parse_config(raw: &str, path: &Path) -> Result<ChatTextConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => toml::from_str(raw).context("invalid TOML config"),
        "yaml" | "yml" => serde_yaml::from_str(raw).context("invalid YAML config"),
        "json" => serde_json::from_str(raw).context("invalid JSON config"),
        _ => Err(Error::message(format!("unsupported config format: .{ext}"))),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, secrecy::ExposeSecret, std::io::Write};

    fn write_config(name: &str, body: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(body.as_bytes()).unwrap();
        (dir, path)
    }

    #[test]
    fn loads_toml() {
        let (_dir, path) = write_config(
            "chattext.toml",
            "[delivery]\nmax_message_count = 3\n[dump]\nsupplemental_line_chance = 0.5\n",
        );
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.delivery.max_message_count, 3);
        assert_eq!(cfg.dump.supplemental_line_chance, 0.5);
    }

    #[test]
    fn loads_json_auth_file_shape() {
        let (_dir, path) = write_config(
            "chattext.json",
            r#"{"twitch": {"nick": "bot", "token": "tok", "channels": ["a"]}}"#,
        );
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.twitch.nick, "bot");
        assert_eq!(cfg.twitch.token.expose_secret(), "tok");
    }

    #[test]
    fn loads_yaml() {
        let (_dir, path) = write_config(
            "chattext.yaml",
            "dump:\n  buffer_flush_threshold: 256\n",
        );
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.dump.buffer_flush_threshold, 256);
    }

    #[test]
    fn unsupported_extension_is_error() {
        let (_dir, path) = write_config("chattext.ini", "nick=bot");
        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("unsupported config format"));
    }

    #[test]
    fn explicit_missing_path_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        let err = load_or_discover(Some(&missing)).unwrap_err();
        assert!(err.to_string().starts_with("failed to read"));
    }

    #[test]
    fn malformed_toml_is_reported() {
        let (_dir, path) = write_config("chattext.toml", "[dump\n");
        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().starts_with("invalid TOML config"));
    }
}
