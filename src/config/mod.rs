//! Configuration loading from TOML files and environment variables.
//!
//! Config is loaded in this order of precedence (highest wins):
//! 1. Environment variables (`SHELLGATE_TIMEOUT_MS`, `SHELLGATE_APPROVAL_MODE`,
//!    `SHELLGATE_SESSION_APPROVALS`)
//! 2. TOML file specified via --config CLI flag
//! 3. ./shellgate.toml in the current directory
//! 4. $XDG_CONFIG_HOME/shellgate/shellgate.toml (or ~/.config/shellgate/shellgate.toml)
//! 5. Built-in defaults

use crate::approval::ApprovalMode;
use crate::error::ConfigError;
use std::path::{Path, PathBuf};

mod defaults;
mod types;

pub use types::{BashHelperConfig, Config, ContinuationConfig, LoggingConfig};

/// File name looked up in the working directory and the global config root.
const CONFIG_FILE_NAME: &str = "shellgate.toml";

/// Config plus non-fatal problems found while resolving it.
#[derive(Debug, Clone, Default)]
pub struct LoadedConfig {
    pub config: Config,
    pub warnings: Vec<String>,
    /// File the config came from; `None` means built-in defaults.
    pub source: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Load configuration from disk and environment.
///
/// `path_override` is an explicit config file path (from --config flag).
pub fn load_config(path_override: Option<&str>) -> Result<Config, ConfigError> {
    Ok(load_config_with_warnings(path_override)?.config)
}

/// Load configuration and return the warnings collected along the way.
pub fn load_config_with_warnings(path_override: Option<&str>) -> Result<LoadedConfig, ConfigError> {
    load_config_from_sources(
        path_override,
        |path| std::fs::read_to_string(path),
        |name| std::env::var(name).ok(),
        config_root_dir,
    )
}

fn load_config_from_sources<FRead, FEnv, FRoot>(
    path_override: Option<&str>,
    read_file: FRead,
    env_lookup: FEnv,
    config_root: FRoot,
) -> Result<LoadedConfig, ConfigError>
where
    FRead: Fn(&Path) -> Result<String, std::io::Error>,
    FEnv: Fn(&str) -> Option<String>,
    FRoot: Fn() -> Option<PathBuf>,
{
    let (text, source) = read_config_text(path_override, &read_file, &config_root)?;
    let mut config: Config = toml::from_str(&text)?;
    apply_env_overrides(&mut config, &env_lookup)?;
    let warnings = normalize_command_sets(&mut config.bash_helper);
    Ok(LoadedConfig {
        config,
        warnings,
        source,
    })
}

fn read_config_text<FRead, FRoot>(
    path_override: Option<&str>,
    read_file: &FRead,
    config_root: &FRoot,
) -> Result<(String, Option<PathBuf>), ConfigError>
where
    FRead: Fn(&Path) -> Result<String, std::io::Error>,
    FRoot: Fn() -> Option<PathBuf>,
{
    if let Some(p) = path_override {
        let path = PathBuf::from(p);
        let text = read_file(&path)?;
        return Ok((text, Some(path)));
    }

    let local = PathBuf::from(CONFIG_FILE_NAME);
    if let Ok(text) = read_file(&local) {
        return Ok((text, Some(local)));
    }
    if let Some(dir) = config_root() {
        let global = dir.join("shellgate").join(CONFIG_FILE_NAME);
        if let Ok(text) = read_file(&global) {
            return Ok((text, Some(global)));
        }
    }

    Ok((String::new(), None))
}

fn apply_env_overrides<FEnv>(config: &mut Config, env_lookup: &FEnv) -> Result<(), ConfigError>
where
    FEnv: Fn(&str) -> Option<String>,
{
    if let Some(raw) = env_value(env_lookup, "SHELLGATE_TIMEOUT_MS") {
        let parsed = raw.parse::<u64>().map_err(|_| {
            ConfigError::Invalid(format!(
                "invalid SHELLGATE_TIMEOUT_MS value `{raw}`: expected positive integer milliseconds"
            ))
        })?;
        config.bash_helper.default_timeout = parsed.max(1);
    }
    if let Some(raw) = env_value(env_lookup, "SHELLGATE_APPROVAL_MODE") {
        config.bash_helper.default_approval_mode = raw
            .parse::<ApprovalMode>()
            .map_err(|e| ConfigError::Invalid(format!("SHELLGATE_APPROVAL_MODE: {e}")))?;
    }
    if let Some(raw) = env_value(env_lookup, "SHELLGATE_SESSION_APPROVALS") {
        config.bash_helper.session_approvals = parse_bool(&raw).ok_or_else(|| {
            ConfigError::Invalid(format!(
                "invalid SHELLGATE_SESSION_APPROVALS value `{raw}`: expected true/false"
            ))
        })?;
    }
    Ok(())
}

fn env_value<FEnv>(env_lookup: &FEnv, name: &str) -> Option<String>
where
    FEnv: Fn(&str) -> Option<String>,
{
    env_lookup(name).and_then(|value| normalized_string(&value))
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Trim/dedupe command names and report names listed as both safe and dangerous.
fn normalize_command_sets(config: &mut BashHelperConfig) -> Vec<String> {
    for names in [&mut config.known_safe_commands, &mut config.dangerous_commands] {
        let mut cleaned: Vec<String> = names.iter().filter_map(|n| normalized_string(n)).collect();
        cleaned.sort();
        cleaned.dedup();
        *names = cleaned;
    }

    config
        .known_safe_commands
        .iter()
        .filter(|name| config.dangerous_commands.contains(name))
        .map(|name| {
            format!("`{name}` is listed as both safe and dangerous; it will be treated as safe")
        })
        .collect()
}

fn normalized_string(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

pub fn config_root_dir() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("XDG_CONFIG_HOME") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }
    dirs::home_dir()
        .map(|home| home.join(".config"))
        .or_else(dirs::config_dir)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::time::Duration;

    fn no_files(_: &Path) -> Result<String, std::io::Error> {
        Err(std::io::Error::new(std::io::ErrorKind::NotFound, "missing"))
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn no_root() -> Option<PathBuf> {
        None
    }

    fn files(entries: &[(&str, &str)]) -> impl Fn(&Path) -> Result<String, std::io::Error> {
        let map: HashMap<PathBuf, String> = entries
            .iter()
            .map(|(p, t)| (PathBuf::from(p), t.to_string()))
            .collect();
        move |path: &Path| {
            map.get(path)
                .cloned()
                .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotFound, "missing"))
        }
    }

    #[test]
    fn defaults_are_sensible() {
        let c = Config::default();
        assert_eq!(c.bash_helper.default_timeout, 10_000);
        assert_eq!(c.bash_helper.default_approval_mode, ApprovalMode::OnRequest);
        assert!(c.bash_helper.session_approvals);
        assert!(c.bash_helper.known_safe_commands.contains(&"ls".to_string()));
        assert!(c.bash_helper.dangerous_commands.contains(&"rm".to_string()));
        assert_eq!(c.bash_helper.shell, "sh");
        assert_eq!(c.continuation.ttl(), Some(Duration::from_secs(3600)));
        assert_eq!(c.logging.filter, "info");
    }

    #[test]
    fn missing_files_fall_back_to_defaults() {
        let loaded = load_config_from_sources(None, no_files, no_env, no_root).unwrap();
        assert!(loaded.source.is_none());
        assert_eq!(loaded.config.bash_helper.default_timeout, 10_000);
        assert!(loaded.warnings.is_empty());
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let err = load_config_from_sources(Some("nope.toml"), no_files, no_env, no_root)
            .expect_err("explicit path must exist");
        assert!(matches!(err, ConfigError::Io(_)), "got: {err}");
    }

    #[test]
    fn local_file_is_preferred_over_global() {
        let read = files(&[
            ("shellgate.toml", "[bash_helper]\ndefault_timeout = 500\n"),
            ("/cfg/shellgate/shellgate.toml", "[bash_helper]\ndefault_timeout = 900\n"),
        ]);
        let loaded =
            load_config_from_sources(None, read, no_env, || Some(PathBuf::from("/cfg"))).unwrap();
        assert_eq!(loaded.config.bash_helper.default_timeout, 500);
        assert_eq!(loaded.source, Some(PathBuf::from("shellgate.toml")));
    }

    #[test]
    fn global_file_is_used_when_no_local_file() {
        let read = files(&[(
            "/cfg/shellgate/shellgate.toml",
            "[bash_helper]\ndefault_approval_mode = \"unless_trusted\"\n",
        )]);
        let loaded =
            load_config_from_sources(None, read, no_env, || Some(PathBuf::from("/cfg"))).unwrap();
        assert_eq!(
            loaded.config.bash_helper.default_approval_mode,
            ApprovalMode::UnlessTrusted
        );
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let read = files(&[(
            "custom.toml",
            "[bash_helper]\nknown_safe_commands = [\"ls\", \"git\"]\n\n[continuation]\nttl_secs = 0\n",
        )]);
        let c = load_config_from_sources(Some("custom.toml"), read, no_env, no_root)
            .unwrap()
            .config;
        assert_eq!(c.bash_helper.known_safe_commands, vec!["git", "ls"]);
        assert!(c.bash_helper.dangerous_commands.contains(&"sudo".to_string()));
        assert_eq!(c.continuation.ttl(), None);
    }

    #[test]
    fn malformed_toml_is_reported() {
        let read = files(&[("bad.toml", "[bash_helper\n")]);
        let err = load_config_from_sources(Some("bad.toml"), read, no_env, no_root).unwrap_err();
        assert!(err.to_string().starts_with("toml:"), "got: {err}");
    }

    #[test]
    fn unknown_approval_mode_in_file_is_rejected() {
        let read = files(&[("bad.toml", "[bash_helper]\ndefault_approval_mode = \"sometimes\"\n")]);
        assert!(load_config_from_sources(Some("bad.toml"), read, no_env, no_root).is_err());
    }

    #[test]
    fn env_overrides_win_over_file() {
        let read = files(&[("shellgate.toml", "[bash_helper]\ndefault_timeout = 500\n")]);
        let env = |name: &str| match name {
            "SHELLGATE_TIMEOUT_MS" => Some("250".to_string()),
            "SHELLGATE_APPROVAL_MODE" => Some("never".to_string()),
            "SHELLGATE_SESSION_APPROVALS" => Some("off".to_string()),
            _ => None,
        };
        let c = load_config_from_sources(None, read, env, no_root).unwrap().config;
        assert_eq!(c.bash_helper.default_timeout, 250);
        assert_eq!(c.bash_helper.default_approval_mode, ApprovalMode::Never);
        assert!(!c.bash_helper.session_approvals);
    }

    #[test]
    fn invalid_env_timeout_is_rejected() {
        let env = |name: &str| (name == "SHELLGATE_TIMEOUT_MS").then(|| "soon".to_string());
        let err = load_config_from_sources(None, no_files, env, no_root).unwrap_err();
        assert!(err.to_string().contains("SHELLGATE_TIMEOUT_MS"), "got: {err}");
    }

    #[test]
    fn overlapping_command_sets_produce_a_warning() {
        let read = files(&[(
            "overlap.toml",
            "[bash_helper]\nknown_safe_commands = [\"ls\", \" rm \"]\ndangerous_commands = [\"rm\"]\n",
        )]);
        let loaded = load_config_from_sources(Some("overlap.toml"), read, no_env, no_root).unwrap();
        assert_eq!(loaded.warnings.len(), 1);
        assert!(loaded.warnings[0].contains("`rm`"), "got: {:?}", loaded.warnings);
    }
}
