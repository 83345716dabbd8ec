//! Configuration resolution.
//!
//! Resolution order: CLI arguments → environment variables → XDG paths →
//! defaults. There are two settings: the bundle to analyze and an optional
//! YAML file with extra search checks.

use std::path::{Path, PathBuf};

/// Environment variable names.
pub const ENV_BUNDLE: &str = "BT_BUNDLE";
pub const ENV_SEARCH_CHECKS: &str = "BT_SEARCH_CHECKS";
pub const ENV_CONFIG_DIR: &str = "BT_CONFIG_DIR";

/// File name looked up in configuration directories.
pub const SEARCH_CHECKS_FILENAME: &str = "search_checks.yaml";

/// Application name for XDG directories.
const APP_NAME: &str = "bundle-triage";

/// Where a setting came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConfigSource {
    CliArgument,
    Environment,
    XdgConfig,
    #[default]
    BuiltinDefault,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::CliArgument => write!(f, "CLI argument"),
            ConfigSource::Environment => write!(f, "environment variable"),
            ConfigSource::XdgConfig => write!(f, "XDG config"),
            ConfigSource::BuiltinDefault => write!(f, "builtin default"),
        }
    }
}

/// Errors in explicitly requested configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("search checks file {path} ({source_kind}) does not exist")]
    MissingSearchChecks {
        path: PathBuf,
        source_kind: ConfigSource,
    },

    #[error("cannot determine the current directory: {0}")]
    CurrentDir(#[source] std::io::Error),
}

/// Resolved settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub bundle: PathBuf,
    pub bundle_source: ConfigSource,
    /// Extra search checks, if any.
    pub search_checks: Option<PathBuf>,
    pub search_checks_source: ConfigSource,
}

/// Process environment as seen by the resolver.
pub trait Env {
    fn var(&self, name: &str) -> Option<String>;
    fn current_dir(&self) -> std::io::Result<PathBuf>;
    fn config_dir(&self) -> Option<PathBuf>;
}

/// The real process environment.
pub struct ProcessEnv;

impl Env for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok().filter(|v| !v.is_empty())
    }

    fn current_dir(&self) -> std::io::Result<PathBuf> {
        std::env::current_dir()
    }

    fn config_dir(&self) -> Option<PathBuf> {
        dirs::config_dir()
    }
}

/// Resolve settings from CLI values and the process environment.
pub fn resolve(
    cli_bundle: Option<&Path>,
    cli_search_checks: Option<&Path>,
) -> Result<Settings, ConfigError> {
    resolve_with(&ProcessEnv, cli_bundle, cli_search_checks)
}

/// Resolve settings against an explicit environment.
///
/// Bundle path: `--path`, then `BT_BUNDLE`, then the current directory.
///
/// Search checks:
/// 1. `--search-checks` (must exist)
/// 2. `BT_SEARCH_CHECKS` (must exist)
/// 3. `BT_CONFIG_DIR/search_checks.yaml`, if present
/// 4. `<XDG config>/bundle-triage/search_checks.yaml`, if present
/// 5. none
pub fn resolve_with(
    env: &dyn Env,
    cli_bundle: Option<&Path>,
    cli_search_checks: Option<&Path>,
) -> Result<Settings, ConfigError> {
    let (bundle, bundle_source) = match (cli_bundle, env.var(ENV_BUNDLE)) {
        (Some(path), _) => (path.to_path_buf(), ConfigSource::CliArgument),
        (None, Some(path)) => (PathBuf::from(path), ConfigSource::Environment),
        (None, None) => (
            env.current_dir().map_err(ConfigError::CurrentDir)?,
            ConfigSource::BuiltinDefault,
        ),
    };

    let (search_checks, search_checks_source) = resolve_search_checks(env, cli_search_checks)?;

    Ok(Settings {
        bundle,
        bundle_source,
        search_checks,
        search_checks_source,
    })
}

fn resolve_search_checks(
    env: &dyn Env,
    cli_path: Option<&Path>,
) -> Result<(Option<PathBuf>, ConfigSource), ConfigError> {
    // Explicit locations must exist.
    let explicit = cli_path
        .map(|p| (p.to_path_buf(), ConfigSource::CliArgument))
        .or_else(|| {
            env.var(ENV_SEARCH_CHECKS)
                .map(|p| (PathBuf::from(p), ConfigSource::Environment))
        });
    if let Some((path, source)) = explicit {
        if !path.is_file() {
            return Err(ConfigError::MissingSearchChecks {
                path,
                source_kind: source,
            });
        }
        return Ok((Some(path), source));
    }

    // Configuration directories are only used when the file is there.
    if let Some(dir) = env.var(ENV_CONFIG_DIR) {
        let path = PathBuf::from(dir).join(SEARCH_CHECKS_FILENAME);
        if path.is_file() {
            return Ok((Some(path), ConfigSource::Environment));
        }
    }
    if let Some(dir) = env.config_dir() {
        let path = dir.join(APP_NAME).join(SEARCH_CHECKS_FILENAME);
        if path.is_file() {
            return Ok((Some(path), ConfigSource::XdgConfig));
        }
    }

    Ok((None, ConfigSource::BuiltinDefault))
}

/// Get the XDG config directory for bundle-triage.
pub fn xdg_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[derive(Default)]
    struct FakeEnv {
        vars: HashMap<&'static str, String>,
        cwd: PathBuf,
        config_dir: Option<PathBuf>,
    }

    impl Env for FakeEnv {
        fn var(&self, name: &str) -> Option<String> {
            self.vars.get(name).cloned()
        }

        fn current_dir(&self) -> std::io::Result<PathBuf> {
            Ok(self.cwd.clone())
        }

        fn config_dir(&self) -> Option<PathBuf> {
            self.config_dir.clone()
        }
    }

    fn touch(path: &Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, "[]\n").unwrap();
    }

    #[test]
    fn test_config_source_display() {
        assert_eq!(ConfigSource::CliArgument.to_string(), "CLI argument");
        assert_eq!(ConfigSource::Environment.to_string(), "environment variable");
        assert_eq!(ConfigSource::XdgConfig.to_string(), "XDG config");
        assert_eq!(ConfigSource::BuiltinDefault.to_string(), "builtin default");
    }

    #[test]
    fn test_bundle_defaults_to_current_dir() {
        let env = FakeEnv {
            cwd: PathBuf::from("/work/bundle"),
            ..Default::default()
        };
        let settings = resolve_with(&env, None, None).unwrap();
        assert_eq!(settings.bundle, PathBuf::from("/work/bundle"));
        assert_eq!(settings.bundle_source, ConfigSource::BuiltinDefault);
        assert_eq!(settings.search_checks, None);
    }

    #[test]
    fn test_bundle_cli_beats_env() {
        let mut env = FakeEnv::default();
        env.vars.insert(ENV_BUNDLE, "/from/env".into());

        let settings = resolve_with(&env, None, None).unwrap();
        assert_eq!(settings.bundle, PathBuf::from("/from/env"));
        assert_eq!(settings.bundle_source, ConfigSource::Environment);

        let settings = resolve_with(&env, Some(Path::new("/from/cli")), None).unwrap();
        assert_eq!(settings.bundle, PathBuf::from("/from/cli"));
        assert_eq!(settings.bundle_source, ConfigSource::CliArgument);
    }

    #[test]
    fn test_explicit_search_checks_must_exist() {
        let env = FakeEnv::default();
        let err = resolve_with(&env, None, Some(Path::new("/no/such/file.yaml"))).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingSearchChecks {
                source_kind: ConfigSource::CliArgument,
                ..
            }
        ));
    }

    #[test]
    fn test_search_checks_resolution_order() {
        let tmp = TempDir::new().unwrap();
        let xdg = tmp.path().join("xdg");
        let config_dir = tmp.path().join("conf");
        let explicit = tmp.path().join("explicit.yaml");
        touch(&xdg.join(APP_NAME).join(SEARCH_CHECKS_FILENAME));
        touch(&config_dir.join(SEARCH_CHECKS_FILENAME));
        touch(&explicit);

        let mut env = FakeEnv {
            config_dir: Some(xdg.clone()),
            ..Default::default()
        };
        let settings = resolve_with(&env, None, None).unwrap();
        assert_eq!(settings.search_checks_source, ConfigSource::XdgConfig);

        env.vars.insert(ENV_CONFIG_DIR, config_dir.display().to_string());
        let settings = resolve_with(&env, None, None).unwrap();
        assert_eq!(
            settings.search_checks,
            Some(config_dir.join(SEARCH_CHECKS_FILENAME))
        );

        env.vars.insert(ENV_SEARCH_CHECKS, explicit.display().to_string());
        let settings = resolve_with(&env, None, None).unwrap();
        assert_eq!(settings.search_checks, Some(explicit.clone()));
        assert_eq!(settings.search_checks_source, ConfigSource::Environment);

        let settings = resolve_with(&env, None, Some(&explicit)).unwrap();
        assert_eq!(settings.search_checks_source, ConfigSource::CliArgument);
    }

    #[test]
    fn test_missing_config_dir_file_is_ignored() {
        let tmp = TempDir::new().unwrap();
        let mut env = FakeEnv::default();
        env.vars.insert(ENV_CONFIG_DIR, tmp.path().display().to_string());
        let settings = resolve_with(&env, None, None).unwrap();
        assert_eq!(settings.search_checks, None);
        assert_eq!(settings.search_checks_source, ConfigSource::BuiltinDefault);
    }
}
