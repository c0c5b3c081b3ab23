use config::{Config, ConfigError, File, FileFormat};
use std::{
    env,
    path::{Path, PathBuf},
};

use crate::anomalies::Thresholds;
use crate::defaults::{LOCAL_CONFIG_FILE_NAME, SYSTEM_CONFIG_DIR_NAME};

/// Path of the user-wide config (XDG_CONFIG_HOME or ~/.config/qa-report/config.toml)
pub fn system_config_path() -> Option<PathBuf> {
    if let Ok(xdg_config_home) = env::var("XDG_CONFIG_HOME") {
        return Some(
            Path::new(&xdg_config_home)
                .join(SYSTEM_CONFIG_DIR_NAME)
                .join("config.toml"),
        );
    }

    dirs_next::home_dir().map(|home| {
        home.join(".config")
            .join(SYSTEM_CONFIG_DIR_NAME)
            .join("config.toml")
    })
}

/// Search upward from the current directory for a `.qareportconfig` file
pub fn find_local_config_path() -> Option<PathBuf> {
    let mut current_dir = env::current_dir().ok()?;
    loop {
        let candidate = current_dir.join(LOCAL_CONFIG_FILE_NAME);
        if candidate.is_file() {
            return Some(candidate);
        }
        if !current_dir.pop() {
            return None;
        }
    }
}

/// Read hierarchical configuration (system -> local override)
pub fn read_hierarchical_config() -> Result<Config, ConfigError> {
    let mut builder = Config::builder();

    if let Some(system_path) = system_config_path() {
        builder = builder.add_source(
            File::from(system_path)
                .format(FileFormat::Toml)
                .required(false),
        );
    }

    // The local config overrides the system config
    if let Some(local_path) = find_local_config_path() {
        builder = builder.add_source(
            File::from(local_path)
                .format(FileFormat::Toml)
                .required(false),
        );
    }

    builder.build()
}

/// Returns the anomaly thresholds from config, falling back to the built-in
/// defaults for every key that is not set.
pub fn anomaly_thresholds() -> Thresholds {
    let config = match read_hierarchical_config() {
        Ok(config) => config,
        Err(e) => {
            // Not fatal, the defaults still apply
            log::warn!("Could not read configuration, using defaults: {}", e);
            return Thresholds::default();
        }
    };

    thresholds_from(&config)
}

fn thresholds_from(config: &Config) -> Thresholds {
    let defaults = Thresholds::default();
    let float_or = |key: &str, default: f64| match config.get_float(key) {
        Ok(value) => value,
        Err(ConfigError::NotFound(_)) => default,
        Err(e) => {
            log::warn!("Ignoring invalid value for '{}': {}", key, e);
            default
        }
    };

    Thresholds {
        min_success_rate: float_or("anomalies.min_success_rate", defaults.min_success_rate),
        max_skip_ratio: float_or("anomalies.max_skip_ratio", defaults.max_skip_ratio),
        max_duration_seconds: float_or(
            "anomalies.max_duration_seconds",
            defaults.max_duration_seconds,
        ),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_utils::TEST_MUTEX;
    use std::fs;
    use tempfile::TempDir;

    /// Runs `f` with HOME pointing to a fresh directory and the current
    /// directory set to `<home>/project`. The environment is restored afterwards.
    fn with_isolated_home<F, R>(f: F) -> R
    where
        F: FnOnce(&Path) -> R,
    {
        let _guard = TEST_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        let temp_dir = TempDir::new().unwrap();
        let original_home = env::var("HOME").ok();
        let original_xdg = env::var("XDG_CONFIG_HOME").ok();
        let original_dir = env::current_dir().unwrap();

        env::set_var("HOME", temp_dir.path());
        env::remove_var("XDG_CONFIG_HOME");
        let project_dir = temp_dir.path().join("project");
        fs::create_dir_all(&project_dir).unwrap();
        env::set_current_dir(&project_dir).unwrap();

        let result = f(temp_dir.path());

        if let Some(home) = original_home {
            env::set_var("HOME", home);
        } else {
            env::remove_var("HOME");
        }
        if let Some(xdg) = original_xdg {
            env::set_var("XDG_CONFIG_HOME", xdg);
        } else {
            env::remove_var("XDG_CONFIG_HOME");
        }
        if original_dir.exists() {
            env::set_current_dir(original_dir).unwrap();
        }

        result
    }

    #[test]
    fn test_no_config_uses_defaults() {
        with_isolated_home(|_| {
            assert_eq!(find_local_config_path(), None);
            assert_eq!(anomaly_thresholds(), Thresholds::default());
        });
    }

    #[test]
    fn test_find_local_config_path_upward_search() {
        with_isolated_home(|home| {
            let config_path = home.join("project").join(".qareportconfig");
            fs::write(&config_path, "[anomalies]\nmax_skip_ratio = 0.5\n").unwrap();

            let subdir = home.join("project").join("reports").join("nightly");
            fs::create_dir_all(&subdir).unwrap();
            env::set_current_dir(&subdir).unwrap();

            assert_eq!(find_local_config_path(), Some(config_path));
        });
    }

    #[test]
    fn test_system_config_path_prefers_xdg() {
        with_isolated_home(|home| {
            assert_eq!(
                system_config_path(),
                Some(home.join(".config").join("qa-report").join("config.toml"))
            );

            let xdg = home.join("xdg");
            env::set_var("XDG_CONFIG_HOME", &xdg);
            assert_eq!(
                system_config_path(),
                Some(xdg.join("qa-report").join("config.toml"))
            );
        });
    }

    #[test]
    fn test_local_config_overrides_system_config() {
        with_isolated_home(|home| {
            let system_dir = home.join(".config").join("qa-report");
            fs::create_dir_all(&system_dir).unwrap();
            fs::write(
                system_dir.join("config.toml"),
                r#"
[anomalies]
min_success_rate = 95.0
max_duration_seconds = 600
"#,
            )
            .unwrap();

            fs::write(
                home.join("project").join(".qareportconfig"),
                r#"
[anomalies]
min_success_rate = 90.0
"#,
            )
            .unwrap();

            let thresholds = anomaly_thresholds();

            assert_eq!(thresholds.min_success_rate, 90.0);
            // Integers are accepted where floats are expected
            assert_eq!(thresholds.max_duration_seconds, 600.0);
            // Not configured anywhere
            assert_eq!(
                thresholds.max_skip_ratio,
                crate::defaults::DEFAULT_MAX_SKIP_RATIO
            );
        });
    }

    #[test]
    fn test_invalid_value_falls_back_to_default() {
        with_isolated_home(|home| {
            fs::write(
                home.join("project").join(".qareportconfig"),
                r#"
[anomalies]
min_success_rate = "high"
max_skip_ratio = 0.1
"#,
            )
            .unwrap();

            let thresholds = anomaly_thresholds();

            assert_eq!(
                thresholds.min_success_rate,
                crate::defaults::DEFAULT_MIN_SUCCESS_RATE
            );
            assert_eq!(thresholds.max_skip_ratio, 0.1);
        });
    }

    #[test]
    fn test_invalid_toml_uses_defaults() {
        with_isolated_home(|home| {
            fs::write(
                home.join("project").join(".qareportconfig"),
                "[anomalies\nmin_success_rate = ",
            )
            .unwrap();

            assert_eq!(anomaly_thresholds(), Thresholds::default());
        });
    }
}
