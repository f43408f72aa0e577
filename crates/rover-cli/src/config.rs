//! Configuration file – reads/writes `~/.rover/config.toml`.
//!
//! The file holds a [`RoverConfig`]. Every section is optional; missing keys
//! take their defaults, so a file containing only
//!
//! ```toml
//! [range]
//! stop_threshold_cm = 25.0
//! ```
//!
//! is valid.

use std::fs;
use std::path::{Path, PathBuf};

use rover_types::RoverError;
use rover_types::config::{Mode, RoverConfig};
use tracing::warn;

/// Return the path to `~/.rover/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

/// Build the config path relative to the given home directory.
pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".rover").join("config.toml")
}

/// Load the config from `path` with environment overrides applied.
/// Returns `None` if the file does not exist.
///
/// # Errors
///
/// Returns [`RoverError::Config`] if the file exists but cannot be read or
/// parsed.
pub fn load_from(path: &Path) -> Result<Option<RoverConfig>, RoverError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| RoverError::Config(format!("failed to read {}: {e}", path.display())))?;
    let mut cfg: RoverConfig = toml::from_str(&raw)
        .map_err(|e| RoverError::Config(format!("failed to parse {}: {e}", path.display())))?;
    apply_env_overrides(&mut cfg);
    Ok(Some(cfg))
}

/// Apply `ROVER_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `ROVER_STOP_THRESHOLD_CM` | `range.stop_threshold_cm` |
/// | `ROVER_CRUISE_SPEED` | `drive.cruise_speed` |
/// | `ROVER_TARGET_CLASS` | `vision.target_class` |
/// | `ROVER_MODE` | `mode` (`autonomous` or `jog`) |
///
/// Values that do not parse are ignored with a warning.
pub fn apply_env_overrides(cfg: &mut RoverConfig) {
    if let Ok(v) = std::env::var("ROVER_STOP_THRESHOLD_CM") {
        match v.parse::<f32>() {
            Ok(cm) if cm.is_finite() => cfg.range.stop_threshold_cm = cm,
            _ => warn!(value = %v, "ignoring ROVER_STOP_THRESHOLD_CM"),
        }
    }
    if let Ok(v) = std::env::var("ROVER_CRUISE_SPEED") {
        match v.parse::<u8>() {
            Ok(speed) => cfg.drive.cruise_speed = speed,
            Err(_) => warn!(value = %v, "ignoring ROVER_CRUISE_SPEED"),
        }
    }
    if let Ok(v) = std::env::var("ROVER_TARGET_CLASS")
        && !v.trim().is_empty()
    {
        cfg.vision.target_class = v.trim().to_string();
    }
    if let Ok(v) = std::env::var("ROVER_MODE") {
        match v.to_ascii_lowercase().as_str() {
            "autonomous" => cfg.mode = Mode::Autonomous,
            "jog" => cfg.mode = Mode::Jog,
            _ => warn!(value = %v, "ignoring ROVER_MODE"),
        }
    }
}

/// Where a [`load_or_init`] result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Loaded,
    /// The file was missing and the defaults were written to it.
    Created,
    /// The file was missing and could not be written; defaults are in use.
    Defaults,
}

/// Load the config from `path`, writing the defaults there on first run.
///
/// Environment overrides are applied to the returned value but never
/// written to disk.
///
/// # Errors
///
/// Returns [`RoverError::Config`] if the file exists but cannot be read or
/// parsed. A failed first-run write is logged and the defaults are used.
pub fn load_or_init(path: &Path) -> Result<(RoverConfig, Source), RoverError> {
    if let Some(cfg) = load_from(path)? {
        return Ok((cfg, Source::Loaded));
    }
    let mut cfg = RoverConfig::default();
    let source = match save_to(&cfg, path) {
        Ok(()) => Source::Created,
        Err(e) => {
            warn!(error = %e, "could not write default config");
            Source::Defaults
        }
    };
    apply_env_overrides(&mut cfg);
    Ok((cfg, source))
}

/// Save the config to `path`, creating the parent directory if necessary.
///
/// # Errors
///
/// Returns [`RoverError::Config`] on any I/O or serialization failure.
pub fn save_to(cfg: &RoverConfig, path: &Path) -> Result<(), RoverError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| RoverError::Config(format!("failed to create config directory: {e}")))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(parent, fs::Permissions::from_mode(0o700)).map_err(|e| {
                RoverError::Config(format!("failed to set config directory permissions: {e}"))
            })?;
        }
    }
    let raw = toml::to_string_pretty(cfg)
        .map_err(|e| RoverError::Config(format!("failed to serialize config: {e}")))?;
    fs::write(path, raw)
        .map_err(|e| RoverError::Config(format!("failed to write {}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rover_types::config::TurnMode;

    #[test]
    fn config_path_points_to_rover_dir() {
        let p = config_path_for_home("/home/pi");
        assert_eq!(p, PathBuf::from("/home/pi/.rover/config.toml"));
    }

    #[test]
    fn load_from_returns_none_when_missing() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());
        assert!(load_from(&path).expect("no error").is_none());
    }

    #[test]
    fn roundtrip_default_config() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());

        save_to(&RoverConfig::default(), &path).expect("save");
        let loaded = load_from(&path).expect("load ok").expect("some");
        assert_eq!(loaded.arbitration, RoverConfig::default().arbitration);
        assert_eq!(loaded.aim, RoverConfig::default().aim);
    }

    #[test]
    fn first_run_writes_defaults_once() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());

        let (cfg, source) = load_or_init(&path).expect("init ok");
        assert_eq!(source, Source::Created);
        assert!(path.exists());
        assert_eq!(cfg.arbitration, RoverConfig::default().arbitration);

        fs::write(&path, "[drive]\ncruise_speed = 70\n").expect("edit");
        let (cfg, source) = load_or_init(&path).expect("reload ok");
        assert_eq!(source, Source::Loaded);
        assert_eq!(cfg.drive.cruise_speed, 70);
    }

    #[cfg(unix)]
    #[test]
    fn unwritable_home_falls_back_to_defaults() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let blocker = dir.path().join("not_a_dir");
        fs::write(&blocker, "").expect("write");
        let path = blocker.join("config.toml");

        let (cfg, source) = load_or_init(&path).expect("defaults");
        assert_eq!(source, Source::Defaults);
        assert_eq!(cfg.aim, RoverConfig::default().aim);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "[drive]\nturn_mode = \"pivot\"\n").expect("write");

        let loaded = load_from(&path).expect("load ok").expect("some");
        assert_eq!(loaded.drive.turn_mode, TurnMode::Pivot);
        assert_eq!(loaded.drive.cruise_speed, 50);
        assert_eq!(loaded.vision.target_class, "person");
    }

    #[test]
    fn malformed_file_is_a_config_error() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "[range\nstop_threshold_cm = ").expect("write");

        assert!(matches!(load_from(&path), Err(RoverError::Config(_))));
    }

    #[cfg(unix)]
    #[test]
    fn config_dir_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());
        save_to(&RoverConfig::default(), &path).expect("save");

        let mode = fs::metadata(path.parent().unwrap())
            .expect("dir metadata")
            .permissions()
            .mode()
            & 0o777;
        assert_eq!(mode, 0o700);
    }

    // The override tests share process env; each uses its own variable.

    #[test]
    fn env_overrides_stop_threshold() {
        // SAFETY: only this test touches ROVER_STOP_THRESHOLD_CM.
        unsafe { std::env::set_var("ROVER_STOP_THRESHOLD_CM", "32.5") };
        let mut cfg = RoverConfig::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.range.stop_threshold_cm, 32.5);
        unsafe { std::env::remove_var("ROVER_STOP_THRESHOLD_CM") };
    }

    #[test]
    fn env_override_ignores_invalid_speed() {
        // SAFETY: only this test touches ROVER_CRUISE_SPEED.
        unsafe { std::env::set_var("ROVER_CRUISE_SPEED", "fast") };
        let mut cfg = RoverConfig::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.drive.cruise_speed, 50);
        unsafe { std::env::remove_var("ROVER_CRUISE_SPEED") };
    }

    #[test]
    fn env_overrides_target_class() {
        // SAFETY: only this test touches ROVER_TARGET_CLASS.
        unsafe { std::env::set_var("ROVER_TARGET_CLASS", " cat ") };
        let mut cfg = RoverConfig::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.vision.target_class, "cat");
        unsafe { std::env::remove_var("ROVER_TARGET_CLASS") };
    }

    #[test]
    fn env_overrides_mode() {
        // SAFETY: only this test touches ROVER_MODE.
        unsafe { std::env::set_var("ROVER_MODE", "JOG") };
        let mut cfg = RoverConfig::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.mode, Mode::Jog);
        unsafe { std::env::remove_var("ROVER_MODE") };
    }
}
