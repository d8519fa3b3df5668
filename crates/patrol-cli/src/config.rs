//! Patrol configuration – reads/writes `~/.patrol/config.toml`.

use patrol_gateway::MoveOptions;
use patrol_kernel::WatchdogConfig;
use patrol_types::PoiList;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Persisted configuration stored in `~/.patrol/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// IP address or host name of the robot.  Required unless running `--sim`.
    #[serde(default)]
    pub robot_ip: String,

    #[serde(default = "default_robot_port")]
    pub robot_port: u16,

    /// Per-request HTTP timeout.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// POI display names, visited in this order and then from the start again.
    #[serde(default = "default_pois")]
    pub pois: Vec<String>,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Time budget for a single move.
    #[serde(default = "default_max_wait_sec")]
    pub max_wait_sec: u64,

    /// Consecutive unreachable status reads tolerated during one move.
    #[serde(default = "default_comm_fail_limit")]
    pub comm_fail_limit: u32,

    /// Ask the robot for a precise stop at the target.
    #[serde(default = "default_true")]
    pub precise: bool,

    /// Turn to the heading stored with the POI on arrival.
    #[serde(default = "default_true")]
    pub use_poi_yaw: bool,
}

fn default_robot_port() -> u16 {
    1448
}
fn default_request_timeout_ms() -> u64 {
    2000
}
fn default_pois() -> Vec<String> {
    vec!["POI1".to_string(), "POI2".to_string(), "POI3".to_string()]
}
fn default_poll_interval_ms() -> u64 {
    300
}
fn default_max_wait_sec() -> u64 {
    180
}
fn default_comm_fail_limit() -> u32 {
    2
}
fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            robot_ip: String::new(),
            robot_port: default_robot_port(),
            request_timeout_ms: default_request_timeout_ms(),
            pois: default_pois(),
            poll_interval_ms: default_poll_interval_ms(),
            max_wait_sec: default_max_wait_sec(),
            comm_fail_limit: default_comm_fail_limit(),
            precise: true,
            use_poi_yaw: true,
        }
    }
}

impl Config {
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.robot_ip.trim(), self.robot_port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn watchdog(&self) -> WatchdogConfig {
        WatchdogConfig {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            max_wait: Duration::from_secs(self.max_wait_sec),
            comm_fail_limit: self.comm_fail_limit,
        }
    }

    pub fn move_options(&self) -> MoveOptions {
        MoveOptions {
            precise: self.precise,
            use_poi_yaw: self.use_poi_yaw,
        }
    }

    pub fn poi_list(&self) -> Result<PoiList, String> {
        PoiList::new(self.pois.clone()).map_err(|e| e.to_string())
    }

    /// Check the settings the patrol cannot run without.  The robot address
    /// is only checked when a real robot will be contacted.
    pub fn validate(&self, needs_robot: bool) -> Result<(), String> {
        if needs_robot && self.robot_ip.trim().is_empty() {
            return Err(format!(
                "robot_ip is not set; edit {} or set PATROL_ROBOT_IP",
                config_path().display()
            ));
        }
        self.poi_list()?;
        if self.comm_fail_limit == 0 {
            return Err("comm_fail_limit must be at least 1".to_string());
        }
        if self.poll_interval_ms == 0 {
            return Err("poll_interval_ms must be greater than 0".to_string());
        }
        Ok(())
    }
}

/// Return the path to `~/.patrol/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".patrol").join("config.toml")
}

/// Load the config from a specific path, with `PATROL_*` overrides applied.
/// Returns `None` if the file does not exist.
pub fn load_from(path: &Path) -> Result<Option<Config>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    let mut cfg: Config =
        toml::from_str(&raw).map_err(|e| format!("Failed to parse config: {}", e))?;
    apply_env_overrides(&mut cfg);
    Ok(Some(cfg))
}

/// Apply `PATROL_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `PATROL_ROBOT_IP` | `robot_ip` |
/// | `PATROL_ROBOT_PORT` | `robot_port` |
/// | `PATROL_REQUEST_TIMEOUT_MS` | `request_timeout_ms` |
/// | `PATROL_POIS` | `pois` (comma separated) |
///
/// `ROBOT_IP` and `ROBOT_PORT` are read when the `PATROL_` variant is unset.
/// Values that do not parse are ignored.
pub fn apply_env_overrides(cfg: &mut Config) {
    apply_overrides(cfg, |key| std::env::var(key).ok());
}

pub(crate) fn apply_overrides(cfg: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    let with_fallback = |key: &str, legacy: &str| lookup(key).or_else(|| lookup(legacy));
    if let Some(v) = with_fallback("PATROL_ROBOT_IP", "ROBOT_IP")
        && !v.trim().is_empty()
    {
        cfg.robot_ip = v.trim().to_string();
    }
    if let Some(v) = with_fallback("PATROL_ROBOT_PORT", "ROBOT_PORT")
        && let Ok(port) = v.trim().parse::<u16>()
    {
        cfg.robot_port = port;
    }
    if let Some(v) = lookup("PATROL_REQUEST_TIMEOUT_MS")
        && let Ok(ms) = v.trim().parse::<u64>()
        && ms > 0
    {
        cfg.request_timeout_ms = ms;
    }
    if let Some(v) = lookup("PATROL_POIS") {
        let pois: Vec<String> = v
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        if !pois.is_empty() {
            cfg.pois = pois;
        }
    }
}

/// Save the config to a specific path, creating the parent directory.
///
/// A parent directory created here is restricted to the owner; an existing
/// one keeps its permissions.
pub fn save_to(cfg: &Config, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty())
        && !parent.exists()
    {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(parent, fs::Permissions::from_mode(0o700))
                .map_err(|e| format!("Failed to set config directory permissions: {}", e))?;
        }
    }
    let raw =
        toml::to_string_pretty(cfg).map_err(|e| format!("Failed to serialize config: {}", e))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .and_then(|mut f| {
                use std::io::Write;
                f.write_all(raw.as_bytes())
            })
            .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    }
    #[cfg(not(unix))]
    fs::write(path, raw)
        .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn overrides(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_documented_values() {
        let cfg = Config::default();
        assert_eq!(cfg.robot_port, 1448);
        assert_eq!(cfg.request_timeout_ms, 2000);
        assert_eq!(cfg.pois, ["POI1", "POI2", "POI3"]);
        assert_eq!(cfg.watchdog(), WatchdogConfig::default());
        assert!(cfg.precise && cfg.use_poi_yaw);
    }

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let cfg: Config = toml::from_str(r#"robot_ip = "10.0.0.5""#).unwrap();
        assert_eq!(cfg.robot_ip, "10.0.0.5");
        assert_eq!(cfg.robot_port, 1448);
        assert_eq!(cfg.base_url(), "http://10.0.0.5:1448");
        assert_eq!(cfg.max_wait_sec, 180);
    }

    #[cfg(unix)]
    #[test]
    fn config_file_has_restrictive_permissions() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());

        save_to(&Config::default(), &path).expect("save");

        let file_mode = std::fs::metadata(&path).expect("file").permissions().mode() & 0o777;
        assert_eq!(file_mode, 0o600);
        let dir_mode = std::fs::metadata(path.parent().unwrap())
            .expect("dir")
            .permissions()
            .mode()
            & 0o777;
        assert_eq!(dir_mode, 0o700);
    }

    #[cfg(unix)]
    #[test]
    fn saving_into_existing_directory_keeps_its_mode() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().expect("tmp dir");
        std::fs::set_permissions(dir.path(), std::fs::Permissions::from_mode(0o755))
            .expect("chmod");
        let path = dir.path().join("patrol.toml");

        save_to(&Config::default(), &path).expect("save");

        let dir_mode = std::fs::metadata(dir.path()).expect("dir").permissions().mode() & 0o777;
        assert_eq!(dir_mode, 0o755);
        let file_mode = std::fs::metadata(&path).expect("file").permissions().mode() & 0o777;
        assert_eq!(file_mode, 0o600);
    }

    #[test]
    fn roundtrip_custom_config() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());
        let cfg = Config {
            robot_ip: "192.168.11.1".into(),
            pois: vec!["Kitchen".into(), "Lobby".into()],
            comm_fail_limit: 4,
            use_poi_yaw: false,
            ..Config::default()
        };

        save_to(&cfg, &path).expect("save");
        let mut loaded: Config =
            toml::from_str(&std::fs::read_to_string(&path).unwrap()).expect("parse");
        apply_overrides(&mut loaded, overrides(&[]));

        assert_eq!(loaded, cfg);
    }

    #[test]
    fn load_from_returns_none_when_missing() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());
        assert!(load_from(&path).expect("no error").is_none());
    }

    #[test]
    fn load_from_reports_parse_errors() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "robot_port = \"not a number\"").unwrap();
        let err = load_from(&path).unwrap_err();
        assert!(err.contains("Failed to parse config"));
    }

    #[test]
    fn config_path_points_to_patrol_dir() {
        let p = config_path_for_home("/home/operator");
        assert_eq!(p, PathBuf::from("/home/operator/.patrol/config.toml"));
    }

    #[test]
    fn overrides_replace_fields() {
        let mut cfg = Config::default();
        apply_overrides(
            &mut cfg,
            overrides(&[
                ("PATROL_ROBOT_IP", " 10.1.2.3 "),
                ("PATROL_ROBOT_PORT", "8080"),
                ("PATROL_REQUEST_TIMEOUT_MS", "500"),
                ("PATROL_POIS", "Dock, Hall ,,Lab"),
            ]),
        );
        assert_eq!(cfg.robot_ip, "10.1.2.3");
        assert_eq!(cfg.robot_port, 8080);
        assert_eq!(cfg.request_timeout(), Duration::from_millis(500));
        assert_eq!(cfg.pois, ["Dock", "Hall", "Lab"]);
    }

    #[test]
    fn unprefixed_robot_address_is_a_fallback() {
        let mut cfg = Config::default();
        apply_overrides(
            &mut cfg,
            overrides(&[("ROBOT_IP", "10.9.8.7"), ("ROBOT_PORT", "1500")]),
        );
        assert_eq!(cfg.base_url(), "http://10.9.8.7:1500");

        let mut cfg = Config::default();
        apply_overrides(
            &mut cfg,
            overrides(&[
                ("ROBOT_IP", "10.9.8.7"),
                ("PATROL_ROBOT_IP", "10.0.0.1"),
                ("ROBOT_PORT", "1500"),
                ("PATROL_ROBOT_PORT", "1448"),
            ]),
        );
        assert_eq!(cfg.base_url(), "http://10.0.0.1:1448");
    }

    #[test]
    fn invalid_overrides_are_ignored() {
        let mut cfg = Config::default();
        apply_overrides(
            &mut cfg,
            overrides(&[
                ("PATROL_ROBOT_IP", "   "),
                ("PATROL_ROBOT_PORT", "not-a-port"),
                ("PATROL_REQUEST_TIMEOUT_MS", "0"),
                ("PATROL_POIS", " , ,"),
            ]),
        );
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn apply_env_overrides_reads_process_env() {
        // SAFETY: single-threaded test; no other test reads this variable.
        unsafe { std::env::set_var("PATROL_ROBOT_PORT", "9448") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.robot_port, 9448);
        unsafe { std::env::remove_var("PATROL_ROBOT_PORT") };
    }

    #[test]
    fn validate_requires_robot_ip_only_for_real_robot() {
        let cfg = Config::default();
        assert!(cfg.validate(true).unwrap_err().contains("robot_ip"));
        assert!(cfg.validate(false).is_ok());
    }

    #[test]
    fn validate_rejects_bad_values() {
        let base = Config {
            robot_ip: "10.0.0.5".into(),
            ..Config::default()
        };
        assert!(base.validate(true).is_ok());

        let cfg = Config { pois: vec![], ..base.clone() };
        assert!(cfg.validate(true).unwrap_err().contains("POI"));

        let cfg = Config {
            pois: vec!["A".into(), "".into()],
            ..base.clone()
        };
        assert!(cfg.validate(true).is_err());

        let cfg = Config { comm_fail_limit: 0, ..base.clone() };
        assert!(cfg.validate(true).unwrap_err().contains("comm_fail_limit"));

        let cfg = Config { poll_interval_ms: 0, ..base };
        assert!(cfg.validate(true).unwrap_err().contains("poll_interval_ms"));
    }
}
