//! Daemon configuration, loaded once at startup.

use std::time::Duration;

use serde::Deserialize;

pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8000";
pub const DEFAULT_MODULE_ROOT: &str = "./modules";
pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";

/// Every field is optional; missing values fall back to defaults so the
/// daemon comes up with an empty allow-list rather than refusing to start.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct GlobalConfig {
    pub listen_addr: Option<String>,
    pub module_root: Option<String>,
    /// The module allow-list. Only names listed here resolve at all.
    pub modules: Option<Vec<String>>,
    /// Key-value store URL; the literal "memory" selects the in-process store.
    pub redis_url: Option<String>,
    pub command_timeout_ms: Option<u64>,
}

impl GlobalConfig {
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from("config/patchboard.toml")
    }

    pub fn load_from(path: &str) -> anyhow::Result<Self> {
        let s = std::fs::read_to_string(path).unwrap_or_default();
        let cfg = match toml::from_str(&s) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::warn!("Invalid config at {}: {}; using defaults", path, e);
                Self::default()
            }
        };
        Ok(cfg)
    }

    /// `PATCHBOARD_LISTEN_ADDR` overrides the file value (test/dev use).
    pub fn listen_addr(&self) -> String {
        std::env::var("PATCHBOARD_LISTEN_ADDR")
            .ok()
            .or_else(|| self.listen_addr.clone())
            .unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string())
    }

    /// `PATCHBOARD_MODULE_ROOT` overrides the file value (test/dev use).
    pub fn module_root(&self) -> String {
        std::env::var("PATCHBOARD_MODULE_ROOT")
            .ok()
            .or_else(|| self.module_root.clone())
            .unwrap_or_else(|| DEFAULT_MODULE_ROOT.to_string())
    }

    pub fn modules(&self) -> Vec<String> {
        self.modules.clone().unwrap_or_default()
    }

    pub fn redis_url(&self) -> String {
        self.redis_url
            .clone()
            .unwrap_or_else(|| DEFAULT_REDIS_URL.to_string())
    }

    pub fn command_timeout(&self) -> Duration {
        self.command_timeout_ms
            .map(Duration::from_millis)
            .unwrap_or(crate::dispatch::DEFAULT_COMMAND_TIMEOUT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_apply_when_fields_are_missing() {
        let cfg = GlobalConfig::default();

        assert_eq!(cfg.module_root(), DEFAULT_MODULE_ROOT);
        assert_eq!(cfg.redis_url(), DEFAULT_REDIS_URL);
        assert!(cfg.modules().is_empty());
        assert_eq!(cfg.command_timeout(), Duration::from_millis(5000));
    }

    #[test]
    fn load_from_missing_file_yields_defaults() {
        let cfg = GlobalConfig::load_from("does/not/exist.toml").unwrap();
        assert!(cfg.modules().is_empty());
    }

    #[test]
    fn load_from_parses_all_fields() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "listen_addr = \"0.0.0.0:9000\"\n\
             module_root = \"/opt/patch/modules\"\n\
             modules = [\"redis\", \"buffer\", \"heartrate\"]\n\
             redis_url = \"redis://broker:6379\"\n\
             command_timeout_ms = 2500"
        )
        .unwrap();

        let cfg = GlobalConfig::load_from(file.path().to_str().unwrap()).unwrap();
        assert_eq!(cfg.module_root(), "/opt/patch/modules");
        assert_eq!(cfg.modules(), vec!["redis", "buffer", "heartrate"]);
        assert_eq!(cfg.redis_url(), "redis://broker:6379");
        assert_eq!(cfg.command_timeout(), Duration::from_millis(2500));
    }

    #[test]
    fn invalid_toml_falls_back_to_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "modules = not-a-list").unwrap();

        let cfg = GlobalConfig::load_from(file.path().to_str().unwrap()).unwrap();
        assert!(cfg.modules().is_empty());
    }
}
