use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::AppError;

const SYSTEM_PROMPT_FILE: &str = "system_creative.txt";
const EXAMPLES_FILE: &str = "few_shot_examples.json";
const CAPTURES_DIR: &str = "captures";
const MANIFEST_FILE: &str = "index.json";

/// Default config file looked up in the working directory.
const DEFAULT_CONFIG_FILE: &str = "studio.toml";

/// Max buffered request body (base64 images get large).
pub const DEFAULT_MAX_BODY_BYTES: usize = 25 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

impl LogFormat {
    fn parse(s: &str) -> Result<Self, AppError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "compact" | "text" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            other => Err(AppError::Config(format!("unknown log format '{other}'"))),
        }
    }
}

/// Resolved runtime configuration for the studio server.
#[derive(Debug, Clone)]
pub struct StudioConfig {
    pub host: IpAddr,
    pub port: u16,
    /// Holds `system_creative.txt` and `few_shot_examples.json`.
    pub prompts_dir: PathBuf,
    /// Served as static files; captures live under `<public_dir>/captures`.
    pub public_dir: PathBuf,
    /// Holds the generated components and their `index.json` manifest.
    pub components_dir: PathBuf,
    pub max_body_bytes: usize,
    pub log_format: LogFormat,
    pub log_dir: Option<PathBuf>,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 5173,
            prompts_dir: PathBuf::from("tambo_agent/prompts"),
            public_dir: PathBuf::from("preview/public"),
            components_dir: PathBuf::from("generated_components"),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            log_format: LogFormat::Compact,
            log_dir: None,
        }
    }
}

/// On-disk shape of `studio.toml`. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    host: Option<IpAddr>,
    port: Option<u16>,
    prompts_dir: Option<PathBuf>,
    public_dir: Option<PathBuf>,
    components_dir: Option<PathBuf>,
    max_body_bytes: Option<usize>,
    log_format: Option<LogFormat>,
    log_dir: Option<PathBuf>,
}

impl StudioConfig {
    /// Resolve config: defaults, then the TOML file (if any), then `STUDIO_*` env vars.
    ///
    /// The file is `$STUDIO_CONFIG` when set (must exist), otherwise
    /// `studio.toml` in the working directory when present.
    pub fn load() -> Result<Self, AppError> {
        let mut config = Self::default();

        match std::env::var("STUDIO_CONFIG") {
            Ok(path) => config.apply_file(Path::new(&path))?,
            Err(_) => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    config.apply_file(path)?;
                }
            }
        }

        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    fn apply_file(&mut self, path: &Path) -> Result<(), AppError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("cannot read {}: {e}", path.display())))?;
        self.apply_toml(&raw)
            .map_err(|e| AppError::Config(format!("{}: {e}", path.display())))
    }

    fn apply_toml(&mut self, raw: &str) -> Result<(), AppError> {
        let file: FileConfig =
            toml::from_str(raw).map_err(|e| AppError::Config(e.to_string()))?;

        if let Some(v) = file.host {
            self.host = v;
        }
        if let Some(v) = file.port {
            self.port = v;
        }
        if let Some(v) = file.prompts_dir {
            self.prompts_dir = v;
        }
        if let Some(v) = file.public_dir {
            self.public_dir = v;
        }
        if let Some(v) = file.components_dir {
            self.components_dir = v;
        }
        if let Some(v) = file.max_body_bytes {
            self.max_body_bytes = v;
        }
        if let Some(v) = file.log_format {
            self.log_format = v;
        }
        if file.log_dir.is_some() {
            self.log_dir = file.log_dir;
        }
        Ok(())
    }

    fn apply_env(&mut self, get: impl Fn(&str) -> Option<String>) -> Result<(), AppError> {
        if let Some(v) = get("STUDIO_HOST") {
            self.host = v
                .parse()
                .map_err(|_| AppError::Config(format!("STUDIO_HOST is not an IP address: {v}")))?;
        }
        if let Some(v) = get("STUDIO_PORT") {
            self.port = v
                .parse()
                .map_err(|_| AppError::Config(format!("STUDIO_PORT is not a port: {v}")))?;
        }
        if let Some(v) = get("STUDIO_PROMPTS_DIR") {
            self.prompts_dir = PathBuf::from(v);
        }
        if let Some(v) = get("STUDIO_PUBLIC_DIR") {
            self.public_dir = PathBuf::from(v);
        }
        if let Some(v) = get("STUDIO_COMPONENTS_DIR") {
            self.components_dir = PathBuf::from(v);
        }
        if let Some(v) = get("STUDIO_MAX_BODY_BYTES") {
            self.max_body_bytes = v.parse().map_err(|_| {
                AppError::Config(format!("STUDIO_MAX_BODY_BYTES is not a number: {v}"))
            })?;
        }
        if let Some(v) = get("STUDIO_LOG_FORMAT") {
            self.log_format = LogFormat::parse(&v)?;
        }
        if let Some(v) = get("STUDIO_LOG_DIR") {
            self.log_dir = Some(PathBuf::from(v));
        }
        Ok(())
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn system_prompt_path(&self) -> PathBuf {
        self.prompts_dir.join(SYSTEM_PROMPT_FILE)
    }

    pub fn examples_path(&self) -> PathBuf {
        self.prompts_dir.join(EXAMPLES_FILE)
    }

    pub fn captures_dir(&self) -> PathBuf {
        self.public_dir.join(CAPTURES_DIR)
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.components_dir.join(MANIFEST_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_and_derived_paths() {
        let config = StudioConfig::default();
        assert_eq!(config.port, 5173);
        assert_eq!(
            config.system_prompt_path(),
            PathBuf::from("tambo_agent/prompts/system_creative.txt")
        );
        assert_eq!(
            config.examples_path(),
            PathBuf::from("tambo_agent/prompts/few_shot_examples.json")
        );
        assert_eq!(config.captures_dir(), PathBuf::from("preview/public/captures"));
        assert_eq!(
            config.manifest_path(),
            PathBuf::from("generated_components/index.json")
        );
    }

    #[test]
    fn test_toml_overrides() {
        let mut config = StudioConfig::default();
        config
            .apply_toml(
                r#"
                port = 8080
                prompts_dir = "/srv/prompts"
                log_format = "json"
                "#,
            )
            .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.prompts_dir, PathBuf::from("/srv/prompts"));
        assert_eq!(config.log_format, LogFormat::Json);
        // Untouched keys keep their defaults
        assert_eq!(config.public_dir, PathBuf::from("preview/public"));
    }

    #[test]
    fn test_toml_rejects_unknown_keys() {
        let mut config = StudioConfig::default();
        assert!(config.apply_toml("colour = \"blue\"").is_err());
    }

    #[test]
    fn test_env_overrides_win() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("STUDIO_PORT", "9000"),
            ("STUDIO_HOST", "0.0.0.0"),
            ("STUDIO_LOG_DIR", "/tmp/studio-logs"),
        ]);
        let mut config = StudioConfig::default();
        config.apply_toml("port = 8080").unwrap();
        config
            .apply_env(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.addr().to_string(), "0.0.0.0:9000");
        assert_eq!(config.log_dir, Some(PathBuf::from("/tmp/studio-logs")));
    }

    #[test]
    fn test_env_bad_values() {
        let mut config = StudioConfig::default();
        let err = config
            .apply_env(|k| (k == "STUDIO_PORT").then(|| "not-a-port".to_string()))
            .unwrap_err();
        assert!(matches!(err, AppError::Config(_)));

        let err = config
            .apply_env(|k| (k == "STUDIO_LOG_FORMAT").then(|| "xml".to_string()))
            .unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }
}
