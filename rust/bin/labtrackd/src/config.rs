use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Server configuration loaded from a TOML context file.
///
/// ```toml
/// [storage]
/// data_dir = "/var/lib/labtrack"
///
/// [auth]
/// mode = "header"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub storage: StorageConfig,

    #[serde(default)]
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Directory holding all persistent data.
    pub data_dir: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// "header" reads the role from the role header (default);
    /// "allow-all" grants everyone admin — local development only.
    #[serde(default = "default_auth_mode")]
    pub mode: String,
}

fn default_auth_mode() -> String {
    "header".to_string()
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            mode: default_auth_mode(),
        }
    }
}

impl ServerConfig {
    /// Resolve a context name to a config path.
    ///
    /// A bare name resolves to `/etc/labtrack/<name>.toml`; anything
    /// containing `/` or `.` is used as a path directly.
    pub fn resolve_path(context: &str) -> PathBuf {
        if context.contains('/') || context.contains('.') {
            PathBuf::from(context)
        } else {
            PathBuf::from(format!("/etc/labtrack/{}.toml", context))
        }
    }

    /// Load and parse the config file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("cannot read {}: {}", path.display(), e))?;
        let config: ServerConfig = toml::from_str(&raw)
            .map_err(|e| anyhow::anyhow!("cannot parse {}: {}", path.display(), e))?;
        config.verify()?;
        Ok(config)
    }

    fn verify(&self) -> anyhow::Result<()> {
        if self.storage.data_dir.is_empty() {
            anyhow::bail!("storage.data_dir must not be empty");
        }
        match self.auth.mode.as_str() {
            "header" | "allow-all" => Ok(()),
            other => anyhow::bail!("unknown auth.mode '{}'", other),
        }
    }
}
