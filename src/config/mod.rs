use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server settings
    pub server: ServerConfig,

    /// External producer tool settings
    pub tools: ToolsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind host
    pub host: String,

    /// Bind port
    pub port: u16,

    /// Allowed CORS origin; any origin when unset
    pub allow_origin: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Interpreter used to run the producer scripts
    pub python_bin: String,

    /// Directory holding the producer scripts
    pub scripts_dir: PathBuf,

    /// Hard timeout for one producer run, in seconds
    pub timeout_secs: u64,

    /// Maximum concurrent producer processes
    pub max_concurrent: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 5000,
                allow_origin: None,
            },
            tools: ToolsConfig {
                python_bin: "python3".to_string(),
                scripts_dir: PathBuf::from("producers"),
                timeout_secs: 120,
                max_concurrent: 4,
            },
        }
    }
}

impl Config {
    /// Load configuration from file or create default
    pub async fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content = fs_err::read_to_string(&config_path)
                .context("Failed to read config file")?;

            let config: Config = serde_yaml::from_str(&content)
                .context("Failed to parse config file")?;

            config.validate()?;
            Ok(config)
        } else {
            let config = Self::default();
            config.save().await?;
            Ok(config)
        }
    }

    /// Save configuration to file
    pub async fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            fs_err::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self)
            .context("Failed to serialize config")?;

        fs_err::write(&config_path, content)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Get configuration file path
    pub fn config_path() -> Result<PathBuf> {
        // First try current directory for easy testing
        let local_config = PathBuf::from("config.yaml");
        if local_config.exists() {
            return Ok(local_config);
        }

        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?;

        Ok(config_dir.join("quizscribe").join("config.yaml"))
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.tools.python_bin.trim().is_empty() {
            anyhow::bail!("tools.python_bin must be configured");
        }

        if self.tools.timeout_secs == 0 {
            anyhow::bail!("tools.timeout_secs must be at least 1");
        }

        if self.tools.max_concurrent == 0 {
            anyhow::bail!("tools.max_concurrent must be at least 1");
        }

        self.server.bind_addr()?;

        Ok(())
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("Current Configuration:");
        println!("  Bind Address: {}:{}", self.server.host, self.server.port);
        println!(
            "  CORS Origin: {}",
            self.server.allow_origin.as_deref().unwrap_or("* (any)")
        );
        println!("  Python: {}", self.tools.python_bin);
        println!("  Scripts Dir: {}", self.tools.scripts_dir.display());
        println!("  Producer Timeout: {}s", self.tools.timeout_secs);
        println!("  Max Concurrent Producers: {}", self.tools.max_concurrent);
    }
}

impl ServerConfig {
    /// Resolve the configured host/port into a socket address
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("Invalid bind address: {}:{}", self.host, self.port))
    }
}
