use crate::config::toml_config::TomlConfig;
use crate::core::JokeCategory;
use crate::utils::error::Result;
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "resilient-joke")]
#[command(about = "Fetch jokes through a circuit breaker, rate limiter, bulkhead and retry")]
pub struct CliConfig {
    #[arg(long, short, help = "Path to a TOML configuration file")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Override api.base_url")]
    pub base_url: Option<String>,

    #[arg(long, help = "Joke category; a random upstream category when omitted")]
    pub category: Option<String>,

    #[arg(long, default_value = "1")]
    pub count: usize,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub json_logs: bool,
}

impl CliConfig {
    /// 載入 TOML 配置（若有）並套用命令列覆寫
    pub fn load(&self) -> Result<TomlConfig> {
        let mut config = match &self.config {
            Some(path) => TomlConfig::from_file(path)?,
            None => TomlConfig::default(),
        };

        if let Some(base_url) = &self.base_url {
            config.api.base_url = base_url.clone();
        }

        Ok(config)
    }

    pub fn requested_category(&self) -> Option<JokeCategory> {
        self.category.as_deref().map(JokeCategory::from)
    }
}
