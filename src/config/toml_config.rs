use crate::adapters::HttpJokeApi;
use crate::core::resilience::{PolicyConfig, PolicyRegistry, DEFAULT_POLICY_NAME};
use crate::core::{CategorySelection, ResilientJokeClient};
use crate::utils::error::{JokeError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_positive_number, validate_range, validate_url, Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub api: ApiConfig,
    /// 具名 policy group，例如 `[resilience.jokeService.retry]`
    pub resilience: HashMap<String, PolicyConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_seconds: u64,
    pub category_selection: CategorySelection,
    pub policy: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.chucknorris.io".to_string(),
            timeout_seconds: 5,
            category_selection: CategorySelection::Random,
            policy: DEFAULT_POLICY_NAME.to_string(),
        }
    }
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(JokeError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| JokeError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${JOKE_API_URL})
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| JokeError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 取得 policy 設定；沒有設定時使用預設值
    pub fn policy_config(&self, name: &str) -> PolicyConfig {
        self.resilience.get(name).cloned().unwrap_or_default()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_seconds)
    }

    pub fn policy_registry(&self) -> PolicyRegistry {
        PolicyRegistry::new(self.resilience.clone())
    }

    /// 依配置組出 HTTP adapter 與 policy group
    pub fn build_client(&self, registry: &PolicyRegistry) -> Result<ResilientJokeClient> {
        let api = HttpJokeApi::new(&self.api.base_url, self.request_timeout())?;
        let policy = registry.policy(&self.api.policy);

        tracing::debug!(
            "Built joke client for {} with policy '{}'",
            api.base_url(),
            policy.name()
        );

        Ok(ResilientJokeClient::new(Arc::new(api), policy)
            .with_category_selection(self.api.category_selection))
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validate_url("api.base_url", &self.api.base_url)?;
        validate_positive_number("api.timeout_seconds", self.api.timeout_seconds as usize, 1)?;
        validate_non_empty_string("api.policy", &self.api.policy)?;

        for (name, policy) in &self.resilience {
            validate_policy(name, policy)?;
        }

        Ok(())
    }
}

fn validate_policy(name: &str, policy: &PolicyConfig) -> Result<()> {
    let field = |key: &str| format!("resilience.{}.{}", name, key);

    let cb = &policy.circuit_breaker;
    validate_range(
        &field("circuit_breaker.failure_rate_threshold"),
        cb.failure_rate_threshold,
        1.0,
        100.0,
    )?;
    validate_positive_number(
        &field("circuit_breaker.sliding_window_size"),
        cb.sliding_window_size,
        1,
    )?;
    validate_positive_number(
        &field("circuit_breaker.minimum_number_of_calls"),
        cb.minimum_number_of_calls,
        1,
    )?;
    validate_positive_number(
        &field("circuit_breaker.permitted_number_of_calls_in_half_open_state"),
        cb.permitted_number_of_calls_in_half_open_state,
        1,
    )?;

    let rl = &policy.rate_limiter;
    validate_positive_number(
        &field("rate_limiter.limit_for_period"),
        rl.limit_for_period as usize,
        1,
    )?;
    validate_positive_number(
        &field("rate_limiter.limit_refresh_period_ms"),
        rl.limit_refresh_period_ms as usize,
        1,
    )?;

    validate_range(
        &field("bulkhead.max_concurrent_calls"),
        policy.bulkhead.max_concurrent_calls,
        1,
        Semaphore::MAX_PERMITS,
    )?;

    let retry = &policy.retry;
    validate_positive_number(&field("retry.max_attempts"), retry.max_attempts as usize, 1)?;
    validate_range(&field("retry.multiplier"), retry.multiplier, 1.0, 100.0)?;
    validate_range(
        &field("retry.randomization_factor"),
        retry.randomization_factor,
        0.0,
        1.0,
    )?;

    Ok(())
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
