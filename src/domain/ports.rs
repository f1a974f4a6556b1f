use crate::domain::model::{Joke, JokeCategory};
use crate::utils::error::{JokeError, Result};
use async_trait::async_trait;

/// 對外部笑話 API 的傳輸層抽象；HTTP 實作在 adapters::http
///
/// 回應格式轉換由實作負責，格式錯誤回傳 `MappingError`。
#[async_trait]
pub trait JokeApi: Send + Sync {
    async fn get_categories(&self) -> Result<Vec<String>>;
    async fn get_joke(&self, category: &JokeCategory) -> Result<Joke>;
}

/// 呼叫端看到的介面：兩個操作都不會回傳錯誤
#[async_trait]
pub trait JokeGateway: Send + Sync {
    async fn random_category(&self) -> JokeCategory;
    async fn joke(&self, category: &JokeCategory) -> Joke;
}

/// fallback 發生時的通知內容
#[derive(Debug)]
pub struct FallbackEvent<'a> {
    pub operation: &'static str,
    pub policy: &'a str,
    pub category: Option<&'a JokeCategory>,
    pub cause: &'a JokeError,
}

pub trait FallbackReporter: Send + Sync {
    fn on_fallback(&self, event: &FallbackEvent<'_>);
}

/// 預設 reporter：以 tracing 記錄錯誤
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingFallbackReporter;

impl FallbackReporter for TracingFallbackReporter {
    fn on_fallback(&self, event: &FallbackEvent<'_>) {
        match event.category {
            Some(category) => tracing::error!(
                operation = event.operation,
                policy = event.policy,
                category = %category,
                error_category = ?event.cause.category(),
                "Fallback executed for {}. Category: {}. Error: {}",
                event.operation,
                category,
                event.cause
            ),
            None => tracing::error!(
                operation = event.operation,
                policy = event.policy,
                error_category = ?event.cause.category(),
                "Fallback executed for {}. Error: {}",
                event.operation,
                event.cause
            ),
        }
    }
}
