use crate::core::resilience::ResiliencePolicy;
use crate::domain::model::{Joke, JokeCategory};
use crate::domain::ports::{
    FallbackEvent, FallbackReporter, JokeApi, JokeGateway, TracingFallbackReporter,
};
use crate::utils::error::JokeError;
use async_trait::async_trait;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const GET_RANDOM_CATEGORY: &str = "getRandomCategory";
const GET_JOKE: &str = "getJoke";

/// 從上游分類清單中挑選的方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategorySelection {
    #[default]
    Random,
    First,
}

/// 以 resilience policy 包裝外部笑話 API 的 client
///
/// 兩個操作都不會失敗：任何錯誤都會被記錄並換成固定的預設值。
#[derive(Clone)]
pub struct ResilientJokeClient {
    api: Arc<dyn JokeApi>,
    policy: Arc<ResiliencePolicy>,
    reporter: Arc<dyn FallbackReporter>,
    selection: CategorySelection,
}

impl ResilientJokeClient {
    pub fn new(api: Arc<dyn JokeApi>, policy: Arc<ResiliencePolicy>) -> Self {
        Self {
            api,
            policy,
            reporter: Arc::new(TracingFallbackReporter),
            selection: CategorySelection::default(),
        }
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn FallbackReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn with_category_selection(mut self, selection: CategorySelection) -> Self {
        self.selection = selection;
        self
    }

    pub fn policy(&self) -> &ResiliencePolicy {
        &self.policy
    }

    fn report(&self, operation: &'static str, category: Option<&JokeCategory>, cause: &JokeError) {
        self.reporter.on_fallback(&FallbackEvent {
            operation,
            policy: self.policy.name(),
            category,
            cause,
        });
    }

    fn pick_category(&self, categories: Vec<String>) -> JokeCategory {
        let candidates: Vec<String> = categories
            .into_iter()
            .filter(|c| !c.trim().is_empty())
            .collect();

        let picked = match self.selection {
            CategorySelection::Random => candidates.choose(&mut rand::thread_rng()).cloned(),
            CategorySelection::First => candidates.into_iter().next(),
        };

        picked.map(JokeCategory::from).unwrap_or_else(|| {
            tracing::debug!("Upstream returned no categories, using default");
            JokeCategory::default()
        })
    }
}

#[async_trait]
impl JokeGateway for ResilientJokeClient {
    async fn random_category(&self) -> JokeCategory {
        let api = self.api.as_ref();

        self.policy
            .execute_or_else(
                GET_RANDOM_CATEGORY,
                || async move { api.get_categories().await.map(|c| self.pick_category(c)) },
                |e| {
                    self.report(GET_RANDOM_CATEGORY, None, &e);
                    JokeCategory::default()
                },
            )
            .await
    }

    async fn joke(&self, category: &JokeCategory) -> Joke {
        let api = self.api.as_ref();

        // adapter 內完成格式轉換，格式錯誤與網路錯誤同樣重試
        self.policy
            .execute_or_else(
                GET_JOKE,
                || api.get_joke(category),
                |e| {
                    self.report(GET_JOKE, Some(category), &e);
                    Joke::unavailable()
                },
            )
            .await
    }
}

impl std::fmt::Debug for ResilientJokeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResilientJokeClient")
            .field("policy", &self.policy.name())
            .field("selection", &self.selection)
            .finish()
    }
}
