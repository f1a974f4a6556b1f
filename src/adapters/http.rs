use crate::adapters::dto::RemoteJokeResponse;
use crate::domain::model::{Joke, JokeCategory};
use crate::domain::ports::JokeApi;
use crate::utils::error::{JokeError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;

const CATEGORIES_PATH: &str = "/jokes/categories";
const RANDOM_JOKE_PATH: &str = "/jokes/random";

/// 以 reqwest 呼叫 api.chucknorris.io 相容的端點
#[derive(Debug, Clone)]
pub struct HttpJokeApi {
    client: Client,
    base_url: String,
}

impl HttpJokeApi {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!("📡 GET {} {:?}", url, query);

        let response = self.client.get(&url).query(query).send().await?;
        let status = response.status();
        tracing::debug!("📡 API response status: {}", status);

        if !status.is_success() {
            return Err(JokeError::UnexpectedStatus {
                status: status.as_u16(),
                url,
            });
        }

        // 先取 bytes 再解析，讓格式錯誤歸類為 mapping failure
        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| JokeError::MappingError {
            message: format!("{} returned malformed JSON: {}", url, e),
        })
    }
}

#[async_trait]
impl JokeApi for HttpJokeApi {
    async fn get_categories(&self) -> Result<Vec<String>> {
        self.get_json(CATEGORIES_PATH, &[]).await
    }

    async fn get_joke(&self, category: &JokeCategory) -> Result<Joke> {
        let response: RemoteJokeResponse = self
            .get_json(RANDOM_JOKE_PATH, &[("category", category.as_str())])
            .await?;
        response.into_joke(category)
    }
}
