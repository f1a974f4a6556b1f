use crate::domain::model::{Joke, JokeCategory};
use crate::utils::error::{JokeError, Result};
use serde::Deserialize;

/// 上游笑話 API 的回應格式
///
/// 同時接受 api.chucknorris.io 的格式（`value` + `categories`）
/// 以及簡化格式（`text` + `category`）。其他欄位一律忽略。
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RemoteJokeResponse {
    #[serde(default, alias = "text")]
    pub value: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub id: Option<String>,
}

impl RemoteJokeResponse {
    /// 轉換成領域模型；回應缺少分類時使用呼叫時的分類
    pub fn into_joke(self, requested: &JokeCategory) -> Result<Joke> {
        let text = self.value.ok_or_else(|| JokeError::MappingError {
            message: format!(
                "joke payload{} has no text",
                self.id
                    .as_deref()
                    .map(|id| format!(" '{}'", id))
                    .unwrap_or_default()
            ),
        })?;

        let category = self
            .category
            .filter(|c| !c.trim().is_empty())
            .or_else(|| {
                self.categories
                    .into_iter()
                    .find(|c| !c.trim().is_empty())
            })
            .map(JokeCategory::from)
            .unwrap_or_else(|| requested.clone());

        Ok(Joke::new(text, category))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_maps_chuck_norris_payload() {
        let payload = serde_json::json!({
            "categories": ["dev"],
            "created_at": "2020-01-05 13:42:19.324003",
            "icon_url": "https://api.chucknorris.io/img/avatar/chuck-norris.png",
            "id": "abc123",
            "updated_at": "2020-01-05 13:42:19.324003",
            "url": "https://api.chucknorris.io/jokes/abc123",
            "value": "Chuck Norris writes code that optimizes itself."
        });

        let dto: RemoteJokeResponse = serde_json::from_value(payload).unwrap();
        let joke = dto.into_joke(&"food".into()).unwrap();

        assert_eq!(joke.text(), "Chuck Norris writes code that optimizes itself.");
        assert_eq!(joke.category().as_str(), "dev");
    }

    #[test]
    fn test_maps_simple_payload() {
        let payload = serde_json::json!({"text": "knock knock", "category": "food", "extra": 1});

        let dto: RemoteJokeResponse = serde_json::from_value(payload).unwrap();
        let joke = dto.into_joke(&"dev".into()).unwrap();

        assert_eq!(joke.text(), "knock knock");
        assert_eq!(joke.category().as_str(), "food");
    }

    #[test]
    fn test_missing_category_uses_requested() {
        let payload = serde_json::json!({"value": "uncategorized", "categories": []});

        let dto: RemoteJokeResponse = serde_json::from_value(payload).unwrap();
        let joke = dto.into_joke(&"science".into()).unwrap();

        assert_eq!(joke.category().as_str(), "science");
    }

    #[test]
    fn test_missing_text_is_mapping_error() {
        let payload = serde_json::json!({"id": "xyz", "categories": ["dev"]});

        let dto: RemoteJokeResponse = serde_json::from_value(payload).unwrap();
        let err = dto.into_joke(&"dev".into()).unwrap_err();

        assert!(matches!(err, JokeError::MappingError { .. }));
        assert!(err.to_string().contains("xyz"));
    }
}
