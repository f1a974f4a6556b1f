use serde::{Deserialize, Serialize};
use std::fmt;

/// 上游沒有可用分類時使用的預設分類
pub const DEFAULT_CATEGORY: &str = "dev";

/// fallback 笑話的固定內容
pub const UNAVAILABLE_TEXT: &str = "Temporarily unavailable";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JokeCategory(String);

impl JokeCategory {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl Default for JokeCategory {
    fn default() -> Self {
        Self(DEFAULT_CATEGORY.to_string())
    }
}

impl fmt::Display for JokeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JokeCategory {
    fn from(label: &str) -> Self {
        Self::new(label)
    }
}

impl From<String> for JokeCategory {
    fn from(label: String) -> Self {
        Self(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Joke {
    text: String,
    category: JokeCategory,
}

impl Joke {
    pub fn new(text: impl Into<String>, category: JokeCategory) -> Self {
        Self {
            text: text.into(),
            category,
        }
    }

    /// 所有失敗路徑共用的哨兵值
    pub fn unavailable() -> Self {
        Self::new(UNAVAILABLE_TEXT, JokeCategory::default())
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn category(&self) -> &JokeCategory {
        &self.category
    }
}
