use std::sync::Arc;

use log::info;
use serde::Serialize;
use serde_json::Value;
use zeroize::Zeroizing;

use super::field_string;
use crate::http::{ApiRequest, FetchError, FetchJson};

pub const NEWSAPI_URL: &str = "https://newsapi.org/v2/everything";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewsArticle {
    pub title: String,
    pub source: String,
    pub published_at: String,
    pub url: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
}

pub struct NewsApiClient {
    base_url: String,
    api_key: Option<Zeroizing<String>>,
    fetcher: Arc<dyn FetchJson>,
}

impl NewsApiClient {
    pub fn new(fetcher: Arc<dyn FetchJson>, api_key: Option<Zeroizing<String>>) -> Self {
        Self {
            base_url: NEWSAPI_URL.to_string(),
            api_key,
            fetcher,
        }
    }

    /// Newest English articles matching `query`.
    pub async fn latest(&self, query: &str, page_size: u32) -> Result<Vec<NewsArticle>, FetchError> {
        let api_key = self.api_key.as_ref().ok_or(FetchError::MissingApiKey("NEWSAPI_KEY"))?;
        let request = ApiRequest::get(&self.base_url)
            .param("q", query)
            .param("language", "en")
            .param("sortBy", "publishedAt")
            .param("pageSize", page_size)
            .secret_param("apiKey", api_key);

        let data = self.fetcher.get_json(request).await?;
        let articles = data.get("articles").and_then(Value::as_array).cloned().unwrap_or_default();

        Ok(articles
            .iter()
            .map(|article| {
                let news = NewsArticle {
                    title: field_string(article, "title"),
                    source: article.get("source").map_or_else(|| "N/A".to_string(), |s| field_string(s, "name")),
                    published_at: field_string(article, "publishedAt"),
                    url: field_string(article, "url"),
                    description: article.get("description").and_then(Value::as_str).map(str::to_string),
                    kind: "news".to_string(),
                };
                info!("NewsAPI: {} ({}) - {}", news.title, news.source, news.published_at);
                news
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::MockFetchJson;
    use serde_json::json;

    #[tokio::test]
    async fn test_articles_are_mapped() {
        let mut mock = MockFetchJson::new();
        mock.expect_get_json()
            .withf(|req| req.params["q"] == "BlackRock OR IBIT OR ETHA" && req.params["pageSize"] == "5")
            .returning(|_| {
                Ok(json!({"status": "ok", "articles": [{
                    "source": {"id": null, "name": "Reuters"},
                    "title": "IBIT inflows",
                    "description": null,
                    "url": "https://example.com/a",
                    "publishedAt": "2025-06-05T10:00:00Z"
                }]}))
            });

        let client = NewsApiClient::new(Arc::new(mock), Some(Zeroizing::new("news-key".into())));
        let news = client.latest("BlackRock OR IBIT OR ETHA", 5).await.unwrap();
        assert_eq!(news.len(), 1);
        assert_eq!(news[0].source, "Reuters");
        assert_eq!(news[0].description, None);

        let value = serde_json::to_value(&news[0]).unwrap();
        assert_eq!(value["type"], "news");
    }

    #[tokio::test]
    async fn test_requires_key() {
        let client = NewsApiClient::new(Arc::new(MockFetchJson::new()), None);
        assert!(matches!(client.latest("x", 5).await, Err(FetchError::MissingApiKey(_))));
    }
}
