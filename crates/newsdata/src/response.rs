//! NewsData.io response envelope

use serde::{Deserialize, Serialize};

/// One page of results: `{"status","totalResults","results","nextPage"}`.
///
/// The same shape is returned when the key pool is exhausted, with zero
/// results, so callers cannot tell it from an empty search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsResponse {
    pub status: String,
    #[serde(default)]
    pub total_results: u64,
    pub results: Vec<Article>,
    #[serde(default)]
    pub next_page: Option<String>,
}

impl NewsResponse {
    /// Successful response with no articles.
    pub fn empty() -> Self {
        Self {
            status: "success".to_string(),
            total_results: 0,
            results: Vec::new(),
            next_page: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// A news article. Fields NewsData adds later land in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub article_id: String,
    pub title: String,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub keywords: Option<Vec<String>>,
    #[serde(default)]
    pub creator: Option<Vec<String>>,
    #[serde(default, rename = "pubDate")]
    pub pub_date: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub source_id: Option<String>,
    #[serde(default)]
    pub source_name: Option<String>,
    #[serde(default)]
    pub source_url: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub country: Option<Vec<String>>,
    #[serde(default)]
    pub category: Option<Vec<String>>,
    #[serde(default)]
    pub sentiment: Option<String>,
    #[serde(default)]
    pub duplicate: Option<bool>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_serializes_to_newsdata_shape() {
        let json = serde_json::to_value(NewsResponse::empty()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "status": "success",
                "totalResults": 0,
                "results": [],
                "nextPage": null
            })
        );
    }

    #[test]
    fn deserializes_newsdata_page() {
        let body = r#"{
            "status": "success",
            "totalResults": 1,
            "results": [{
                "article_id": "a1",
                "title": "Fed holds rates",
                "link": "https://example.com/fed",
                "keywords": null,
                "creator": ["Staff"],
                "pubDateTZ": "UTC",
                "pubDate": "2026-01-05 12:00:00",
                "category": ["business"],
                "ai_tag": "ONLY AVAILABLE IN PROFESSIONAL AND CORPORATE PLANS"
            }],
            "nextPage": "1736071200000000001"
        }"#;
        let response: NewsResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.total_results, 1);
        assert_eq!(response.next_page.as_deref(), Some("1736071200000000001"));
        let article = &response.results[0];
        assert_eq!(article.title, "Fed holds rates");
        assert_eq!(article.keywords, None);
        assert_eq!(article.pub_date.as_deref(), Some("2026-01-05 12:00:00"));
        assert_eq!(article.category.as_deref(), Some(&["business".to_string()][..]));
        assert_eq!(article.extra["pubDateTZ"], "UTC");
    }

    #[test]
    fn error_envelope_does_not_parse() {
        let body = r#"{"status":"error","results":{"message":"bad","code":"Unauthorized"}}"#;
        assert!(serde_json::from_str::<NewsResponse>(body).is_err());
    }
}
