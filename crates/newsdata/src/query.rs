//! NewsData.io request parameters
//!
//! The key is never part of a query: the client appends `apikey` itself on
//! every attempt so a rotation takes effect on the very next request.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// NewsData.io API endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// Breaking and recent news (last 48 hours).
    Latest,
    /// Historical news by date range.
    Archive,
    /// Cryptocurrency news.
    Crypto,
    /// Financial market news.
    Market,
}

impl Endpoint {
    pub const ALL: [Endpoint; 4] = [
        Endpoint::Latest,
        Endpoint::Archive,
        Endpoint::Crypto,
        Endpoint::Market,
    ];

    /// Short name, also used as a metrics label.
    pub fn as_str(self) -> &'static str {
        match self {
            Endpoint::Latest => "latest",
            Endpoint::Archive => "archive",
            Endpoint::Crypto => "crypto",
            Endpoint::Market => "market",
        }
    }

    /// Path relative to the API base URL.
    pub fn path(self) -> &'static str {
        match self {
            Endpoint::Latest => "/latest",
            Endpoint::Archive => "/archive",
            Endpoint::Crypto => "/crypto",
            Endpoint::Market => "/market",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Endpoint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Endpoint::ALL
            .into_iter()
            .find(|e| e.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown endpoint: {s}"))
    }
}

/// Filters accepted by NewsData.io. Unset fields are not sent.
///
/// Deserializes from the same parameter names NewsData uses, so a query
/// string can be forwarded as-is.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct NewsQuery {
    pub q: Option<String>,
    #[serde(rename = "qInTitle")]
    pub q_in_title: Option<String>,
    #[serde(rename = "qInMeta")]
    pub q_in_meta: Option<String>,
    pub timeframe: Option<String>,
    pub country: Option<String>,
    pub category: Option<String>,
    #[serde(rename = "excludecategory")]
    pub exclude_category: Option<String>,
    pub language: Option<String>,
    pub domain: Option<String>,
    #[serde(rename = "excludedomain")]
    pub exclude_domain: Option<String>,
    #[serde(rename = "prioritydomain")]
    pub priority_domain: Option<String>,
    pub coin: Option<String>,
    pub symbol: Option<String>,
    pub from_date: Option<String>,
    pub to_date: Option<String>,
    pub size: Option<u32>,
    /// `nextPage` token from a previous response.
    pub page: Option<String>,
    pub full_content: Option<bool>,
    pub image: Option<bool>,
    pub video: Option<bool>,
    #[serde(rename = "removeduplicate")]
    pub remove_duplicate: Option<bool>,
}

impl NewsQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keyword search across title, description and content.
    pub fn q(mut self, q: impl Into<String>) -> Self {
        self.q = Some(q.into());
        self
    }

    pub fn q_in_title(mut self, q: impl Into<String>) -> Self {
        self.q_in_title = Some(q.into());
        self
    }

    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn coin(mut self, coin: impl Into<String>) -> Self {
        self.coin = Some(coin.into());
        self
    }

    pub fn symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = Some(symbol.into());
        self
    }

    /// Window such as `"6"` (hours) or `"30m"`; only valid on `/latest`.
    pub fn timeframe(mut self, timeframe: impl Into<String>) -> Self {
        self.timeframe = Some(timeframe.into());
        self
    }

    /// Inclusive date range (`YYYY-MM-DD`), used by `/archive`.
    pub fn date_range(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.from_date = Some(from.into());
        self.to_date = Some(to.into());
        self
    }

    pub fn size(mut self, size: u32) -> Self {
        self.size = Some(size);
        self
    }

    pub fn page(mut self, page: impl Into<String>) -> Self {
        self.page = Some(page.into());
        self
    }

    pub fn remove_duplicate(mut self, remove: bool) -> Self {
        self.remove_duplicate = Some(remove);
        self
    }

    /// Upstream query pairs, in a stable order. Flags are sent as `1`/`0`.
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let text = [
            ("q", &self.q),
            ("qInTitle", &self.q_in_title),
            ("qInMeta", &self.q_in_meta),
            ("timeframe", &self.timeframe),
            ("country", &self.country),
            ("category", &self.category),
            ("excludecategory", &self.exclude_category),
            ("language", &self.language),
            ("domain", &self.domain),
            ("excludedomain", &self.exclude_domain),
            ("prioritydomain", &self.priority_domain),
            ("coin", &self.coin),
            ("symbol", &self.symbol),
            ("from_date", &self.from_date),
            ("to_date", &self.to_date),
            ("page", &self.page),
        ];
        let flags = [
            ("full_content", self.full_content),
            ("image", self.image),
            ("video", self.video),
            ("removeduplicate", self.remove_duplicate),
        ];

        let mut pairs: Vec<(&'static str, String)> = text
            .into_iter()
            .filter_map(|(name, value)| value.as_ref().map(|v| (name, v.clone())))
            .collect();
        if let Some(size) = self.size {
            pairs.push(("size", size.to_string()));
        }
        pairs.extend(flags.into_iter().filter_map(|(name, value)| {
            value.map(|on| (name, if on { "1" } else { "0" }.to_string()))
        }));
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_paths() {
        assert_eq!(Endpoint::Latest.path(), "/latest");
        assert_eq!(Endpoint::Archive.path(), "/archive");
        assert_eq!(Endpoint::Crypto.path(), "/crypto");
        assert_eq!(Endpoint::Market.path(), "/market");
    }

    #[test]
    fn endpoint_from_str() {
        assert_eq!("crypto".parse::<Endpoint>(), Ok(Endpoint::Crypto));
        assert_eq!("LATEST".parse::<Endpoint>(), Ok(Endpoint::Latest));
        assert!("sources".parse::<Endpoint>().is_err());
    }

    #[test]
    fn empty_query_sends_nothing() {
        assert!(NewsQuery::new().to_pairs().is_empty());
    }

    #[test]
    fn builder_sets_upstream_names() {
        let pairs = NewsQuery::new()
            .q("election odds")
            .q_in_title("senate")
            .language("en")
            .size(10)
            .remove_duplicate(true)
            .to_pairs();
        assert_eq!(
            pairs,
            vec![
                ("q", "election odds".to_string()),
                ("qInTitle", "senate".to_string()),
                ("language", "en".to_string()),
                ("size", "10".to_string()),
                ("removeduplicate", "1".to_string()),
            ]
        );
    }

    #[test]
    fn date_range_and_page() {
        let pairs = NewsQuery::new()
            .date_range("2026-01-01", "2026-01-31")
            .page("cursor-2")
            .to_pairs();
        assert!(pairs.contains(&("from_date", "2026-01-01".to_string())));
        assert!(pairs.contains(&("to_date", "2026-01-31".to_string())));
        assert!(pairs.contains(&("page", "cursor-2".to_string())));
    }

    #[test]
    fn deserializes_newsdata_parameter_names() {
        let query: NewsQuery = serde_json::from_value(serde_json::json!({
            "q": "bitcoin",
            "qInTitle": "etf",
            "removeduplicate": false,
            "apikey": "must-be-ignored"
        }))
        .unwrap();
        assert_eq!(query.q.as_deref(), Some("bitcoin"));
        assert_eq!(query.q_in_title.as_deref(), Some("etf"));
        assert_eq!(query.remove_duplicate, Some(false));
        assert!(
            query.to_pairs().iter().all(|(name, _)| *name != "apikey"),
            "caller-supplied apikey must never be forwarded"
        );
    }
}
