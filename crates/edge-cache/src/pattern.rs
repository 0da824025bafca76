//! Ban pattern composition.
//!
//! A ban pattern is an anchored regex over the host-relative part of a URL,
//! sent to every cache server together with the host it applies to. The base
//! URL is escaped literally; the suffix is a regex fragment chosen by the
//! caller to widen the match (query strings, trailing slash, widget marker).

use std::fmt;

use edge_core::{WidgetId, WIDGET_PARAM};
use serde::{Deserialize, Serialize};

/// Suffix fragment that also matches deeper paths sharing the base prefix.
pub const LOOSE_MATCH: &str = r"[^\?]*";

/// Suffix matching any query string.
pub const ANY_QUERY: &str = r"\?";

/// Suffix matching the exact resource, with or without a trailing slash.
pub const EXACT_RESOURCE: &str = r"[/]?$";

/// Errors building a ban pattern.
#[derive(Debug, thiserror::Error)]
pub enum PatternError {
    #[error("malformed URL '{url}': {source}")]
    MalformedUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

/// Which entries under a base URL a ban targets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum BanSuffix {
    /// Edge-inclusion requests for one widget.
    Widget { id: WidgetId, loose: bool },
    /// Full-page renders, excluding any widget inclusion request.
    Page { loose: bool },
    /// A standalone resource, with or without a query string.
    Resource { loose: bool },
    /// Any variant carrying a query string.
    AnyQuery,
    /// The exact resource with an optional trailing slash.
    Exact,
    /// Caller-supplied regex fragment, used verbatim.
    Custom(String),
}

impl BanSuffix {
    /// Render the regex fragment appended after the escaped base.
    ///
    /// `base_has_query` is true when the base URL already carries a query
    /// string, in which case the widget marker is joined with `&`.
    pub fn render(&self, base_has_query: bool) -> String {
        match self {
            Self::Widget { id, loose } => {
                let separator = if base_has_query { "&" } else { r"\?" };
                format!("{}{}.*{}={}", loose_prefix(*loose), separator, WIDGET_PARAM, id)
            }
            Self::Page { loose } => format!(
                "{}($|\\?(?!.*(?<=[?&]){}=))",
                loose_prefix(*loose),
                WIDGET_PARAM
            ),
            Self::Resource { loose } => format!("{}($|\\?)", loose_prefix(*loose)),
            Self::AnyQuery => ANY_QUERY.to_string(),
            Self::Exact => EXACT_RESOURCE.to_string(),
            Self::Custom(fragment) => fragment.clone(),
        }
    }
}

fn loose_prefix(loose: bool) -> &'static str {
    if loose {
        LOOSE_MATCH
    } else {
        ""
    }
}

/// An anchored path pattern plus the host it applies to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BanPattern {
    pattern: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    host: Option<String>,
}

impl BanPattern {
    /// Build a pattern for `base_url` with a rendered suffix.
    pub fn new(base_url: &str, suffix: &BanSuffix) -> Result<Self, PatternError> {
        let base = BanBase::parse(base_url)?;
        Ok(base.pattern(suffix))
    }

    /// Pattern for the edge-inclusion requests of one widget.
    pub fn widget(base_url: &str, id: WidgetId, loose: bool) -> Result<Self, PatternError> {
        Self::new(base_url, &BanSuffix::Widget { id, loose })
    }

    /// Pattern for full-page renders of `base_url`.
    pub fn page(base_url: &str, loose: bool) -> Result<Self, PatternError> {
        Self::new(base_url, &BanSuffix::Page { loose })
    }

    /// Pattern for a widget served from its own dedicated URL.
    pub fn resource(url: &str, loose: bool) -> Result<Self, PatternError> {
        Self::new(url, &BanSuffix::Resource { loose })
    }

    /// Pattern with a caller-supplied regex suffix.
    pub fn custom(base_url: &str, suffix: impl Into<String>) -> Result<Self, PatternError> {
        Self::new(base_url, &BanSuffix::Custom(suffix.into()))
    }

    /// The anchored regex pattern.
    pub fn as_str(&self) -> &str {
        &self.pattern
    }

    /// The host the ban applies to, when the base URL has one.
    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }
}

impl fmt::Display for BanPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.host {
            Some(host) => write!(f, "{} (host {})", self.pattern, host),
            None => write!(f, "{}", self.pattern),
        }
    }
}

/// A parsed base URL, reusable for several suffixes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BanBase {
    escaped: String,
    has_query: bool,
    host: Option<String>,
}

impl BanBase {
    /// Parse and escape a base URL.
    ///
    /// One trailing slash is dropped and the `scheme://authority` prefix is
    /// removed; whatever remains (path and query) is escaped literally.
    pub fn parse(base_url: &str) -> Result<Self, PatternError> {
        let input = base_url.trim();
        let trimmed = input.strip_suffix('/').unwrap_or(input);

        let parsed = url::Url::parse(trimmed).map_err(|source| PatternError::MalformedUrl {
            url: base_url.to_string(),
            source,
        })?;

        let relative = strip_authority(trimmed);

        Ok(Self {
            escaped: regex::escape(relative),
            has_query: relative.contains('?'),
            host: parsed.host_str().map(String::from),
        })
    }

    /// Build the pattern for one suffix.
    pub fn pattern(&self, suffix: &BanSuffix) -> BanPattern {
        BanPattern {
            pattern: format!("^{}/?{}", self.escaped, suffix.render(self.has_query)),
            host: self.host.clone(),
        }
    }

    /// The parsed host.
    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }
}

/// Resolve a possibly host-relative `url` against the absolute `base`.
///
/// Absolute URLs are returned unchanged.
pub fn resolve_url(url: &str, base: &str) -> Result<String, PatternError> {
    match url::Url::parse(url.trim()) {
        Ok(_) => Ok(url.to_string()),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let base = url::Url::parse(base.trim()).map_err(|source| PatternError::MalformedUrl {
                url: base.to_string(),
                source,
            })?;
            base.join(url.trim())
                .map(String::from)
                .map_err(|source| PatternError::MalformedUrl {
                    url: url.to_string(),
                    source,
                })
        }
        Err(source) => Err(PatternError::MalformedUrl {
            url: url.to_string(),
            source,
        }),
    }
}

// Everything after `scheme://authority`, or the input unchanged if it has no authority.
fn strip_authority(url: &str) -> &str {
    let Some(start) = url.find("://").map(|i| i + 3) else {
        return url;
    };

    let rest = &url[start..];
    match rest.find(['/', '?', '#']) {
        Some(end) => &rest[end..],
        None => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fancy_regex::Regex;

    fn matches(pattern: &BanPattern, path: &str) -> bool {
        Regex::new(pattern.as_str()).unwrap().is_match(path).unwrap()
    }

    #[test]
    fn test_strips_one_trailing_slash_and_host() {
        let pattern = BanPattern::new("http://h/a/b/", &BanSuffix::AnyQuery).unwrap();
        assert_eq!(pattern.host(), Some("h"));
        assert_eq!(pattern.as_str(), r"^/a/b/?\?");
    }

    #[test]
    fn test_strips_only_one_slash() {
        let pattern = BanPattern::new("http://h/a//", &BanSuffix::Exact).unwrap();
        assert_eq!(pattern.as_str(), r"^/a//?[/]?$");
    }

    #[test]
    fn test_surrounding_whitespace_trimmed_first() {
        let pattern = BanPattern::new(" http://h/p/ ", &BanSuffix::AnyQuery).unwrap();
        assert_eq!(pattern.as_str(), r"^/p/?\?");
        assert_eq!(pattern.host(), Some("h"));
    }

    #[test]
    fn test_resolve_url() {
        assert_eq!(resolve_url("http://a/w", "http://site/news").unwrap(), "http://a/w");
        assert_eq!(resolve_url("/weather", "http://site/news?id=4").unwrap(), "http://site/weather");
        assert!(matches!(
            resolve_url("/weather", "not a url"),
            Err(PatternError::MalformedUrl { .. })
        ));
    }

    #[test]
    fn test_root_url() {
        let pattern = BanPattern::new("http://h/", &BanSuffix::Exact).unwrap();
        assert_eq!(pattern.as_str(), r"^/?[/]?$");
        assert!(matches(&pattern, "/"));
    }

    #[test]
    fn test_escapes_metacharacters() {
        let pattern = BanPattern::new("http://h/a.b+c(1)", &BanSuffix::Exact).unwrap();
        assert_eq!(pattern.as_str(), r"^/a\.b\+c\(1\)/?[/]?$");
        assert!(matches(&pattern, "/a.b+c(1)"));
        assert!(!matches(&pattern, "/aXb+c(1)"));
    }

    #[test]
    fn test_strips_port_and_userinfo() {
        let pattern = BanPattern::new("http://user:pw@h:8080/p", &BanSuffix::Exact).unwrap();
        assert_eq!(pattern.as_str(), r"^/p/?[/]?$");
        assert_eq!(pattern.host(), Some("h"));
    }

    #[test]
    fn test_custom_suffix_is_not_escaped() {
        let pattern = BanPattern::custom("http://h/p", r"\.json$").unwrap();
        assert_eq!(pattern.as_str(), r"^/p/?\.json$");
    }

    #[test]
    fn test_malformed_url() {
        let err = BanPattern::page("not a url", false).unwrap_err();
        assert!(matches!(err, PatternError::MalformedUrl { .. }));
    }

    #[test]
    fn test_idempotent() {
        let a = BanPattern::widget("http://site/news/", WidgetId(7), true).unwrap();
        let b = BanPattern::widget("http://site/news/", WidgetId(7), true).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_str(), b.as_str());
    }

    #[test]
    fn test_widget_suffix() {
        let pattern = BanPattern::widget("http://site/news", WidgetId(7), false).unwrap();
        assert_eq!(pattern.as_str(), r"^/news/?\?.*widget=7");
        assert!(matches(&pattern, "/news?widget=7"));
        assert!(matches(&pattern, "/news/?sort=asc&widget=7"));
        assert!(!matches(&pattern, "/news?sort=asc"));
        assert!(!matches(&pattern, "/news/archive?widget=7"));
    }

    #[test]
    fn test_loose_widget_suffix() {
        let pattern = BanPattern::widget("http://site/news", WidgetId(7), true).unwrap();
        assert_eq!(pattern.as_str(), r"^/news/?[^\?]*\?.*widget=7");
        assert!(matches(&pattern, "/news/archive?widget=7"));
    }

    #[test]
    fn test_page_suffix() {
        let pattern = BanPattern::page("http://site/news", false).unwrap();
        assert_eq!(pattern.as_str(), r"^/news/?($|\?(?!.*(?<=[?&])widget=))");

        assert!(matches(&pattern, "/news"));
        assert!(matches(&pattern, "/news/"));
        assert!(matches(&pattern, "/news?sort=asc"));
        assert!(matches(&pattern, "/news?otherwidget=1"));
        assert!(!matches(&pattern, "/news?widget=7"));
        assert!(!matches(&pattern, "/news?sort=asc&widget=7"));
        assert!(!matches(&pattern, "/newsroom"));
        assert!(!matches(&pattern, "/news/archive"));
    }

    #[test]
    fn test_loose_page_suffix() {
        let pattern = BanPattern::page("http://site/news", true).unwrap();
        assert!(matches(&pattern, "/news/archive"));
        assert!(matches(&pattern, "/news/archive?page=2"));
        assert!(!matches(&pattern, "/news/archive?widget=3"));
    }

    #[test]
    fn test_page_with_query_scenario() {
        let widget = BanPattern::widget("http://site/news?id=4", WidgetId(7), false).unwrap();
        let page = BanPattern::page("http://site/news?id=4", false).unwrap();

        assert_eq!(widget.host(), Some("site"));
        assert!(matches(&widget, "/news?id=4&widget=7"));
        assert!(matches(&widget, "/news?id=4&sort=asc&widget=7"));
        assert!(!matches(&widget, "/news?id=4"));

        assert!(matches(&page, "/news?id=4"));
        assert!(!matches(&page, "/news?id=4&widget=7"));
    }

    #[test]
    fn test_resource_suffix() {
        let pattern = BanPattern::resource("http://site/weather", false).unwrap();
        assert_eq!(pattern.as_str(), r"^/weather/?($|\?)");
        assert!(matches(&pattern, "/weather"));
        assert!(matches(&pattern, "/weather/"));
        assert!(matches(&pattern, "/weather?city=oslo"));
        assert!(!matches(&pattern, "/weathermap"));
        assert!(!matches(&pattern, "/weather/archive"));

        let loose = BanPattern::resource("http://site/weather", true).unwrap();
        assert!(matches(&loose, "/weather/archive?day=2"));
    }

    #[test]
    fn test_any_query_and_exact() {
        let any = BanPattern::new("http://h/p", &BanSuffix::AnyQuery).unwrap();
        let exact = BanPattern::new("http://h/p", &BanSuffix::Exact).unwrap();

        assert!(matches(&any, "/p?x=1"));
        assert!(!matches(&any, "/p"));
        assert!(matches(&exact, "/p"));
        assert!(matches(&exact, "/p/"));
        assert!(!matches(&exact, "/p/longer"));
        assert!(!matches(&exact, "/plonger"));
    }

    #[test]
    fn test_base_reused_for_several_suffixes() {
        let base = BanBase::parse("https://site/p").unwrap();
        assert_eq!(base.host(), Some("site"));
        assert_eq!(base.pattern(&BanSuffix::AnyQuery).as_str(), r"^/p/?\?");
        assert_eq!(base.pattern(&BanSuffix::Exact).as_str(), r"^/p/?[/]?$");
    }

    #[test]
    fn test_suffix_serialization() {
        let json = serde_json::to_string(&BanSuffix::Page { loose: true }).unwrap();
        assert_eq!(json, r#"{"type":"page","value":{"loose":true}}"#);
    }

    #[test]
    fn test_display() {
        let pattern = BanPattern::new("http://h/p", &BanSuffix::AnyQuery).unwrap();
        assert_eq!(pattern.to_string(), r"^/p/?\? (host h)");
    }
}
