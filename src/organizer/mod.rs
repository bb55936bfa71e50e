//! Turns a free-text brain dump into discrete items, either by splitting
//! lines locally or by asking an external service and falling back to line
//! splitting when the answer is unusable.

pub mod anthropic;
pub mod keyring;

use futures::future::BoxFuture;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use thiserror::Error;

use crate::core::item::{CATEGORY_GENERAL, Item};

static BULLET_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[-*•]\s*").unwrap());

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrganizeMode {
    #[default]
    Local,
    Delegated,
}

#[derive(Debug, Error)]
pub enum OrganizeError {
    #[error("API request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },
    #[error("no text in API response")]
    NoContent,
    #[error("no Anthropic API key configured")]
    MissingApiKey,
    #[error("keyring error: {0}")]
    Keyring(String),
}

/// One entry of a structured organizer answer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OrganizedItem {
    pub text: String,
    #[serde(default)]
    pub category: Option<String>,
}

impl OrganizedItem {
    pub fn general(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            category: None,
        }
    }

    /// Mint a fresh item, defaulting the category to "General".
    pub fn into_item(self) -> Item {
        let category = self
            .category
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| CATEGORY_GENERAL.to_string());
        Item::new(self.text, Some(category))
    }
}

/// An external service that organizes free text. Implementations return the
/// raw response text; interpreting it is left to `TextOrganizer`.
pub trait OrganizerService: Send + Sync {
    fn organize<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<String, OrganizeError>>;
}

/// Split on line breaks, trim, and drop blank lines.
pub fn split_lines(raw: &str) -> Vec<OrganizedItem> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(OrganizedItem::general)
        .collect()
}

/// Like `split_lines`, but also strips a leading `-`, `*` or `•` bullet.
pub fn split_bulleted_lines(raw: &str) -> Vec<OrganizedItem> {
    raw.lines()
        .map(|line| BULLET_RE.replace(line.trim(), "").trim().to_string())
        .filter(|line| !line.is_empty())
        .map(OrganizedItem::general)
        .collect()
}

fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let inner = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

/// Parse a structured `[{"text", "category"?}]` answer, dropping blank
/// entries. `None` when the response is not such a list.
pub fn parse_structured(response: &str) -> Option<Vec<OrganizedItem>> {
    let items: Vec<OrganizedItem> = serde_json::from_str(strip_code_fences(response)).ok()?;
    let items: Vec<OrganizedItem> = items
        .into_iter()
        .filter_map(|item| {
            let text = item.text.trim();
            (!text.is_empty()).then(|| OrganizedItem {
                text: text.to_string(),
                category: item.category,
            })
        })
        .collect();
    Some(items)
}

pub struct TextOrganizer {
    mode: OrganizeMode,
    service: Option<Box<dyn OrganizerService>>,
}

impl TextOrganizer {
    pub fn local() -> Self {
        Self {
            mode: OrganizeMode::Local,
            service: None,
        }
    }

    pub fn delegated(service: impl OrganizerService + 'static) -> Self {
        Self {
            mode: OrganizeMode::Delegated,
            service: Some(Box::new(service)),
        }
    }

    pub fn mode(&self) -> OrganizeMode {
        self.mode
    }

    /// Organize `raw` into fresh items. Makes at most one external call and
    /// never retries. An empty `Ok` is a real answer (blank dump, or a
    /// structured answer listing nothing) and clears the processed list
    /// when applied. Errors only when there was no usable answer at all.
    pub async fn organize(&self, raw: &str) -> Result<Vec<Item>, OrganizeError> {
        let organized = match (self.mode, &self.service) {
            (OrganizeMode::Delegated, Some(service)) if !raw.trim().is_empty() => {
                Self::delegate(&**service, raw).await?
            }
            _ => split_lines(raw),
        };
        Ok(organized.into_iter().map(OrganizedItem::into_item).collect())
    }

    async fn delegate(service: &dyn OrganizerService, raw: &str) -> Result<Vec<OrganizedItem>, OrganizeError> {
        let response = match service.organize(raw).await {
            Ok(response) => response,
            Err(e) => {
                let fallback = split_lines(raw);
                if fallback.is_empty() {
                    return Err(e);
                }
                log::warn!("Organizer call failed, splitting brain dump locally: {}", e);
                return Ok(fallback);
            }
        };

        if let Some(items) = parse_structured(&response) {
            log::debug!("Organizer returned {} structured items", items.len());
            return Ok(items);
        }

        log::warn!("Organizer response was not a structured list, using its lines");
        let fallback = split_bulleted_lines(strip_code_fences(&response));
        if fallback.is_empty() {
            return Err(OrganizeError::NoContent);
        }
        Ok(fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    enum Reply {
        Text(&'static str),
        Fail,
    }

    struct StubService {
        reply: Reply,
        calls: Arc<AtomicUsize>,
    }

    impl StubService {
        fn new(reply: Reply) -> (Self, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            (Self { reply, calls: calls.clone() }, calls)
        }
    }

    impl OrganizerService for StubService {
        fn organize<'a>(&'a self, _text: &'a str) -> BoxFuture<'a, Result<String, OrganizeError>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let result = match self.reply {
                Reply::Text(text) => Ok(text.to_string()),
                Reply::Fail => Err(OrganizeError::Api {
                    status: 503,
                    message: "overloaded".into(),
                }),
            };
            Box::pin(async move { result })
        }
    }

    fn texts(items: &[Item]) -> Vec<&str> {
        items.iter().map(|i| i.text.as_str()).collect()
    }

    fn categories(items: &[Item]) -> Vec<&str> {
        items.iter().map(|i| i.category.as_deref().unwrap_or("")).collect()
    }

    #[tokio::test]
    async fn local_mode_splits_lines() {
        let items = TextOrganizer::local().organize("buy milk\n\nwalk dog").await.unwrap();
        assert_eq!(texts(&items), vec!["buy milk", "walk dog"]);
        assert_eq!(categories(&items), vec!["General", "General"]);
        assert_ne!(items[0].id, items[1].id);
    }

    #[tokio::test]
    async fn local_mode_trims_and_keeps_bullets() {
        let items = TextOrganizer::local().organize("  - call mom  \r\n\t\n").await.unwrap();
        assert_eq!(texts(&items), vec!["- call mom"]);
    }

    #[tokio::test]
    async fn delegated_structured_response() {
        let (service, calls) = StubService::new(Reply::Text(
            r#"```json
[{"text": "Email Sam", "category": "Work"}, {"text": "Water plants"}, {"text": "  "}]
```"#,
        ));
        let items = TextOrganizer::delegated(service).organize("stuff").await.unwrap();
        assert_eq!(texts(&items), vec!["Email Sam", "Water plants"]);
        assert_eq!(categories(&items), vec!["Work", "General"]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn delegated_unstructured_response_uses_lines() {
        let (service, _) = StubService::new(Reply::Text("Here you go:\n- one\n* two\n• three\n\n"));
        let items = TextOrganizer::delegated(service).organize("stuff").await.unwrap();
        assert_eq!(texts(&items), vec!["Here you go:", "one", "two", "three"]);
        assert!(categories(&items).iter().all(|c| *c == "General"));
    }

    #[tokio::test]
    async fn delegated_failure_falls_back_to_input_lines() {
        let (service, calls) = StubService::new(Reply::Fail);
        let items = TextOrganizer::delegated(service).organize("a\nb").await.unwrap();
        assert_eq!(texts(&items), vec!["a", "b"]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn delegated_empty_response_is_an_error() {
        let (service, _) = StubService::new(Reply::Text("  \n "));
        let err = TextOrganizer::delegated(service).organize("a").await.unwrap_err();
        assert!(matches!(err, OrganizeError::NoContent));
    }

    #[tokio::test]
    async fn delegated_empty_list_is_an_empty_answer() {
        let (service, _) = StubService::new(Reply::Text("```json\n[]\n```"));
        let items = TextOrganizer::delegated(service).organize("nothing to do").await.unwrap();
        assert!(items.is_empty());
    }

    #[test]
    fn mode_follows_constructor() {
        let (service, _) = StubService::new(Reply::Fail);
        assert_eq!(TextOrganizer::local().mode(), OrganizeMode::Local);
        assert_eq!(TextOrganizer::delegated(service).mode(), OrganizeMode::Delegated);
    }

    #[tokio::test]
    async fn blank_input_skips_the_service() {
        let (service, calls) = StubService::new(Reply::Fail);
        let items = TextOrganizer::delegated(service).organize(" \n ").await.unwrap();
        assert!(items.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn structured_parse_rejects_other_shapes() {
        assert!(parse_structured(r#"{"text": "x"}"#).is_none());
        assert!(parse_structured("not json").is_none());
        assert_eq!(parse_structured(r#"[{"text": " "}]"#), Some(Vec::new()));
    }
}
