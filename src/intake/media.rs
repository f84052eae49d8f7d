//! Media entry normalization.
//!
//! Clients send media either as bare URL strings or as objects carrying a
//! URL plus an optional media type. Anything else is dropped.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::logging::structured::LogContext;
use crate::storage::{MediaItem, MediaKind};

const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "avi", "mkv", "webm", "3gp"];

/// Guess the kind from a URL's file extension.
fn kind_from_url(url: &str) -> MediaKind {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let ext = path
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
        MediaKind::Video
    } else {
        MediaKind::Image
    }
}

fn non_empty(value: Option<&Value>) -> Option<&str> {
    value
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn normalize_entry(entry: &Value, now: DateTime<Utc>) -> Option<MediaItem> {
    match entry {
        Value::String(url) => {
            let url = url.trim();
            if url.is_empty() {
                return None;
            }
            Some(MediaItem {
                url: url.to_string(),
                kind: kind_from_url(url),
                uploaded_at: now,
            })
        }
        Value::Object(map) => {
            // Older clients put the URL under "type".
            let url = non_empty(map.get("url")).or_else(|| non_empty(map.get("type")))?;
            let kind = non_empty(map.get("mediaType"))
                .or_else(|| non_empty(map.get("kind")))
                .and_then(|raw| MediaKind::parse(&raw.to_ascii_uppercase()))
                .unwrap_or_else(|| kind_from_url(url));
            Some(MediaItem {
                url: url.to_string(),
                kind,
                uploaded_at: now,
            })
        }
        _ => None,
    }
}

/// Normalize raw media entries, silently dropping the unparseable ones.
pub fn normalize_media(entries: &[Value], ctx: &LogContext) -> Vec<MediaItem> {
    let now = Utc::now();
    let items: Vec<MediaItem> = entries
        .iter()
        .filter_map(|entry| normalize_entry(entry, now))
        .collect();

    let dropped = entries.len() - items.len();
    if dropped > 0 {
        log::debug!(
            "{} MEDIA_DROPPED received={} dropped={}",
            ctx,
            entries.len(),
            dropped
        );
    }
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx() -> LogContext {
        LogContext::new("test-req")
    }

    #[test]
    fn test_bare_urls() {
        let items = normalize_media(
            &[json!("https://cdn.example.org/a.jpg"), json!("https://cdn.example.org/b.MP4?x=1")],
            &ctx(),
        );
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].kind, MediaKind::Image);
        assert_eq!(items[1].kind, MediaKind::Video);
    }

    #[test]
    fn test_object_entries() {
        let items = normalize_media(
            &[
                json!({"url": "https://cdn.example.org/c.bin", "mediaType": "video"}),
                json!({"type": "https://cdn.example.org/d.png"}),
            ],
            &ctx(),
        );
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].kind, MediaKind::Video);
        assert_eq!(items[1].url, "https://cdn.example.org/d.png");
        assert_eq!(items[1].kind, MediaKind::Image);
    }

    #[test]
    fn test_unparseable_dropped() {
        let items = normalize_media(
            &[json!(42), json!(null), json!(""), json!({"mediaType": "IMAGE"}), json!(["x"])],
            &ctx(),
        );
        assert!(items.is_empty());
    }
}
