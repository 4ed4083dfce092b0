//! RSS item construction
//!
//! Builds one RSS-shaped record from configuration. Each configured value is
//! looked up as a path into the current item, falling back to the value
//! itself, and stored under the field's RSS name:
//!
//! | Configuration key | Output field |
//! |---|---|
//! | `title` | `y:title` |
//! | `guid` | `y:id` |
//! | `mediaThumbURL` | `media:thumbnail.url` |
//! | `mediaThumbHeight` | `media:thumbnail.height` |
//! | `mediaThumbWidth` | `media:thumbnail.width` |
//! | `mediaContentType` | `media:content.type` |
//! | `mediaContentURL` | `media:content.url` |
//! | `mediaContentHeight` | `media:content.height` |
//! | `mediaContentWidth` | `media:content.width` |
//!
//! Other keys (`description`, `author`, `link`, `pubDate`, ...) keep their
//! name. `pubDate` defaults to the run clock. Entries resolving to `null`
//! are left out.

use crate::conf::{RawConfiguration, ResolvedConfiguration};
use crate::context::Context;
use crate::error::TransformationResult;
use crate::pipe::{ItemParser, ParserOutput, PipeDescriptor, PipeOptions};
use chrono::SecondsFormat;
use feedpipe_types::Record;
static DESCRIPTOR: PipeDescriptor =
    PipeDescriptor::new("rssitembuilder", PipeOptions::new().emit(true));

/// Configuration keys with a qualified RSS name
pub const RSS_FIELDS: [(&str, &str); 9] = [
    ("title", "y:title"),
    ("guid", "y:id"),
    ("mediaThumbURL", "media:thumbnail.url"),
    ("mediaThumbHeight", "media:thumbnail.height"),
    ("mediaThumbWidth", "media:thumbnail.width"),
    ("mediaContentType", "media:content.type"),
    ("mediaContentURL", "media:content.url"),
    ("mediaContentHeight", "media:content.height"),
    ("mediaContentWidth", "media:content.width"),
];

/// Output field for a configuration key
pub fn rss_name(key: &str) -> &str {
    RSS_FIELDS
        .iter()
        .find(|(from, _)| *from == key)
        .map(|(_, to)| *to)
        .unwrap_or(key)
}

/// Builds RSS items. Emits the built record in place of the input item; run
/// without input it yields a single item.
///
/// # Examples
///
/// ```
/// use feedpipe_processor::modules;
/// use feedpipe_processor::Context;
/// use feedpipe_types::json;
///
/// let pipe = modules::build(
///     "rssitembuilder",
///     json!({"title": "Hi", "guid": "a1", "mediaThumbURL": "image.png"}),
/// )
/// .unwrap();
///
/// let ctx = Context::new();
/// let item = pipe.run_source(&ctx).unwrap().next().unwrap().unwrap();
/// assert_eq!(item.get_path("media:thumbnail.url"), Some(&json!("image.png")));
/// assert_eq!(item.get("y:id"), Some(&json!("a1")));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct RssItemBuilder;

impl ItemParser for RssItemBuilder {
    fn descriptor(&self) -> &PipeDescriptor {
        &DESCRIPTOR
    }

    fn defaults(&self, ctx: &Context) -> RawConfiguration {
        let pub_date = ctx.now().to_rfc3339_opts(SecondsFormat::Secs, true);
        RawConfiguration::new().literal("pubDate", pub_date)
    }

    fn parse(
        &self,
        item: &Record,
        conf: &ResolvedConfiguration,
        _ctx: &Context,
    ) -> TransformationResult<ParserOutput> {
        let built = Record::from_assignments(
            conf.iter()
                .filter(|(_, value)| !value.is_null())
                .map(|(key, value)| (rss_name(key), item.get_or_literal(value))),
        );
        Ok(ParserOutput::Record(built))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::pipe::{PassIf, Pipe};
    use chrono::TimeZone;
    use serde_json::{json, Value};

    fn is_rfc3339(value: &Value) -> bool {
        value
            .as_str()
            .map(|s| chrono::DateTime::parse_from_rfc3339(s).is_ok())
            .unwrap_or(false)
    }

    fn builder(conf: Value) -> Pipe {
        Pipe::item(RssItemBuilder).with_json_conf(conf).unwrap()
    }

    #[test]
    fn test_remaps_from_item_fields() {
        let ctx = Context::new();
        let pipe = builder(json!({"guid": "id", "mediaThumbURL": "thumbnail"}));
        let input =
            vec![Record::from_value(json!({"id": "a1", "thumbnail": "image.png"})).unwrap()];

        let out: Vec<Record> = pipe.run(input, &ctx).unwrap().collect::<Result<_>>().unwrap();
        assert_eq!(out.len(), 1);

        let item = &out[0];
        assert_eq!(item.get("y:id"), Some(&json!("a1")));
        assert_eq!(item.get("media:thumbnail"), Some(&json!({"url": "image.png"})));
        assert!(is_rfc3339(item.get("pubDate").unwrap()));
        assert_eq!(item.len(), 3);
    }

    #[test]
    fn test_source_with_literals() {
        let now = chrono::Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let ctx = Context::new().with_now(now);
        let pipe = builder(json!({"title": "Hi", "description": "text", "mediaContentWidth": 640}));

        let out: Vec<Record> = pipe.run_source(&ctx).unwrap().collect::<Result<_>>().unwrap();
        assert_eq!(
            out,
            vec![Record::from_value(json!({
                "y:title": "Hi",
                "description": "text",
                "media:content": {"width": 640},
                "pubDate": "2024-01-02T03:04:05Z"
            }))
            .unwrap()]
        );
    }

    #[test]
    fn test_configured_pub_date_wins() {
        let ctx = Context::new();
        let pipe = builder(json!({"pubDate": "yesterday-ish"}));
        let item = pipe.run_source(&ctx).unwrap().next().unwrap().unwrap();
        assert_eq!(item.get("pubDate"), Some(&json!("yesterday-ish")));
    }

    #[test]
    fn test_skip_passes_item_verbatim() {
        let ctx = Context::new();
        let pipe = builder(json!({"title": "t"})).with_pass_if(PassIf::field("ready"));
        let shaped = Record::from_value(json!({"y:title": "done", "ready": true})).unwrap();

        let out: Vec<Record> = pipe
            .run(vec![shaped.clone()], &ctx)
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(out, vec![shaped]);
    }

    #[test]
    fn test_rss_name_table() {
        assert_eq!(rss_name("mediaContentURL"), "media:content.url");
        assert_eq!(rss_name("author"), "author");
    }
}
