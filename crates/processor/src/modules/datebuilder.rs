//! Date construction from relative expressions and fixed formats
//!
//! An expression is lower-cased, then tried in order as:
//! 1. an offset: `"<n> day(s)"` or `"<n> year(s)"` from the run clock
//! 2. a keyword: `today`, `tomorrow`, `yesterday`, `now`
//! 3. each of [`FALLBACK_FORMATS`]
//!
//! Anything else is a [`TransformationError::UnrecognizedDate`].

use crate::conf::ResolvedConfiguration;
use crate::context::Context;
use crate::error::{ConfigurationError, TransformationError, TransformationResult};
use crate::pipe::{ItemParser, ParserOutput, PipeDescriptor, PipeOptions, SourceMode};
use chrono::{DateTime, Datelike, Days, Months, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use feedpipe_types::value::type_name;
use feedpipe_types::Record;
use serde_json::Value;

static DESCRIPTOR: PipeDescriptor = PipeDescriptor::new(
    "datebuilder",
    PipeOptions::new()
        .assign("date")
        .source_mode(SourceMode::Forever)
        .required(&["date"]),
);

/// Keywords and their day offsets from the run clock
const KEYWORDS: [(&str, i64); 4] = [("today", 0), ("tomorrow", 1), ("yesterday", -1), ("now", 0)];

/// Formats tried, in order, when an expression is neither an offset nor a
/// keyword. The flag marks formats carrying a time of day; the rest resolve
/// to midnight UTC.
pub const FALLBACK_FORMATS: [(&str, bool); 13] = [
    ("%Y-%m-%dt%H:%M:%Sz", true),
    ("%Y-%m-%dt%H:%M:%S", true),
    ("%Y-%m-%d %H:%M:%S", true),
    ("%Y-%m-%d", false),
    ("%m/%d/%Y", false),
    ("%m-%d-%Y", false),
    ("%m/%d/%y", false),
    ("%m-%d-%y", false),
    ("%Y%m%d", false),
    ("%d %B %Y", false),
    ("%B %d, %Y", false),
    ("%d %b %Y", false),
    ("%b %d, %Y", false),
];

/// Builds a date from the expression under `date` and assigns it, as an
/// RFC 3339 UTC string, to the item's `date` field.
///
/// Run without input it yields a date forever.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateBuilder;

impl ItemParser for DateBuilder {
    fn descriptor(&self) -> &PipeDescriptor {
        &DESCRIPTOR
    }

    fn parse(
        &self,
        _item: &Record,
        conf: &ResolvedConfiguration,
        ctx: &Context,
    ) -> TransformationResult<ParserOutput> {
        let expression = date_expression(conf)?;
        let date = build_date(&expression, ctx.now())?;
        Ok(ParserOutput::Value(Value::String(
            date.to_rfc3339_opts(SecondsFormat::Secs, true),
        )))
    }
}

fn date_expression(conf: &ResolvedConfiguration) -> TransformationResult<String> {
    match conf.require("date")? {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(ConfigurationError::InvalidType {
            field: "date".to_string(),
            expected: "string",
            actual: type_name(other).to_string(),
        }
        .into()),
    }
}

/// Resolve a date expression relative to `now`
pub fn build_date(expression: &str, now: DateTime<Utc>) -> TransformationResult<DateTime<Utc>> {
    let lowered = expression.trim().to_lowercase();

    if let Some(count) = offset(&lowered, "day") {
        return shift_days(now, count?, expression);
    }
    if let Some(count) = offset(&lowered, "year") {
        return shift_years(now, count?, expression);
    }
    if let Some((_, days)) = KEYWORDS.iter().find(|(word, _)| *word == lowered) {
        return shift_days(now, *days, expression);
    }

    parse_fallback(&lowered).ok_or_else(|| unrecognized(expression))
}

/// Leading count of an `"<n> <unit>"` or `"<n> <unit>s"` expression.
///
/// `None` when the suffix does not match; `Some(Err)` when it does but the
/// count is not an integer.
fn offset(lowered: &str, unit: &str) -> Option<TransformationResult<i64>> {
    let plural = format!(" {}s", unit);
    let singular = format!(" {}", unit);
    let head = lowered
        .strip_suffix(&plural)
        .or_else(|| lowered.strip_suffix(&singular))?;

    let count = head.split(' ').next().unwrap_or_default();
    Some(count.parse::<i64>().map_err(|_| unrecognized(lowered)))
}

fn shift_days(
    now: DateTime<Utc>,
    count: i64,
    expression: &str,
) -> TransformationResult<DateTime<Utc>> {
    let days = Days::new(count.unsigned_abs());
    let shifted = if count >= 0 {
        now.checked_add_days(days)
    } else {
        now.checked_sub_days(days)
    };
    shifted.ok_or_else(|| out_of_range(expression))
}

/// Calendar year offset: Feb 29 plus one year lands on Feb 28
fn shift_years(
    now: DateTime<Utc>,
    count: i64,
    expression: &str,
) -> TransformationResult<DateTime<Utc>> {
    let months = count
        .unsigned_abs()
        .checked_mul(12)
        .and_then(|m| u32::try_from(m).ok())
        .ok_or_else(|| out_of_range(expression))?;

    let shifted = if count >= 0 {
        now.checked_add_months(Months::new(months))
    } else {
        now.checked_sub_months(Months::new(months))
    };
    shifted.ok_or_else(|| out_of_range(expression))
}

fn parse_fallback(lowered: &str) -> Option<DateTime<Utc>> {
    FALLBACK_FORMATS.iter().find_map(|(format, has_time)| {
        let naive = if *has_time {
            NaiveDateTime::parse_from_str(lowered, format).ok()?
        } else {
            NaiveDate::parse_from_str(lowered, format).ok()?.and_hms_opt(0, 0, 0)?
        };
        // %Y only accepts four-digit years, so "03/01/24" falls through to %y
        if format.contains("%Y") && naive.year() < 1000 {
            return None;
        }
        Some(naive.and_utc())
    })
}

fn unrecognized(expression: &str) -> TransformationError {
    TransformationError::UnrecognizedDate {
        expression: expression.to_string(),
    }
}

fn out_of_range(expression: &str) -> TransformationError {
    TransformationError::InvalidValue {
        field: "date".to_string(),
        reason: format!("'{}' is out of the representable date range", expression),
    }
}
