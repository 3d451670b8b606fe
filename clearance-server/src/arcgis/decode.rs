//! Response decoding with field-aware coercion.
//!
//! Decoding is the first half of a two-phase pipeline: raw text becomes a
//! generic [`serde_json::Value`], error envelopes are rejected, and fields
//! whose names imply a type are rewritten into a canonical form. Typed
//! projection happens afterwards in [`super::convert`].
//!
//! Two coercions are applied by the standard rules:
//! - fields ending in `Date` hold either epoch milliseconds or an ISO 8601
//!   string and are rewritten to an RFC 3339 UTC timestamp
//! - a `Document` field holding a number is a document OID and is rewritten
//!   to the absolute URL of its image

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde_json::Value;
use url::Url;

use super::envelope::classify;
use super::error::FeatureServiceError;

/// How much of an undecodable body to keep for diagnostics.
const BODY_EXCERPT_CHARS: usize = 500;

/// Which field names a coercion applies to.
#[derive(Debug, Clone)]
pub enum FieldPattern {
    /// Name ends with the given suffix (case-sensitive).
    Suffix(String),
    /// Name equals the given string.
    Exact { name: String, case_insensitive: bool },
}

impl FieldPattern {
    pub fn matches(&self, key: &str) -> bool {
        match self {
            FieldPattern::Suffix(suffix) => key.ends_with(suffix.as_str()),
            FieldPattern::Exact {
                name,
                case_insensitive: true,
            } => key.eq_ignore_ascii_case(name),
            FieldPattern::Exact {
                name,
                case_insensitive: false,
            } => key == name,
        }
    }
}

/// What to do with a matching field.
#[derive(Debug, Clone)]
pub enum Coercion {
    /// Rewrite to an RFC 3339 UTC timestamp.
    Timestamp,
    /// Rewrite a numeric ID to `{base}/{id}`.
    DocumentUrl(Url),
}

/// Ordered field-name rules. The first matching rule wins.
#[derive(Debug, Clone, Default)]
pub struct CoercionRules {
    rules: Vec<(FieldPattern, Coercion)>,
}

impl CoercionRules {
    /// No coercion at all.
    pub fn none() -> Self {
        Self::default()
    }

    /// Date and document rules, resolving documents against `image_base`.
    pub fn standard(image_base: Url) -> Self {
        Self::none()
            .with_rule(FieldPattern::Suffix("Date".into()), Coercion::Timestamp)
            .with_rule(
                FieldPattern::Exact {
                    name: "RecordCreateData".into(),
                    case_insensitive: false,
                },
                Coercion::Timestamp,
            )
            .with_rule(
                FieldPattern::Exact {
                    name: "Document".into(),
                    case_insensitive: true,
                },
                Coercion::DocumentUrl(image_base),
            )
    }

    pub fn with_rule(mut self, pattern: FieldPattern, coercion: Coercion) -> Self {
        self.rules.push((pattern, coercion));
        self
    }

    fn find(&self, key: &str) -> Option<&Coercion> {
        self.rules
            .iter()
            .find(|(pattern, _)| pattern.matches(key))
            .map(|(_, coercion)| coercion)
    }
}

/// Join path segments onto a root URL with single slashes.
///
/// Empty segments and duplicate slashes are dropped, and a trailing slash on
/// the root is tolerated.
///
/// # Examples
///
/// ```
/// use clearance_server::arcgis::combine_url;
/// use url::Url;
///
/// let root = Url::parse("https://example.com/arcgis/rest/services/Bridge/MapServer/").unwrap();
/// let url = combine_url(&root, &["exts/BridgeVC//image", "1234"]).unwrap();
/// assert_eq!(
///     url.as_str(),
///     "https://example.com/arcgis/rest/services/Bridge/MapServer/exts/BridgeVC/image/1234"
/// );
/// ```
pub fn combine_url(root: &Url, parts: &[&str]) -> Result<Url, url::ParseError> {
    let mut base = root.clone();
    base.set_query(None);
    base.set_fragment(None);

    let tail = parts
        .iter()
        .flat_map(|p| p.split('/'))
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("/");

    Url::parse(&format!("{}/{}", base.as_str().trim_end_matches('/'), tail))
}

/// Parse a timestamp the way the feature service writes them.
///
/// Accepts RFC 3339, naive ISO datetimes (taken as UTC), bare dates (UTC
/// midnight) and integer epoch milliseconds.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|n| n.and_utc());
    }

    s.parse::<i64>().ok().and_then(DateTime::from_timestamp_millis)
}

/// Canonical text form for a coerced timestamp.
pub fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Decode a response body.
///
/// `url` is only used to label errors.
pub fn decode(url: &str, body: &str, rules: &CoercionRules) -> Result<Value, FeatureServiceError> {
    let mut value: Value = serde_json::from_str(body).map_err(|e| FeatureServiceError::Decode {
        url: url.to_string(),
        message: e.to_string(),
        body: body.chars().take(BODY_EXCERPT_CHARS).collect(),
    })?;

    classify(url, &value)?;

    coerce(&mut value, rules).map_err(|(field, message)| FeatureServiceError::Field {
        url: url.to_string(),
        field,
        message,
    })?;

    Ok(value)
}

type FieldFailure = (String, String);

fn coerce(value: &mut Value, rules: &CoercionRules) -> Result<(), FieldFailure> {
    match value {
        Value::Object(map) => {
            for (key, v) in map.iter_mut() {
                match rules.find(key) {
                    Some(coercion) => apply(key, coercion, v, rules)?,
                    None => coerce(v, rules)?,
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                coerce(item, rules)?;
            }
        }
        _ => {}
    }
    Ok(())
}

fn apply(
    key: &str,
    coercion: &Coercion,
    value: &mut Value,
    rules: &CoercionRules,
) -> Result<(), FieldFailure> {
    let fail = |message: String| (key.to_string(), message);

    match coercion {
        Coercion::Timestamp => {
            let dt = match value {
                Value::Null => return Ok(()),
                Value::String(s) => {
                    parse_timestamp(s).ok_or_else(|| fail(format!("{s:?} is not a date")))?
                }
                Value::Number(n) => n
                    .as_i64()
                    .or_else(|| n.as_f64().map(|f| f as i64))
                    .and_then(DateTime::from_timestamp_millis)
                    .ok_or_else(|| fail(format!("{n} is out of range for epoch milliseconds")))?,
                other => {
                    return Err(fail(format!(
                        "expected a date string or epoch milliseconds, found {}",
                        json_type(other)
                    )));
                }
            };
            *value = Value::String(format_timestamp(&dt));
        }
        Coercion::DocumentUrl(base) => match value {
            Value::Number(n) => {
                let id = n
                    .as_u64()
                    .ok_or_else(|| fail(format!("document id {n} is not a non-negative integer")))?;
                let url = combine_url(base, &[&id.to_string()])
                    .map_err(|e| fail(format!("cannot build document URL: {e}")))?;
                *value = Value::String(url.into());
            }
            Value::Object(_) | Value::Array(_) => coerce(value, rules)?,
            _ => {}
        },
    }
    Ok(())
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
