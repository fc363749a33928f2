#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Translation of decoded HTTP query parameters into a normalized set of
//! pagination options for a document-store query layer.
//!
//! The entry point is [`OptionsBuilder`]: configure it once per endpoint
//! (allowed filter fields, predefined aggregation pipelines, endpoint mode)
//! and call [`OptionsBuilder::build`] with the request's [`QueryMap`]. The
//! result is a [`PageOptions`] record whose fields are set only for the
//! parameters the request actually carried.
//!
//! Building is pure and synchronous; a configured builder is immutable and
//! safe to share across concurrent requests.

pub mod builder;
pub mod limits;
pub mod query;

mod filter;
mod pipeline;

pub use builder::OptionsBuilder;
pub use limits::Limits;
pub use query::{ParamValue, QueryMap};

use serde::{Serialize, Serializer};

/// Unified error type for options building.
///
/// Building is permissive: absent or partial parameters never fail, they are
/// simply left out of the result. The two failure modes are a `query`
/// parameter that does not parse into a structured document and a request
/// for an aggregation pipeline the endpoint never configured.
#[derive(thiserror::Error, Debug, Clone)]
pub enum Error {
    #[error("invalid query document: {0}")]
    InvalidQuery(String),

    #[error("unknown aggregate key: {0}")]
    UnknownAggregate(String),
}

/// Endpoint shape: a `list` endpoint carries paging parameters, a `single`
/// endpoint ignores them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Mode {
    #[serde(rename = "single")]
    Single,
    #[default]
    #[serde(rename = "list")]
    List,
}

/// Integer query parameter parsed with decimal-prefix semantics.
///
/// Leading whitespace and an optional sign are consumed, then digits up to
/// the first non-digit; anything after is ignored. No digits at all yields
/// [`IntParam::NaN`], which serializes as JSON `null` and is left for the
/// storage layer to reject.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IntParam {
    Int(i64),
    NaN,
}

impl IntParam {
    /// Parse the decimal prefix of `raw`. Out-of-range magnitudes saturate
    /// at the `i64` bounds.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let rest = raw.trim_start();
        let (negative, rest) = match rest.as_bytes().first() {
            Some(b'-') => (true, &rest[1..]),
            Some(b'+') => (false, &rest[1..]),
            _ => (false, rest),
        };
        let digits = rest
            .bytes()
            .take_while(u8::is_ascii_digit)
            .count();
        if digits == 0 {
            return IntParam::NaN;
        }
        let mut value: i64 = 0;
        for byte in rest.as_bytes()[..digits].iter().copied() {
            let digit = i64::from(byte - b'0');
            value = match value.checked_mul(10).and_then(|v| v.checked_add(digit)) {
                Some(v) => v,
                None => return IntParam::Int(if negative { i64::MIN } else { i64::MAX }),
            };
        }
        IntParam::Int(if negative { -value } else { value })
    }

    #[must_use]
    pub fn as_i64(self) -> Option<i64> {
        match self {
            IntParam::Int(n) => Some(n),
            IntParam::NaN => None,
        }
    }

    #[must_use]
    pub fn is_nan(self) -> bool {
        matches!(self, IntParam::NaN)
    }
}

impl Serialize for IntParam {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            IntParam::Int(n) => serializer.serialize_i64(*n),
            IntParam::NaN => serializer.serialize_none(),
        }
    }
}

/// Normalized pagination options for one request.
///
/// Every field is optional; a field is set only when its query parameter was
/// provided. Serialization keeps that shape: unset fields are omitted and
/// cursor fields use the consuming engine's names (`startingAfter`,
/// `endingBefore`). `query` and `aggregate` never coexist: when aggregation
/// is assembled, the filtered query folds into the pipeline instead.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
#[must_use]
pub struct PageOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub select: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub populate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projection: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lean: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<IntParam>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<IntParam>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub starting_after: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ending_before: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<serde_json::Map<String, serde_json::Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregate: Option<Vec<serde_json::Value>>,
}

impl PageOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn has_query(&self) -> bool {
        self.query.is_some()
    }

    #[must_use]
    pub fn has_aggregate(&self) -> bool {
        self.aggregate.is_some()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn int_param_parses_decimal_prefix() {
        assert_eq!(IntParam::parse("25"), IntParam::Int(25));
        assert_eq!(IntParam::parse("  42"), IntParam::Int(42));
        assert_eq!(IntParam::parse("-5"), IntParam::Int(-5));
        assert_eq!(IntParam::parse("+8"), IntParam::Int(8));
        assert_eq!(IntParam::parse("12abc"), IntParam::Int(12));
        assert_eq!(IntParam::parse("5.9"), IntParam::Int(5));
    }

    #[test]
    fn int_param_without_digits_is_nan() {
        assert_eq!(IntParam::parse(""), IntParam::NaN);
        assert_eq!(IntParam::parse("abc"), IntParam::NaN);
        assert_eq!(IntParam::parse("-"), IntParam::NaN);
        assert_eq!(IntParam::parse(" .5"), IntParam::NaN);
        assert!(IntParam::parse("x12").is_nan());
    }

    #[test]
    fn int_param_saturates_on_overflow() {
        assert_eq!(
            IntParam::parse("99999999999999999999999"),
            IntParam::Int(i64::MAX)
        );
        assert_eq!(
            IntParam::parse("-99999999999999999999999"),
            IntParam::Int(i64::MIN)
        );
    }

    #[test]
    fn int_param_nan_serializes_as_null() {
        assert_eq!(serde_json::to_value(IntParam::NaN).unwrap(), json!(null));
        assert_eq!(serde_json::to_value(IntParam::Int(7)).unwrap(), json!(7));
    }

    #[test]
    fn unset_fields_are_omitted_from_serialization() {
        let options = PageOptions {
            limit: Some(IntParam::Int(10)),
            ..PageOptions::default()
        };
        assert_eq!(serde_json::to_value(&options).unwrap(), json!({"limit": 10}));
    }

    #[test]
    fn cursor_fields_serialize_in_camel_case() {
        let options = PageOptions {
            starting_after: Some("abc".to_owned()),
            ending_before: Some("def".to_owned()),
            ..PageOptions::default()
        };
        assert_eq!(
            serde_json::to_value(&options).unwrap(),
            json!({"startingAfter": "abc", "endingBefore": "def"})
        );
    }

    #[test]
    fn mode_defaults_to_list() {
        assert_eq!(Mode::default(), Mode::List);
    }

    #[test]
    fn error_messages_name_the_fault() {
        let err = Error::UnknownAggregate("nope".to_owned());
        assert_eq!(err.to_string(), "unknown aggregate key: nope");
        let err = Error::InvalidQuery("not valid JSON".to_owned());
        assert!(err.to_string().starts_with("invalid query document"));
    }
}
