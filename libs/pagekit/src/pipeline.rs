//! Aggregation pipeline assembly from predefined, endpoint-owned stages.
//!
//! Clients never submit pipeline stages; they submit keys. Each key names a
//! pipeline the endpoint configured up front, and the requested pipelines
//! concatenate in request order. A non-empty filtered query folds in as a
//! leading `$match` stage instead of remaining a standalone filter.

use std::collections::HashMap;

use serde_json::{Map, Value, json};

use crate::Error;
use crate::query::ParamValue;

/// Normalize the raw `aggregate` parameter into an ordered key list.
///
/// A sequence is taken as-is; a scalar splits on `","` without trimming, so
/// stray empty segments stay in the list and fail lookup later. The empty
/// scalar yields an empty list: the parameter was sent, no keys were named.
pub(crate) fn requested_keys(value: &ParamValue) -> Vec<String> {
    match value {
        ParamValue::Many(keys) => keys.clone(),
        ParamValue::One(raw) if raw.is_empty() => Vec::new(),
        ParamValue::One(raw) => raw.split(',').map(ToOwned::to_owned).collect(),
    }
}

/// Concatenate the requested pipelines and fold in the filtered query.
///
/// The first key without a configured pipeline fails the whole assembly; no
/// partial output. Taking `query` by value keeps it out of the final record
/// whenever assembly runs, matched or not.
///
/// # Errors
/// Returns `Error::UnknownAggregate` naming the first unconfigured key.
pub(crate) fn assemble(
    keys: &[String],
    configured: &HashMap<String, Vec<Value>>,
    query: Option<Map<String, Value>>,
) -> Result<Vec<Value>, Error> {
    let mut stages = Vec::new();
    for key in keys {
        match configured.get(key) {
            Some(pipeline) => stages.extend(pipeline.iter().cloned()),
            None => return Err(Error::UnknownAggregate(key.clone())),
        }
    }
    if let Some(filtered) = query {
        if !filtered.is_empty() {
            stages.insert(0, json!({ "$match": filtered }));
        }
    }
    Ok(stages)
}
