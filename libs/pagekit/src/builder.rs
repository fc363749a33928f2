//! Per-endpoint options configuration and the build step tying the
//! translation together.

use std::collections::HashMap;

use serde_json::Value;

use crate::query::{ParamValue, QueryMap};
use crate::{Error, IntParam, Limits, Mode, PageOptions, filter, pipeline};

/// Per-endpoint configuration for translating query parameters into
/// [`PageOptions`].
///
/// Configure once per endpoint and reuse: [`build`](Self::build) borrows the
/// configuration, so one builder serves any number of concurrent requests.
#[derive(Clone, Debug, Default)]
#[must_use]
pub struct OptionsBuilder {
    mode: Mode,
    allowed_fields: Vec<String>,
    aggregates: HashMap<String, Vec<Value>>,
    limits: Limits,
}

impl OptionsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the endpoint mode. `list` endpoints carry paging parameters,
    /// `single` endpoints ignore them.
    pub fn mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Allow one field (a dot-path prefix) in client query documents.
    pub fn allow_field(mut self, field: impl Into<String>) -> Self {
        self.allowed_fields.push(field.into());
        self
    }

    /// Allow several fields at once.
    pub fn allow_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_fields.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Register a predefined aggregation pipeline under `key`.
    pub fn aggregate(mut self, key: impl Into<String>, stages: Vec<Value>) -> Self {
        self.aggregates.insert(key.into(), stages);
        self
    }

    /// Register several predefined pipelines at once.
    pub fn aggregates<I, K>(mut self, pipelines: I) -> Self
    where
        I: IntoIterator<Item = (K, Vec<Value>)>,
        K: Into<String>,
    {
        self.aggregates
            .extend(pipelines.into_iter().map(|(key, stages)| (key.into(), stages)));
        self
    }

    /// Override the input safety limits.
    pub fn limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Translate one request's query parameters into [`PageOptions`].
    ///
    /// Absent parameters stay absent in the result. The `query` document is
    /// filtered to the allowed fields; requested aggregation pipelines are
    /// concatenated in request order, folding a non-empty filtered query in
    /// as a leading `$match` stage.
    ///
    /// # Errors
    /// Returns [`Error::InvalidQuery`] when the `query` parameter does not
    /// parse into a JSON object or exceeds a configured limit, and
    /// [`Error::UnknownAggregate`] when an aggregation key has no
    /// configured pipeline.
    ///
    /// ```
    /// use pagekit::{IntParam, OptionsBuilder, QueryMap};
    /// use serde_json::json;
    ///
    /// let tickets = OptionsBuilder::new()
    ///     .allow_field("status")
    ///     .aggregate("byStatus", vec![json!({"$group": {"_id": "$status"}})]);
    ///
    /// let input = QueryMap::from_pairs([
    ///     ("limit", "25"),
    ///     ("query", r#"{"status":"open","secret":"x"}"#),
    /// ]);
    ///
    /// let options = tickets.build(&input).unwrap();
    /// assert_eq!(options.limit, Some(IntParam::Int(25)));
    /// assert_eq!(
    ///     serde_json::to_value(options.query).unwrap(),
    ///     json!({"status": "open"})
    /// );
    /// ```
    pub fn build(&self, input: &QueryMap) -> Result<PageOptions, Error> {
        let mut options = PageOptions::new();

        if let Some(select) = input.provided("select") {
            options.select = Some(select.text());
        }
        if let Some(populate) = input.provided("populate") {
            options.populate = Some(match populate {
                ParamValue::Many(parts) => parts.join(" "),
                ParamValue::One(raw) => raw.split(',').collect::<Vec<_>>().join(" "),
            });
        }
        if let Some(projection) = input.provided("projection") {
            options.projection = Some(projection.text());
        }
        if let Some(lean) = input.provided("lean") {
            options.lean = Some(matches!(lean, ParamValue::One(raw) if raw == "true"));
        }
        if let Some(key) = input.provided("key") {
            options.key = Some(key.text());
        }

        if self.mode == Mode::List {
            if let Some(page) = input.provided("page") {
                options.page = Some(IntParam::parse(&page.text()));
            }
            if let Some(limit) = input.provided("limit") {
                options.limit = Some(IntParam::parse(&limit.text()));
            }
            if let Some(sort) = input.provided("sort") {
                options.sort = Some(sort.text());
            }
            if let Some(starting_after) = input.provided("startingAfter") {
                options.starting_after = Some(starting_after.text());
            }
            if let Some(ending_before) = input.provided("endingBefore") {
                options.ending_before = Some(ending_before.text());
            }
        }

        if !self.allowed_fields.is_empty() {
            if let Some(query) = input.provided("query") {
                let raw = query.text();
                self.limits.validate_query_bytes(&raw)?;
                options.query =
                    Some(filter::filter_document(&raw, &self.allowed_fields, &self.limits)?);
            }
        }

        if !self.aggregates.is_empty() {
            if let Some(aggregate) = input.get("aggregate") {
                let keys = pipeline::requested_keys(aggregate);
                self.limits.validate_aggregate_keys(keys.len())?;
                let stages = pipeline::assemble(&keys, &self.aggregates, options.query.take())?;
                options.aggregate = Some(stages);
            }
        }

        Ok(options)
    }
}
