#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Axum extractors for [`pagekit`] page options.
//!
//! An endpoint declares its configuration once by implementing
//! [`QueryEndpoint`] on a marker type, then takes [`PageQuery`] in its
//! handler. Invalid query documents and unknown aggregation keys reject
//! the request with an RFC 9457 problem response.
//!
//! ```no_run
//! use axum::{routing::get, Json, Router};
//! use pagekit::{OptionsBuilder, PageOptions};
//! use pagekit_axum::{PageQuery, QueryEndpoint};
//! use serde_json::json;
//!
//! struct TicketList;
//!
//! impl QueryEndpoint for TicketList {
//!     fn builder() -> OptionsBuilder {
//!         OptionsBuilder::new()
//!             .allow_fields(["status", "owner.id"])
//!             .aggregate("byRegion", vec![json!({"$group": {"_id": "$region"}})])
//!     }
//! }
//!
//! async fn list_tickets(query: PageQuery<TicketList>) -> Json<PageOptions> {
//!     Json(query.into_inner())
//! }
//!
//! let app: Router = Router::new().route("/tickets", get(list_tickets));
//! # let _ = app;
//! ```

use std::convert::Infallible;
use std::marker::PhantomData;
use std::ops::Deref;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use pagekit::{Error as OptionsError, OptionsBuilder, PageOptions, QueryMap};

pub mod problem;
pub use problem::Problem;

/// Decode the request's query string into a [`QueryMap`], folding repeated
/// names into sequences in wire order.
#[must_use]
pub fn query_map_from_parts(parts: &Parts) -> QueryMap {
    let mut map = QueryMap::new();
    if let Some(raw) = parts.uri.query() {
        for (name, value) in url::form_urlencoded::parse(raw.as_bytes()).into_owned() {
            map.push(name, value);
        }
    }
    map
}

/// Extract trace ID from current tracing span
#[inline]
fn current_trace_id() -> Option<String> {
    tracing::Span::current()
        .id()
        .map(|id| id.into_u64().to_string())
}

/// Returns a fully contextualized Problem for rejected query parameters.
///
/// All build errors are client faults and map to 422. The `instance`
/// parameter should be the request path.
pub fn options_error_to_problem(
    err: &OptionsError,
    instance: &str,
    trace_id: Option<String>,
) -> Problem {
    let problem = match err {
        OptionsError::InvalidQuery(_) => {
            problem::unprocessable("Invalid Query", err.to_string()).with_code("invalid_query")
        }
        OptionsError::UnknownAggregate(_) => {
            problem::unprocessable("Unknown Aggregate", err.to_string())
                .with_code("unknown_aggregate")
        }
    };

    let mut problem = problem.with_instance(instance);
    if let Some(tid) = trace_id.or_else(current_trace_id) {
        problem = problem.with_trace_id(tid);
    }
    problem
}

/// Per-endpoint extractor configuration.
///
/// Implemented on a marker type per route; the marker picks the
/// [`OptionsBuilder`] that [`PageQuery`] runs for that route.
pub trait QueryEndpoint: Send + Sync + 'static {
    fn builder() -> OptionsBuilder;
}

/// Axum extractor that builds [`PageOptions`] from the request's query
/// string using the configuration of endpoint marker `E`.
///
/// Usage in handlers:
///   async fn `list_tickets(query: PageQuery<TicketList>)` { /* `query.limit` */ }
pub struct PageQuery<E> {
    options: PageOptions,
    _endpoint: PhantomData<E>,
}

impl<E> PageQuery<E> {
    #[inline]
    pub fn into_inner(self) -> PageOptions {
        self.options
    }
}

impl<E> std::fmt::Debug for PageQuery<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("PageQuery").field(&self.options).finish()
    }
}

impl<E> Clone for PageQuery<E> {
    fn clone(&self) -> Self {
        Self {
            options: self.options.clone(),
            _endpoint: PhantomData,
        }
    }
}

impl<E> Deref for PageQuery<E> {
    type Target = PageOptions;
    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.options
    }
}

impl<E> AsRef<PageOptions> for PageQuery<E> {
    #[inline]
    fn as_ref(&self) -> &PageOptions {
        &self.options
    }
}

impl<E> From<PageQuery<E>> for PageOptions {
    #[inline]
    fn from(x: PageQuery<E>) -> Self {
        x.options
    }
}

impl<S, E> FromRequestParts<S> for PageQuery<E>
where
    S: Send + Sync,
    E: QueryEndpoint,
{
    type Rejection = Problem;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let input = query_map_from_parts(parts);
        let options = E::builder()
            .build(&input)
            .map_err(|err| options_error_to_problem(&err, parts.uri.path(), None))?;
        tracing::debug!(path = %parts.uri.path(), options = ?options, "built page options");
        Ok(Self {
            options,
            _endpoint: PhantomData,
        })
    }
}

/// Axum extractor for the folded query map itself, without any endpoint
/// configuration. Never rejects.
#[derive(Debug, Clone)]
pub struct RawPageQuery(pub QueryMap);

impl RawPageQuery {
    #[inline]
    pub fn into_inner(self) -> QueryMap {
        self.0
    }
}

impl Deref for RawPageQuery {
    type Target = QueryMap;
    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<QueryMap> for RawPageQuery {
    #[inline]
    fn as_ref(&self) -> &QueryMap {
        &self.0
    }
}

impl From<RawPageQuery> for QueryMap {
    #[inline]
    fn from(x: RawPageQuery) -> Self {
        x.0
    }
}

impl<S> FromRequestParts<S> for RawPageQuery
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(query_map_from_parts(parts)))
    }
}
