//! Minimal ticket API demonstrating per-route page options.
//!
//! Run with: cargo run -p pagekit-axum --example listing
//! Then try:
//!   curl 'localhost:3000/tickets?limit=25&query={"status":"open"}'
//!   curl 'localhost:3000/tickets?aggregate=byRegion&query={"status":"open"}'
//!   curl 'localhost:3000/tickets/report?select=status'

use axum::{Json, Router, routing::get};
use pagekit::{Mode, OptionsBuilder, PageOptions};
use pagekit_axum::{PageQuery, QueryEndpoint};
use serde_json::json;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

struct TicketList;

impl QueryEndpoint for TicketList {
    fn builder() -> OptionsBuilder {
        OptionsBuilder::new()
            .allow_fields(["status", "owner.id"])
            .aggregate(
                "byRegion",
                vec![json!({"$group": {"_id": "$region", "count": {"$sum": 1}}})],
            )
            .aggregate(
                "recent",
                vec![json!({"$sort": {"created_at": -1}}), json!({"$limit": 10})],
            )
    }
}

struct TicketReport;

impl QueryEndpoint for TicketReport {
    fn builder() -> OptionsBuilder {
        OptionsBuilder::new()
            .mode(Mode::Single)
            .allow_field("status")
    }
}

async fn list_tickets(query: PageQuery<TicketList>) -> Json<PageOptions> {
    // A real handler would hand the options to its store driver.
    Json(query.into_inner())
}

async fn ticket_report(query: PageQuery<TicketReport>) -> Json<PageOptions> {
    Json(query.into_inner())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "listing=debug,pagekit_axum=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let app = Router::new()
        .route("/tickets", get(list_tickets))
        .route("/tickets/report", get(ticket_report));

    let addr = "127.0.0.1:3000";
    tracing::info!("listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
