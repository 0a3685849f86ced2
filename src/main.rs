//! Personality chat backend
//!
//! (c) Softlandia 2025

use personality_chat_api::add_services;
use personality_chat_api::api;
use personality_chat_api::core::completion::{CompletionConfig, GroqCompletionClient};
use personality_chat_api::infrastructure::database::DatabaseConnection;

use anyhow::anyhow;
use axum::http::{Method, header};
use di::{Injectable, ServiceCollection, existing_as_self};
use di_axum::RouterServiceProviderExtensions;
use log::info;
use std::env;
use tokio::runtime::{Builder, Runtime};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

const DEFAULT_PORT: u16 = 4000;

fn main() -> anyhow::Result<()> {
    // initialize tracing
    tracing_subscriber::fmt::init();

    let runtime: Runtime = Builder::new_multi_thread().enable_all().build()?;

    runtime.block_on(web_server_task())
}

async fn web_server_task() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // fail fast on a missing API key instead of on the first request
    let completion_config = CompletionConfig::from_env()?;
    let database = DatabaseConnection::from_env().await?;

    let mut services = ServiceCollection::new();
    services
        .add(existing_as_self(database))
        .add(existing_as_self(completion_config))
        .add(GroqCompletionClient::singleton());
    let provider = add_services(&mut services)
        .build_provider()
        .map_err(|e| anyhow!("invalid service registrations: {e}"))?;

    let app = api::router()
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::DELETE,
                    Method::PATCH,
                ])
                .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]),
        )
        .with_provider(provider);

    let port = match env::var("PORT") {
        Ok(port) => port.parse()?,
        Err(_) => DEFAULT_PORT,
    };

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    info!("Shutting down...");

    Ok(())
}
