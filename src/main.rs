use clap::Parser; // for cli
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

use localelore_gateway::app::build_router;
use localelore_gateway::config::Args;
use localelore_gateway::state::AppState;
use localelore_gateway::worker::sweeper;
use localelore_gateway::{
    MemoryStore, PostgresStore, RateLimitStore, RateLimiter, SupabaseTokenResolver,
};

// this is main async function with tokio
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // parse cli arguments
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(args.log_level.as_str()));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    let client = reqwest::Client::new();

    let resolver = Arc::new(SupabaseTokenResolver::new(
        client.clone(),
        &args.supabase_url,
        args.supabase_anon_key.clone(),
        Duration::from_secs(args.token_cache_ttl),
    ));

    // Postgres when configured, otherwise counters live in this process
    let store: Arc<dyn RateLimitStore> = match &args.database_url {
        Some(url) => {
            let store = PostgresStore::connect(url).await?;
            store.ensure_schema().await?;
            Arc::new(store)
        }
        None => Arc::new(MemoryStore::new()),
    };
    let in_memory = args.database_url.is_none();

    // spawn the background sweeper; a shared database is left to its own maintenance
    tokio::spawn(sweeper(
        in_memory.then(|| store.clone()),
        Some(resolver.clone()),
        Duration::from_secs(args.sweep_interval.max(1)),
    ));

    let limiter = Arc::new(RateLimiter::new(store));
    let state = AppState::new(client, &args.supabase_url, limiter, resolver);
    let app = build_router(state, args.rest_policy);

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("Gateway running on http://localhost:{}", args.port);
    info!("Forwarding to {}", args.supabase_url);
    info!("REST policy: {}", args.rest_policy.key_prefix);
    info!(
        "Counter store: {}",
        if in_memory { "in-memory" } else { "postgres" }
    );
    axum::serve(listener, app).await?;
    Ok(())
}
