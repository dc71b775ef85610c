use clap::Parser;

use crate::policy::RateLimitPolicy;

// CLI argument structure
#[derive(Parser, Debug, Clone)]
#[command(name = "localelore-gateway")]
#[command(about = "Rate limiting gateway in front of the LocaleLore backend")]
pub struct Args {
    // Port to run the server on
    #[arg(short, long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    // Backend base URL (REST, auth and edge functions)
    #[arg(long, env = "SUPABASE_URL", default_value = "http://localhost:54321")]
    pub supabase_url: String,

    // Public API key sent with token lookups
    #[arg(long, env = "SUPABASE_ANON_KEY")]
    pub supabase_anon_key: Option<String>,

    // Postgres holding the rate_limits table; in-memory counters when unset
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    // How long a verified token stays cached, in seconds
    #[arg(long, default_value_t = 30)]
    pub token_cache_ttl: u64,

    // Expired counter sweep interval, in seconds
    #[arg(long, default_value_t = 60)]
    pub sweep_interval: u64,

    // Default log filter when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    pub log_level: String,

    // Preset applied to the /rest/v1 data API (auth, create, standard, read, webhook)
    #[arg(long, env = "REST_RATE_LIMIT", default_value = "standard", value_parser = parse_policy)]
    pub rest_policy: RateLimitPolicy,
}

fn parse_policy(name: &str) -> Result<RateLimitPolicy, String> {
    RateLimitPolicy::preset(name).ok_or_else(|| {
        let known: Vec<_> = RateLimitPolicy::PRESETS.iter().map(|p| p.key_prefix).collect();
        format!("unknown policy '{}', expected one of {}", name, known.join(", "))
    })
}
