//! End-to-end discovery run against live DeepSeek and DuckDuckGo.
//!
//! Needs `DEEPSEEK_API_KEY` in the environment (or a `.env` file).
//!
//! ```bash
//! cargo run --example discover -- "Chalshkn Co" "Iraq"
//! ```

use deepseek_client::DeepSeekClient;
use scavenge::{
    ContactFinder, ContactQuery, DiscoveryConfig, DuckDuckGoSearcher, ReqwestTransport,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,scavenge=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut args = std::env::args().skip(1);
    let company = args.next().unwrap_or_else(|| "Chalshkn Co".to_string());
    let country = args.next().unwrap_or_else(|| "Iraq".to_string());

    let config = DiscoveryConfig::default();
    let finder = ContactFinder::new(
        DeepSeekClient::from_env()?,
        DuckDuckGoSearcher::new()?,
        ReqwestTransport::new(&config.fetch)?,
        config,
    )
    .on_progress(|msg| eprintln!("  {msg}"));

    let report = finder.find(&ContactQuery::new(company, country)).await;

    eprintln!("\nDone in {} turns.", report.turns_used);
    println!("{}", serde_json::to_string_pretty(&report.result)?);
    Ok(())
}
