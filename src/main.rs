use anyhow::Result;
use clap::Parser;
use grid_ladder_bot::config::load_config;
use grid_ladder_bot::config::store::TomlPriceStore;
use grid_ladder_bot::ladder::controller::LadderController;
use grid_ladder_bot::logging::directive_audit::DirectiveAuditLogger;
use grid_ladder_bot::runtime::paper::{PaperExchange, PriceTape};
use grid_ladder_bot::runtime::Engine;
use log::{error, info};

#[derive(Parser, Debug)]
#[command(author, version, about = "Trailing Grid Ladder Bot", long_about = None)]
struct Args {
    #[arg(short, long)]
    config: String,

    /// CSV of mid prices to replay through the paper executor, one per tick.
    /// Without it the entry_price from the config is held flat.
    #[arg(short, long)]
    prices: Option<String>,
}

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

#[tokio::main]
async fn main() -> Result<()> {
    // ---------------------------------------------------------
    // 1. Setup Logging (Tracing)
    // ---------------------------------------------------------
    let file_appender = tracing_appender::rolling::daily("logs", "application.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    // Console Layer (Env Filter)
    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_level(true)
        .with_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into())
                .add_directive("grid_ladder_bot=debug".parse()?),
        );

    // File Layer (Simple Text)
    let file_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(non_blocking)
        .with_target(false)
        .with_filter(tracing_subscriber::EnvFilter::new(
            "info,grid_ladder_bot=debug",
        ));

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();

    // ---------------------------------------------------------
    // 2. Setup Audit Logger
    // ---------------------------------------------------------
    let audit_logger = match DirectiveAuditLogger::new("logs") {
        Ok(l) => Some(l),
        Err(e) => {
            error!("Failed to initialize Directive Audit Logger: {}", e);
            None
        }
    };

    let args = Args::parse();

    info!("Loading config from: {}", args.config);
    let config = load_config(&args.config)?;
    info!(
        "Ladder for {}: {} levels, step {}, margin {} @ {}x",
        config.instrument, config.levels, config.step, config.initial_margin, config.leverage
    );

    let tape = match &args.prices {
        Some(path) => {
            let tape = PriceTape::from_csv(path)?;
            info!("Replaying {} prices from {}", tape.len(), path);
            tape
        }
        None => {
            let entry = config.entry_price.ok_or_else(|| {
                anyhow::anyhow!("Either --prices or a configured entry_price is required")
            })?;
            info!("No price tape given; holding mid at {}", entry);
            PriceTape::constant(entry)
        }
    };

    let (event_tx, event_rx) = tokio::sync::mpsc::unbounded_channel();
    let exchange = PaperExchange::new(config.step, event_tx);

    // Market driver: advances the paper book along the tape, one price per
    // tick, then holds the last price.
    let driver = exchange.clone();
    let tick = std::time::Duration::from_secs(config.tick_secs);
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(tick);
        let mut i = 0usize;
        loop {
            timer.tick().await;
            driver.mark(tape.get(i));
            i += 1;
        }
    });

    let store = TomlPriceStore::new(&args.config);
    let controller = LadderController::new(
        config,
        exchange.clone(),
        exchange,
        store,
        audit_logger,
    );

    let engine = Engine::new(controller, event_rx);
    if let Err(e) = engine.run().await {
        error!("Engine error: {}", e);
        std::process::exit(1);
    }

    Ok(())
}
