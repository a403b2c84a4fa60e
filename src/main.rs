use clap::Parser;
use std::sync::Arc;
use tokio::signal;

use oocsi_gateway::{
    config::Config,
    constants::*,
    emit_system_event,
    events::{audit::DispatcherEventLog, model::LogLevel},
    network::{start_listener, ClientDirectory, ServerContext, SessionSettings},
    protocol::BasicProtocol,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Multi-dialect OOCSI socket gateway")]
struct Args {
    /// Optional path to config file (TOML)
    #[arg(short, long)]
    config: Option<String>,

    /// Override the listening port
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| "config.toml".to_string());
    let mut config = match Config::load(&config_path) {
        Ok(Some(cfg)) => {
            println!("{}Loaded config from: {}", ICON_PLACEHOLDER, config_path);
            cfg
        }
        Ok(None) => {
            println!(
                "⚠️ No config file found at '{}', falling back to default config.",
                config_path
            );
            Config::default()
        }
        Err(err) => {
            eprintln!("❌ {}", err);
            std::process::exit(1);
        }
    };
    if let Some(port) = args.port {
        config.port = port;
    }

    // Initialize events after config is loaded so custom logging path can be applied
    oocsi_gateway::events::init_events_from_config(config.logging.as_ref()).await;
    emit_system_event!(
        "gateway",
        LogLevel::Info,
        "startup",
        Some(format!("version={} bind={}", full_version(), config.bind_addr()))
    );

    let directory = ClientDirectory::new();
    let router = Arc::new(BasicProtocol::new(directory));
    let ctx = ServerContext {
        directory: router.clone(),
        router,
        event_log: Arc::new(DispatcherEventLog),
        settings: SessionSettings::from_config(&config),
    };

    let listener_config = config.clone();
    tokio::spawn(async move {
        if let Err(e) = start_listener(&listener_config, ctx).await {
            eprintln!("❌ Listener error: {}", e);
            emit_system_event!(
                "gateway",
                LogLevel::Error,
                "listener_failed",
                Some(e.to_string())
            );
        }
    });

    println!(
        "🟢 {} listening on {}. Press Ctrl+C to shut down...",
        DEFAULT_APP_NAME,
        config.bind_addr()
    );

    if let Err(e) = signal::ctrl_c().await {
        eprintln!("❌ Failed to listen for shutdown signal: {}", e);
    }
    println!("🛑 {} shutting down.", DEFAULT_APP_NAME);
    emit_system_event!("gateway", LogLevel::Info, "shutdown", None::<String>);
}
