use clap::{Parser, Subcommand, ValueEnum};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

use oocsi_gateway::client::{Handler, PushLine};
use oocsi_gateway::constants::{DEFAULT_PORT, JSON_MARKER};
use oocsi_gateway::network::Payload;

/// oocsi-ctl: small socket peer for poking a running gateway by hand
#[derive(Parser, Debug)]
#[command(name = "oocsi-ctl", version, about = "Manual test client for the OOCSI gateway")]
struct Cli {
    /// Gateway host
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Gateway port
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum ListenDialect {
    Oocsi,
    Json,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Register under a name and print every pushed event
    Listen {
        token: String,
        /// Channels to subscribe to after the welcome line
        #[arg(short, long)]
        subscribe: Vec<String>,
        #[arg(long, value_enum, default_value_t = ListenDialect::Oocsi)]
        dialect: ListenDialect,
    },
    /// Publish `key=value` data to a client or channel
    Send {
        /// Name to register as while sending
        #[arg(long, default_value = "oocsi-ctl")]
        token: String,
        recipient: String,
        data: Vec<String>,
    },
}

struct PrintHandler;

impl Handler for PrintHandler {
    fn receive(&self, sender: &str, data: Payload, timestamp: i64, channel: &str, _recipient: &str) {
        let json = serde_json::Value::Object(data.to_json_object());
        println!("[{}] {} -> {}: {}", timestamp, sender, channel, json);
    }
}

async fn connect(
    host: &str,
    port: u16,
    handshake: &str,
) -> anyhow::Result<(BufReader<OwnedReadHalf>, OwnedWriteHalf)> {
    let stream = TcpStream::connect((host, port)).await?;
    let (read_half, mut write_half) = stream.into_split();
    write_half.write_all(format!("{}\n", handshake).as_bytes()).await?;
    let mut reader = BufReader::new(read_half);
    let mut welcome = String::new();
    if reader.read_line(&mut welcome).await? == 0 {
        anyhow::bail!("gateway closed the connection during handshake");
    }
    let welcome = welcome.trim_end();
    if welcome.contains("error") {
        anyhow::bail!("handshake rejected: {}", welcome);
    }
    println!("{}", welcome);
    Ok((reader, write_half))
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Listen {
            token,
            subscribe,
            dialect,
        } => {
            let handshake = match dialect {
                ListenDialect::Oocsi => token.clone(),
                ListenDialect::Json => format!("{}{}", token, JSON_MARKER),
            };
            let (mut reader, mut writer) = connect(&cli.host, cli.port, &handshake).await?;
            for channel in &subscribe {
                writer
                    .write_all(format!("subscribe {}\n", channel).as_bytes())
                    .await?;
            }
            let mut line = String::new();
            loop {
                line.clear();
                if reader.read_line(&mut line).await? == 0 {
                    println!("connection closed");
                    return Ok(());
                }
                let text = line.trim_end();
                match PushLine::parse(text) {
                    Some(push) => {
                        if !push.dispatch(&PrintHandler, &token) {
                            eprintln!("⚠️ undecodable payload from {}", push.sender);
                        }
                    }
                    None => println!("{}", text),
                }
            }
        }
        Commands::Send {
            token,
            recipient,
            data,
        } => {
            let (_reader, mut writer) = connect(&cli.host, cli.port, &token).await?;
            writer
                .write_all(format!("sendraw {} {}\nquit\n", recipient, data.join(" ")).as_bytes())
                .await?;
            writer.shutdown().await?;
            println!("sent to {}", recipient);
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("❌ {}", e);
        std::process::exit(1);
    }
}
