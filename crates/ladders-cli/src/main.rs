use std::error::Error;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use ladders::prelude::*;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

/// Snakes and ladders over the local network.
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Host a table and wait for participants
    Host(HostArgs),
    /// Join a table someone else is hosting
    Join(JoinArgs),
}

#[derive(Args, Debug)]
struct HostArgs {
    /// JSON configuration file; flags below override it
    #[clap(short, long)]
    config: Option<PathBuf>,
    /// IP address to bind to
    #[clap(short = 'H', long)]
    host: Option<String>,
    /// Port to listen on
    #[clap(short, long)]
    port: Option<u16>,
    /// Polling rate (ticks per second)
    #[clap(short, long)]
    tick_rate: Option<u32>,
    /// Start once this many participants have joined instead of waiting for Enter
    #[clap(long)]
    players: Option<usize>,
    /// Fewest participants the game may start with
    #[clap(long)]
    min_players: Option<usize>,
    /// What to do when a participant drops: drop, end or tolerate
    #[clap(long)]
    policy: Option<DisconnectPolicy>,
    /// Wire format: lines or json
    #[clap(long)]
    format: Option<WireFormat>,
    /// Seed for reproducible boards and rolls
    #[clap(long)]
    seed: Option<u64>,
    /// Count every yes vote, even repeated ones from the same participant
    #[clap(long)]
    allow_revote: bool,
}

impl HostArgs {
    /// Lays the flags over `config`.
    fn apply(&self, mut config: ServerConfig) -> ServerConfig {
        if self.host.is_some() || self.port.is_some() {
            let (host, port) = match config.bind_addr.rsplit_once(':') {
                Some((host, port)) => (host.to_string(), port.to_string()),
                None => (config.bind_addr.clone(), "7070".to_string()),
            };
            let host = self.host.clone().unwrap_or(host);
            let port = self.port.map(|p| p.to_string()).unwrap_or(port);
            config.bind_addr = format!("{host}:{port}");
        }
        if let Some(hz) = self.tick_rate {
            config.tick_rate_hz = hz;
        }
        if self.players.is_some() {
            config.auto_start = self.players;
        }
        if let Some(n) = self.min_players {
            config.min_players = n;
        }
        if let Some(policy) = self.policy {
            config.disconnect_policy = policy;
        }
        if let Some(format) = self.format {
            config.wire_format = format;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if self.allow_revote {
            config.one_vote_per_round = false;
        }
        config
    }
}

#[derive(Args, Debug)]
struct JoinArgs {
    /// Host address
    #[clap(default_value = "127.0.0.1:7070")]
    addr: String,
    /// Display name
    #[clap(short, long)]
    name: String,
    /// Wire format the host speaks: lines or json
    #[clap(long, default_value = "lines")]
    format: WireFormat,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Host(args) => host(args).await,
        Commands::Join(args) => join(args).await,
    }
}

async fn host(args: HostArgs) -> Result<(), Box<dyn Error>> {
    let config = match &args.config {
        Some(path) => ServerConfig::from_json_file(path)?,
        None => ServerConfig::default(),
    };
    let config = args.apply(config);
    let manual = config.auto_start.is_none();
    let min_players = config.min_players;

    let server = LaddersServer::builder().config(config).build().await?;
    tracing::info!(addr = %server.local_addr()?, "waiting for participants");

    if manual {
        let start = server.start_handle();
        println!("Press Enter to start the game (needs at least {min_players} participants).");
        tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            if let Ok(Some(_)) = lines.next_line().await {
                start.start();
            }
        });
    }

    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => tracing::info!("interrupted, shutting down"),
    }
    Ok(())
}

async fn join(args: JoinArgs) -> Result<(), Box<dyn Error>> {
    let mut client = ParticipantClient::connect(&args.addr, &args.name, args.format).await?;
    println!("Joined {}. Commands: r = roll, y = play again, n = don't, q = quit", args.addr);

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            msg = client.next_message() => match msg? {
                Some(msg) => render(&client, &msg),
                None => {
                    println!("The host closed the table.");
                    return Ok(());
                }
            },
            line = stdin.next_line() => match line?.as_deref().map(str::trim) {
                Some("r") => client.roll().await?,
                Some("y") => client.vote(true).await?,
                Some("n") => client.vote(false).await?,
                Some("q") | None => break,
                Some(other) => println!("Unknown command {other:?}"),
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    client.leave().await?;
    Ok(())
}

fn render(client: &ParticipantClient, msg: &ServerMessage) {
    match msg {
        ServerMessage::Start => println!("The game is starting..."),
        ServerMessage::Layout(layout) => {
            println!("Snakes:  {}", pairs(layout.snakes.iter()));
            println!("Ladders: {}", pairs(layout.ladders.iter()));
        }
        ServerMessage::State(state) => {
            println!();
            let rows = state.names.iter().zip(&state.positions).zip(&state.wins);
            for (seat, ((name, cell), wins)) in rows.enumerate() {
                let marker = if seat == state.current_turn && !state.finished {
                    '>'
                } else {
                    ' '
                };
                println!("{marker} {name:<16} cell {cell:>3}   wins {wins}");
            }
            if state.die > 0 {
                println!("Die: {}", state.die);
            }
            println!("{}", state.status);
            if state.finished {
                println!("Play again? (y/n)");
            } else if client.view().is_turn_of(client.name()) {
                println!("Your turn! (r)");
            }
        }
    }
}

fn pairs<'a>(links: impl Iterator<Item = (&'a u8, &'a u8)>) -> String {
    let pairs: Vec<String> = links.map(|(from, to)| format!("{from}->{to}")).collect();
    if pairs.is_empty() {
        "none".to_string()
    } else {
        pairs.join(", ")
    }
}
