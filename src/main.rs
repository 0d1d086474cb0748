use broadside::{
    init_logging, GameClient, GameEnd, GameRules, HumanPlayer, RandomBot, Server, ServerConfig,
    DEFAULT_BIND, MAX_FRAME_LEN,
};

use clap::Parser;
use log::info;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use tokio::time::Duration;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Parser)]
enum Commands {
    /// Run the matchmaking server.
    Serve {
        #[arg(long, env = "BROADSIDE_BIND", default_value = DEFAULT_BIND)]
        bind: String,
        #[arg(long, default_value_t = broadside::BOARD_SIZE)]
        board_size: usize,
        #[arg(
            long,
            value_delimiter = ',',
            default_values_t = broadside::SHIP_LENGTHS,
            help = "Ship lengths, comma separated"
        )]
        ships: Vec<usize>,
        #[arg(
            long,
            help = "Treat a player as disconnected after this many seconds without a move"
        )]
        move_timeout_secs: Option<u64>,
        #[arg(long, help = "Fix RNG seed for reproducible fleets (e.g., --seed 12345)")]
        seed: Option<u64>,
    },
    /// Join a server and play, either by typing moves or with a random bot.
    Client {
        #[arg(long, env = "BROADSIDE_CONNECT", default_value = DEFAULT_BIND)]
        connect: String,
        #[arg(long, help = "Display name (asked for in interactive mode if omitted)")]
        name: Option<String>,
        #[arg(long, help = "Type moves such as A5 instead of letting a bot shoot")]
        interactive: bool,
        #[arg(long, help = "Fix RNG seed for reproducible shots (e.g., --seed 12345)")]
        seed: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            bind,
            board_size,
            ships,
            move_timeout_secs,
            seed,
        } => {
            let config = ServerConfig {
                bind,
                rules: GameRules {
                    board_size,
                    ship_lengths: ships,
                },
                move_timeout: move_timeout_secs.map(Duration::from_secs),
                max_frame_len: MAX_FRAME_LEN,
                seed,
            };
            if let Some(s) = seed {
                info!("using fixed seed {} (fleets will be reproducible)", s);
            }
            let server = Server::bind(config).await?;
            server.run().await?;
        }
        Commands::Client {
            connect,
            name,
            interactive,
            seed,
        } => {
            let end = if interactive {
                let mut human = HumanPlayer::stdio();
                let name = match name {
                    Some(name) => name,
                    None => human.ask_name("Player").await?,
                };
                let mut client = GameClient::connect(connect.as_str(), &name).await?;
                info!("connected to {} as {}", connect, name);
                let end = client.play(&mut human).await;
                client.close().await;
                end?
            } else {
                let rng = match seed {
                    Some(s) => SmallRng::seed_from_u64(s),
                    None => SmallRng::from_rng(&mut rand::rng()),
                };
                let name = name.unwrap_or_else(|| "Player".to_string());
                let mut client = GameClient::connect(connect.as_str(), &name).await?;
                info!("connected to {} as {}", connect, name);
                let mut bot = RandomBot::new(rng);
                let end = client.play(&mut bot).await;
                client.close().await;
                info!("{} shots fired", bot.moves());
                end?
            };
            match end {
                GameEnd::Finished { winner_name, text } => {
                    info!("{} Winner: {}", text, winner_name);
                }
                GameEnd::OpponentLeft(text) => info!("{}", text),
            }
        }
    }
    Ok(())
}
