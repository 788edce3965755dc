mod library;

use anyhow::{Context, Result, bail};
use broadlink_lib::config::DEFAULT_DISCOVERY_WINDOW;
use broadlink_lib::{Device, DeviceKind, ProtocolConfig, discover};
use clap::{Parser, Subcommand};
use clap_verbosity_flag::{InfoLevel, Verbosity};
use library::CommandLibrary;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Discover Broadlink RM remotes, learn IR/RF commands and replay them.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON file holding learned commands.
    #[arg(short, long, default_value = "commands.json")]
    library: PathBuf,
    /// How long to collect discovery responses, in milliseconds.
    #[arg(short, long, default_value_t = DEFAULT_DISCOVERY_WINDOW.as_millis() as u64)]
    window_ms: u64,
    /// Local address to bind sockets to.
    #[arg(short, long)]
    bind: Option<SocketAddr>,
    /// Address the discovery probe is sent to.
    #[arg(long)]
    broadcast: Option<Ipv4Addr>,
    /// Time to wait for a device response, in milliseconds.
    #[arg(short, long)]
    timeout_ms: Option<u64>,
    #[command(flatten)]
    verbose: Verbosity<InfoLevel>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List devices on the local network.
    Discover {
        /// Stop at the first device that answers.
        #[arg(long)]
        first: bool,
    },
    /// Read the temperature sensor of the first remote.
    Temperature,
    /// Learn a signal and store it in the library under NAME.
    Learn {
        name: String,
        /// Seconds to wait for the remote button press.
        #[arg(long, default_value_t = 3)]
        wait_secs: u64,
        /// Replace an existing command with the same name.
        #[arg(long)]
        force: bool,
    },
    /// Replay the stored signal NAME.
    Send { name: String },
    /// List the commands in the library.
    List,
}

fn setup_logging(verbosity: &Verbosity<InfoLevel>) {
    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time();

    let filter = EnvFilter::builder()
        .with_default_directive(verbosity.tracing_level_filter().into())
        .from_env_lossy();

    tracing_subscriber::registry().with(filter).with(console_layer).init();
}

impl Cli {
    fn protocol_config(&self) -> ProtocolConfig {
        let mut config = ProtocolConfig::default();
        if let Some(bind) = self.bind {
            config.local_addr = bind;
        }
        if let Some(broadcast) = self.broadcast {
            config.broadcast_addr = broadcast;
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config = config.timeout(Duration::from_millis(timeout_ms));
        }
        config
    }

    fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(&cli.verbose);

    if let Err(e) = run(cli).await {
        error!("{:#}", e);
        std::process::exit(1);
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    match &cli.command {
        Command::Discover { first } => run_discover(&cli, *first).await,
        Command::Temperature => {
            let mut device = connect_remote(&cli).await?;
            let temperature = device.remote()?.read_temperature().await?;
            println!("{temperature:.1} °C");
            Ok(())
        }
        Command::Learn { name, wait_secs, force } => run_learn(&cli, name, *wait_secs, *force).await,
        Command::Send { name } => {
            let library = CommandLibrary::open(&cli.library)?;
            let signal = library.get(name)?;
            let mut device = connect_remote(&cli).await?;
            device.remote()?.send_signal(&signal).await?;
            info!(%name, signal_type = %signal.signal_type, "Sent");
            Ok(())
        }
        Command::List => {
            let library = CommandLibrary::open(&cli.library)?;
            if library.is_empty() {
                println!("No commands in {:?}", cli.library);
            }
            for name in library.names() {
                match library.get(name) {
                    Ok(signal) => println!(
                        "{name:<24} {:<12} {} pulses, repeat {}",
                        signal.signal_type.to_string(),
                        signal.pulses().len(),
                        signal.repeat
                    ),
                    Err(e) => warn!("{:#}", e),
                }
            }
            Ok(())
        }
    }
}

async fn run_discover(cli: &Cli, first: bool) -> Result<()> {
    let devices = discover(&cli.protocol_config(), cli.window(), first)
        .await
        .context("Discovery failed")?;
    if devices.is_empty() {
        println!("No devices found.");
    }
    for device in &devices {
        println!("{}  [{}]", device.record(), device.kind());
    }
    Ok(())
}

async fn run_learn(cli: &Cli, name: &str, wait_secs: u64, force: bool) -> Result<()> {
    let mut library = CommandLibrary::open(&cli.library)?;
    if library.contains(name) && !force {
        bail!("Command '{name}' already exists, use --force to replace it");
    }

    let mut device = connect_remote(cli).await?;
    let mut remote = device.remote()?;
    remote.enter_learning().await?;
    println!("Press the remote button now ({wait_secs} s)...");
    sleep(Duration::from_secs(wait_secs)).await;

    let signal = remote
        .read_learned()
        .await
        .context("Nothing learned, try again closer to the device")?;
    println!("Received {}", signal.to_base64()?);

    library.insert(name, &signal, force)?;
    library.save()?;
    info!(%name, library = ?cli.library, "Stored command");
    Ok(())
}

/// Discover, pick the first remote-control device and authorize it.
async fn connect_remote(cli: &Cli) -> Result<Device> {
    let devices = discover(&cli.protocol_config(), cli.window(), false)
        .await
        .context("Discovery failed")?;
    let mut device = devices
        .into_iter()
        .find(|d| d.kind() == DeviceKind::RemoteControl)
        .context("No RM device found. Is it on the same network?")?;

    device
        .authorize()
        .await
        .with_context(|| format!("Authorization with {} failed", device.record()))?;
    Ok(device)
}
