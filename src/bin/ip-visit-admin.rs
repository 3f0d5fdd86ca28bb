use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use ip_visit_counter::config::{Config, CounterBackend};
use ip_visit_counter::counter::{visit_key, CounterStore, RedisCounterStore, VISIT_TTL};

#[derive(Parser)]
#[command(name = "ip-visit-admin")]
#[command(about = "Inspect and reset visit counters", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the current visit count of a client
    Count {
        /// Client address, exactly as the service keys it
        ip: String,
    },
    /// Delete the visit counter of a client
    Reset {
        /// Client address, exactly as the service keys it
        ip: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    if config.counter.backend != CounterBackend::Redis {
        bail!("visit counters of the in-memory backend live inside the service process");
    }

    let store = RedisCounterStore::connect(&config.counter.redis_address, VISIT_TTL).await?;

    match cli.command {
        Commands::Count { ip } => match store.peek(&visit_key(&ip)).await? {
            Some(visit) => match visit.ttl {
                Some(ttl) => println!(
                    "{ip}: {} visit(s), expires in {}s",
                    visit.count,
                    ttl.as_secs()
                ),
                None => println!("{ip}: {} visit(s), no expiry", visit.count),
            },
            None => println!("{ip}: no visits recorded"),
        },
        Commands::Reset { ip } => {
            if store.reset(&visit_key(&ip)).await? {
                println!("✓ Reset visit counter of {ip}");
            } else {
                println!("⚠ No visit counter for {ip}");
            }
        }
    }

    Ok(())
}
