//! kvlink CLI Client
//!
//! Command-line interface over the kvlink client.

use std::process;

use clap::{Parser, Subcommand};
use kvlink::{Client, Config, KeyValueMap, KvError};
use tracing_subscriber::{fmt, EnvFilter};

/// kvlink CLI
#[derive(Parser, Debug)]
#[command(name = "kvlink-cli")]
#[command(about = "CLI for Redis-style key-value stores")]
#[command(version)]
struct Args {
    /// Server host
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Server port
    #[arg(short, long, default_value = "6379")]
    port: u16,

    /// Response timeout in milliseconds
    #[arg(short, long, default_value = "10000")]
    timeout_ms: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ping the server
    Ping,

    /// Get a value by key
    Get {
        /// The key to get
        key: String,
    },

    /// Set a key-value pair
    Set {
        /// The key to set
        key: String,

        /// The value to set
        value: String,
    },

    /// Get several values
    Mget {
        /// Keys to fetch
        #[arg(required = true)]
        keys: Vec<String>,
    },

    /// Set several key=value pairs
    Mset {
        /// Pairs in key=value form
        #[arg(required = true)]
        pairs: Vec<String>,
    },

    /// List keys matching a pattern
    Keys {
        #[arg(default_value = "*")]
        pattern: String,
    },

    /// Print server diagnostics
    Info,

    /// Print every key matching a pattern with its value
    Dump {
        #[arg(default_value = "*")]
        pattern: String,
    },
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        tracing::error!("{}", e);
        eprintln!("error: {}", e);
        process::exit(1);
    }
}

fn run(args: Args) -> Result<(), KvError> {
    let config = Config::builder()
        .host(&args.host)
        .port(args.port)
        .response_timeout_ms(args.timeout_ms)
        .build();

    tracing::debug!("kvlink CLI v{} connecting to {}", kvlink::VERSION, config.addr());
    let client = Client::connect(config)?;

    let result = execute(&client, args.command);
    client.disconnect();
    result
}

fn execute(client: &Client, command: Commands) -> Result<(), KvError> {
    match command {
        Commands::Ping => {
            let alive = client.ping()?;
            println!("{}", if alive { "PONG" } else { "no pong" });
        }
        Commands::Get { key } => match client.get(&key)? {
            Some(value) => println!("{}", String::from_utf8_lossy(&value)),
            None => println!("(nil)"),
        },
        Commands::Set { key, value } => print_ack(client.set(&key, &value)?),
        Commands::Mget { keys } => {
            let values = client.mget(keys.as_slice())?;
            for (key, value) in keys.iter().zip(values) {
                match value {
                    Some(v) => println!("{}={}", key, String::from_utf8_lossy(&v)),
                    None => println!("{}=(nil)", key),
                }
            }
        }
        Commands::Mset { pairs } => {
            let map = parse_pairs(&pairs)?;
            print_ack(client.mset(&map)?);
        }
        Commands::Keys { pattern } => {
            for key in client.keys(&pattern)? {
                println!("{}", key);
            }
        }
        Commands::Info => println!("{}", client.info()?),
        Commands::Dump { pattern } => {
            let map = client.map_keys(&pattern)?;
            let mut entries: Vec<_> = map.into_iter().collect();
            entries.sort();
            for (key, value) in entries {
                println!("{}={}", key, value);
            }
        }
    }
    Ok(())
}

fn print_ack(ok: bool) {
    println!("{}", if ok { "OK" } else { "not acknowledged" });
}

fn parse_pairs(pairs: &[String]) -> Result<KeyValueMap, KvError> {
    pairs
        .iter()
        .map(|pair| {
            pair.split_once('=')
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .ok_or_else(|| KvError::Config(format!("expected key=value, got {:?}", pair)))
        })
        .collect()
}
