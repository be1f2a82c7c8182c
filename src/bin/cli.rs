//! calstore CLI
//!
//! Command-line interface over a file-backed calibration store.

use std::fs;
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use calstore::{
    logging, CalibrationStore, CipherMode, DebugLevel, FileBackend, Result, StoreConfig, Value,
    DEFAULT_NAMESPACE,
};

/// calstore CLI
#[derive(Parser, Debug)]
#[command(name = "calstore-cli")]
#[command(about = "Inspect and edit a calstore calibration namespace")]
#[command(version)]
struct Args {
    /// Data directory holding namespace files
    #[arg(short, long, default_value = "./calstore_data")]
    data_dir: PathBuf,

    /// Namespace to open
    #[arg(short, long, default_value = DEFAULT_NAMESPACE)]
    namespace: String,

    /// Passphrase enabling value encryption (min 16 bytes)
    #[arg(short, long, env = "CALSTORE_PASSPHRASE", hide_env_values = true)]
    passphrase: Option<String>,

    /// Read and write values in the legacy AES-ECB format
    #[arg(long)]
    legacy_ecb: bool,

    /// Increase log verbosity (-v info, -vv verbose)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the value stored under a key
    Get {
        /// The key to read
        key: String,
    },

    /// Store a typed value
    Set {
        /// The key to set
        key: String,

        /// The value to set
        value: String,

        /// How to interpret the value
        #[arg(short, long, value_enum, default_value_t = Kind::Str)]
        kind: Kind,
    },

    /// Delete a key
    Remove {
        /// The key to delete
        key: String,
    },

    /// Delete every entry in the namespace
    Clear,

    /// Print the namespace as a JSON object
    Export,

    /// Load entries from a JSON file
    Import {
        /// Path of the JSON document
        file: PathBuf,
    },

    /// Show or set the calibration version
    Version {
        /// New version string
        value: Option<String>,
    },

    /// Record the calibration timestamp (now when omitted)
    Stamp {
        /// Timestamp in Unix milliseconds
        ms: Option<u64>,
    },

    /// Exit non-zero when the calibration is outdated or expired
    Check {
        /// Expected calibration version
        #[arg(long)]
        version: Option<String>,

        /// Maximum calibration age in milliseconds
        #[arg(long)]
        max_age_ms: Option<u64>,
    },

    /// Show namespace usage
    Status,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Kind {
    Int,
    Float,
    Str,
}

fn main() {
    let args = Args::parse();
    let level = DebugLevel::from_verbosity(args.verbose);
    logging::init(level);

    match run(args, level) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("error: {}", e);
            std::process::exit(1);
        }
    }
}

fn run(args: Args, level: DebugLevel) -> Result<i32> {
    let cipher_mode = if args.legacy_ecb {
        CipherMode::LegacyEcb
    } else {
        CipherMode::Gcm
    };
    let config = StoreConfig::builder()
        .debug_level(level)
        .cipher_mode(cipher_mode)
        .build();

    let mut store = CalibrationStore::with_config(FileBackend::new(&args.data_dir), config);
    store.begin(&args.namespace)?;
    if let Some(passphrase) = args.passphrase.as_deref() {
        store.enable_encryption(passphrase)?;
    }

    let code = match args.command {
        Commands::Get { key } => match store.read_value(&key)? {
            Some(value) => {
                println!("{}", display(&value));
                0
            }
            None => {
                eprintln!("{}: not found", key);
                1
            }
        },
        Commands::Set { key, value, kind } => {
            store.set_value(&key, parse_value(&value, kind)?)?;
            0
        }
        Commands::Remove { key } => {
            if store.remove_value(&key)? {
                0
            } else {
                eprintln!("{}: not found", key);
                1
            }
        }
        Commands::Clear => {
            store.clear_all()?;
            0
        }
        Commands::Export => {
            println!("{}", store.export_to_json()?);
            0
        }
        Commands::Import { file } => {
            let text = fs::read_to_string(&file)?;
            let count = store.import_from_json(&text)?;
            println!("imported {} entries", count);
            0
        }
        Commands::Version { value: Some(version) } => {
            store.set_version(&version)?;
            0
        }
        Commands::Version { value: None } => {
            let version = store.get_version();
            if version.found {
                println!("{}", version.value);
                0
            } else {
                eprintln!("no version recorded");
                1
            }
        }
        Commands::Stamp { ms } => {
            store.set_timestamp(ms.unwrap_or(0))?;
            println!("{}", store.get_timestamp().into_value());
            0
        }
        Commands::Check {
            version,
            max_age_ms,
        } => {
            let mut stale = false;
            if let Some(version) = version {
                if store.is_outdated(&version) {
                    println!("outdated: stored version differs from {}", version);
                    stale = true;
                }
            }
            if let Some(max_age) = max_age_ms {
                if store.is_expired(max_age) {
                    println!("expired: older than {} ms", max_age);
                    stale = true;
                }
            }
            if stale {
                2
            } else {
                println!("ok");
                0
            }
        }
        Commands::Status => {
            println!("data dir: {}", store.backend().data_dir().display());
            println!("namespace: {}", args.namespace);
            println!("used entries: {}", store.used_space());
            println!("free entries: {}", store.free_space());
            println!("encryption: {}", store.is_encryption_enabled());
            0
        }
    };

    store.end();
    Ok(code)
}

fn parse_value(raw: &str, kind: Kind) -> Result<Value> {
    let invalid = |e: &dyn std::fmt::Display| {
        calstore::CalibrationError::InvalidParam(format!("'{}': {}", raw, e))
    };
    Ok(match kind {
        Kind::Int => Value::Int(raw.parse().map_err(|e| invalid(&e))?),
        Kind::Float => Value::Float(raw.parse().map_err(|e| invalid(&e))?),
        Kind::Str => Value::Str(raw.to_string()),
    })
}

fn display(value: &Value) -> String {
    match value {
        Value::Int(v) => v.to_string(),
        Value::Float(v) => v.to_string(),
        Value::Str(s) => s.clone(),
    }
}
