//! Logging
//!
//! Debug levels for the store's log gate, and helpers that install a
//! `tracing-subscriber` fmt layer as the output sink.

use tracing::level_filters::LevelFilter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

/// Verbosity of the store's log output. Ordered: `None < Error < Info < Verbose`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum DebugLevel {
    #[default]
    None,
    Error,
    Info,
    Verbose,
}

impl DebugLevel {
    /// Whether an event at `level` passes a gate set to `self`
    pub fn allows(self, level: DebugLevel) -> bool {
        level != DebugLevel::None && level <= self
    }

    /// Map the level onto tracing's filter
    pub fn level_filter(self) -> LevelFilter {
        match self {
            DebugLevel::None => LevelFilter::OFF,
            DebugLevel::Error => LevelFilter::ERROR,
            DebugLevel::Info => LevelFilter::INFO,
            DebugLevel::Verbose => LevelFilter::TRACE,
        }
    }

    /// Level for a `-v` count on the command line
    pub fn from_verbosity(count: u8) -> Self {
        match count {
            0 => DebugLevel::Error,
            1 => DebugLevel::Info,
            _ => DebugLevel::Verbose,
        }
    }
}

/// Install a global stderr subscriber for `level`.
///
/// `RUST_LOG` takes precedence when set. Repeated calls are ignored.
pub fn init(level: DebugLevel) {
    init_with_writer(level, std::io::stderr);
}

/// Install a global subscriber writing to `writer`.
pub fn init_with_writer<W>(level: DebugLevel, writer: W)
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::default().add_directive(level.level_filter().into()));

    // Logging never raises: a second install just keeps the first subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(writer)
        .try_init();
}
