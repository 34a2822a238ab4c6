//! # Trace Configuration
//!
//! Knobs for the capture pipeline, with defaults that suit a Linux process
//! built with debug information:
//!
//! | Field               | Default               | Environment            |
//! |---------------------|-----------------------|------------------------|
//! | `strategy`          | live introspection    | `STACKDUMP_STRATEGY`   |
//! | `translator`        | `addr2line` process   | `STACKDUMP_TRANSLATOR` |
//! | `map_snapshot`      | parsed once per trace | `STACKDUMP_MAP_CACHE`  |
//! | `offset_correction` | ELF load bias         | `STACKDUMP_OFFSET`     |
//! | `max_depth`         | 64                    | `STACKDUMP_MAX_DEPTH`  |

use std::env;
use std::fmt;
use std::str::FromStr;

use tracing::warn;

use crate::lines::process::DEFAULT_PROGRAM;
use crate::modules::{OffsetCorrection, ResolutionStrategy};

/// Default number of frames for callers that do not pick a depth.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Which address-to-line translator the pipeline uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranslatorKind
{
    /// Spawn an external program speaking the `addr2line` command line.
    Process
    {
        /// Program name or path.
        program: String,
    },
    /// Read DWARF in-process.
    Dwarf,
    /// Skip source line resolution entirely.
    Disabled,
}

impl Default for TranslatorKind
{
    fn default() -> Self
    {
        TranslatorKind::Process {
            program: DEFAULT_PROGRAM.to_string(),
        }
    }
}

impl FromStr for TranslatorKind
{
    type Err = String;

    /// `dwarf`, `none`/`off`, or anything else as the program to spawn.
    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        let trimmed = s.trim();
        match trimmed.to_lowercase().as_str() {
            "" => Err("Translator must not be empty".to_string()),
            "dwarf" | "builtin" | "internal" => Ok(TranslatorKind::Dwarf),
            "none" | "off" | "disabled" => Ok(TranslatorKind::Disabled),
            _ => Ok(TranslatorKind::Process {
                program: trimmed.to_string(),
            }),
        }
    }
}

impl fmt::Display for TranslatorKind
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            TranslatorKind::Process { program } => write!(f, "{program}"),
            TranslatorKind::Dwarf => write!(f, "dwarf"),
            TranslatorKind::Disabled => write!(f, "none"),
        }
    }
}

/// Lifetime of the module map used by the memory-map fallback.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MapSnapshot
{
    /// Parse the region listing once per trace.
    #[default]
    PerTrace,
    /// Parse it once per process and reuse it, accepting staleness.
    Cached,
}

impl FromStr for MapSnapshot
{
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "cached" => Ok(MapSnapshot::Cached),
            "0" | "false" | "no" | "per-trace" => Ok(MapSnapshot::PerTrace),
            _ => Err(format!("Unknown map cache setting: {s}. Use 'true' or 'false'")),
        }
    }
}

impl fmt::Display for MapSnapshot
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        let label = match self {
            MapSnapshot::PerTrace => "per-trace",
            MapSnapshot::Cached => "cached",
        };
        write!(f, "{label}")
    }
}

/// Pipeline configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceConfig
{
    pub strategy: ResolutionStrategy,
    pub translator: TranslatorKind,
    pub map_snapshot: MapSnapshot,
    pub offset_correction: OffsetCorrection,
    pub max_depth: usize,
}

impl Default for TraceConfig
{
    fn default() -> Self
    {
        Self {
            strategy: ResolutionStrategy::default(),
            translator: TranslatorKind::default(),
            map_snapshot: MapSnapshot::default(),
            offset_correction: OffsetCorrection::default(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl TraceConfig
{
    /// Defaults overridden by `STACKDUMP_*` environment variables.
    ///
    /// Unset variables keep their default; unparsable ones are logged and
    /// ignored.
    pub fn from_env() -> Self
    {
        let mut config = Self::default();
        if let Some(strategy) = env_value("STACKDUMP_STRATEGY") {
            config.strategy = strategy;
        }
        if let Some(translator) = env_value("STACKDUMP_TRANSLATOR") {
            config.translator = translator;
        }
        if let Some(map_snapshot) = env_value("STACKDUMP_MAP_CACHE") {
            config.map_snapshot = map_snapshot;
        }
        if let Some(offset_correction) = env_value("STACKDUMP_OFFSET") {
            config.offset_correction = offset_correction;
        }
        if let Some(max_depth) = env_value("STACKDUMP_MAX_DEPTH") {
            config.max_depth = max_depth;
        }
        config
    }

    #[must_use]
    pub fn with_strategy(mut self, strategy: ResolutionStrategy) -> Self
    {
        self.strategy = strategy;
        self
    }

    #[must_use]
    pub fn with_translator(mut self, translator: TranslatorKind) -> Self
    {
        self.translator = translator;
        self
    }

    #[must_use]
    pub fn with_map_snapshot(mut self, map_snapshot: MapSnapshot) -> Self
    {
        self.map_snapshot = map_snapshot;
        self
    }

    #[must_use]
    pub fn with_offset_correction(mut self, offset_correction: OffsetCorrection) -> Self
    {
        self.offset_correction = offset_correction;
        self
    }

    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self
    {
        self.max_depth = max_depth;
        self
    }
}

fn env_value<T>(name: &str) -> Option<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    let value = env::var(name).ok()?;
    match value.parse() {
        Ok(parsed) => Some(parsed),
        Err(err) => {
            warn!("ignoring {name}={value:?}: {err}");
            None
        }
    }
}
