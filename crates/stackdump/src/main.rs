use std::process;

use clap::{Args, Parser, Subcommand};
use once_cell::sync::OnceCell;
use stackdump_core::config::DEFAULT_MAX_DEPTH;
use stackdump_core::{
    MapSnapshot, OffsetCorrection, ResolutionStrategy, Trace, TraceConfig, TraceFormatter, Tracer, TranslatorKind,
};
use stackdump_utils::{debug, info, init_logging, init_logging_to_file, init_logging_with_level, LogFormat, LogLevel};

/// Capture and print symbolic native stack traces.
#[derive(Parser, Debug)]
#[command(name = "stackdump")]
#[command(version)]
#[command(about = "Capture and print symbolic native stack traces", long_about = None)]
struct Cli
{
    #[command(flatten)]
    options: TraceOptions,

    /// Log level (overrides RUST_LOG)
    #[arg(long, global = true)]
    log_level: Option<LogLevel>,

    /// Write logs to ~/.stackdump/<date>-stackdump.log instead of stderr
    #[arg(long, global = true, default_value_t = false)]
    log_to_file: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Overrides on top of the `STACKDUMP_*` environment configuration.
#[derive(Args, Debug, Clone)]
struct TraceOptions
{
    /// Module resolution strategy: `live` or `maps`
    #[arg(long, global = true)]
    strategy: Option<ResolutionStrategy>,

    /// Line translator: `dwarf`, `none`, or a program such as `addr2line`
    #[arg(long, global = true)]
    translator: Option<TranslatorKind>,

    /// Load bias rule for the maps strategy: `elf` or `mapping`
    #[arg(long, global = true)]
    offset: Option<OffsetCorrection>,

    /// Parse the module map once per process instead of once per trace
    #[arg(long, global = true, default_value_t = false)]
    map_cache: bool,

    /// Prefix offsets with the module name, e.g. `libc.so.6(+0x29d90)`
    #[arg(long, global = true, default_value_t = false)]
    show_module: bool,
}

impl TraceOptions
{
    fn config(&self) -> TraceConfig
    {
        let mut config = TraceConfig::from_env();
        if let Some(strategy) = self.strategy {
            config = config.with_strategy(strategy);
        }
        if let Some(translator) = &self.translator {
            config = config.with_translator(translator.clone());
        }
        if let Some(offset) = self.offset {
            config = config.with_offset_correction(offset);
        }
        if self.map_cache {
            config = config.with_map_snapshot(MapSnapshot::Cached);
        }
        config
    }

    fn formatter(&self) -> TraceFormatter
    {
        TraceFormatter::default().with_module(self.show_module)
    }
}

#[derive(Subcommand, Debug)]
enum Commands
{
    /// Print the stack of a main -> f1 -> f2 call chain
    Demo
    {
        /// Maximum number of frames
        #[arg(short, long)]
        depth: Option<usize>,
    },
    /// Install a SIGSEGV handler that prints the stack, then fault
    Crash
    {
        /// Maximum number of frames
        #[arg(short, long)]
        depth: Option<usize>,
    },
}

/// What the fatal signal handler needs, set before the handler is installed.
struct CrashSettings
{
    config: TraceConfig,
    formatter: TraceFormatter,
    depth: usize,
}

static CRASH_SETTINGS: OnceCell<CrashSettings> = OnceCell::new();

/// Exit status of a process that printed a trace from the crash handler.
const CRASH_EXIT_STATUS: i32 = 255;

fn main()
{
    let cli = Cli::parse();

    let logging = if cli.log_to_file {
        init_logging_to_file(cli.log_level).map(|path| eprintln!("Logging to {}", path.display()))
    } else if let Some(level) = cli.log_level {
        init_logging_with_level(level, LogFormat::Pretty)
    } else {
        init_logging()
    };
    if let Err(e) = logging {
        eprintln!("Failed to initialize logging: {}", e);
        process::exit(1);
    }

    let config = cli.options.config();
    debug!(?config, "trace configuration");

    match cli.command {
        Commands::Demo { depth } => {
            let depth = depth.unwrap_or(config.max_depth);
            let tracer = Tracer::new(config);
            let trace = f1(&tracer, depth);
            print!("{}", cli.options.formatter().render(&trace));
        }
        Commands::Crash { depth } => {
            let settings = CrashSettings {
                depth: depth.unwrap_or(config.max_depth),
                config,
                formatter: cli.options.formatter(),
            };
            crash(settings);
        }
    }
}

#[inline(never)]
fn f1(tracer: &Tracer, depth: usize) -> Trace
{
    let trace = f2(tracer, depth);
    info!(frames = trace.len(), "captured");
    trace
}

#[inline(never)]
fn f2(tracer: &Tracer, depth: usize) -> Trace
{
    let trace = tracer.capture(depth);
    debug!(frames = trace.len(), "f2 done");
    trace
}

extern "C" fn on_fatal_signal(signal: libc::c_int)
{
    // Not async-signal-safe; the process is going down anyway.
    let (config, formatter, depth) = match CRASH_SETTINGS.get() {
        Some(settings) => (settings.config.clone(), settings.formatter, settings.depth),
        None => (TraceConfig::default(), TraceFormatter::default(), DEFAULT_MAX_DEPTH),
    };

    let trace = Tracer::new(config).capture(depth);
    eprintln!("Caught signal {signal}; stack trace:");
    eprint!("{}", formatter.render(&trace));

    // SAFETY: `_exit` never returns and skips atexit handlers, which must not
    // run from a signal handler.
    unsafe { libc::_exit(CRASH_EXIT_STATUS) };
}

fn crash(settings: CrashSettings) -> !
{
    if CRASH_SETTINGS.set(settings).is_err() {
        debug!("crash settings already installed");
    }

    // SAFETY: `on_fatal_signal` has the signature `signal` expects for a
    // plain handler.
    let previous = unsafe { libc::signal(libc::SIGSEGV, on_fatal_signal as libc::sighandler_t) };
    if previous == libc::SIG_ERR {
        eprintln!("Failed to install SIGSEGV handler");
        process::exit(1);
    }

    info!("raising SIGSEGV");
    // SAFETY: raising a signal for the calling thread has no preconditions.
    unsafe { libc::raise(libc::SIGSEGV) };

    // Only reached if the handler returned.
    process::exit(1)
}
