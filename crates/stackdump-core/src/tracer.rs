//! # Capture Pipeline
//!
//! [`Tracer`] wires the stages together:
//!
//! ```text
//! FrameCapturer -> ModuleLookup -> SymbolResolver -> SourceLineResolver -> Trace
//! ```
//!
//! Every stage is best effort. A frame that cannot be placed in a module keeps
//! only its raw address, a module without symbols yields frames without
//! names, and a translator failure only costs its own module's source lines.
//! Nothing here returns an error to the caller.
//!
//! The whole pipeline runs under the [`SharedState`] lock.

use std::sync::Arc;

use tracing::{debug, trace};

use crate::capture::FrameCapturer;
use crate::config::{MapSnapshot, TraceConfig, TranslatorKind};
use crate::error::StackdumpError;
use crate::lines::{Addr2LineProcess, DwarfTranslator, LineTranslator, SourceLineResolver};
use crate::modules::{LoaderResolver, MapResolver, ModuleLookup, ModuleMap, ResolutionStrategy};
use crate::state::SharedState;
use crate::symbols::{make_symbol_name, SymbolResolver};
use crate::types::{Address, Frame, Trace};

/// Captures and symbolicates call stacks.
///
/// ## Example
///
/// ```rust,no_run
/// use stackdump_core::{TraceConfig, Tracer, TranslatorKind};
///
/// let tracer = Tracer::new(TraceConfig::default().with_translator(TranslatorKind::Dwarf));
/// let trace = tracer.capture(16);
/// print!("{trace}");
/// ```
pub struct Tracer
{
    config: TraceConfig,
    state: Arc<SharedState>,
    translator: Option<Box<dyn LineTranslator>>,
}

impl Tracer
{
    /// A tracer using the process-wide shared state and the translator the
    /// configuration names.
    pub fn new(config: TraceConfig) -> Self
    {
        let translator = build_translator(&config.translator);
        Self {
            config,
            state: SharedState::global(),
            translator,
        }
    }

    /// Use `state` instead of the process-wide instance.
    #[must_use]
    pub fn with_state(mut self, state: Arc<SharedState>) -> Self
    {
        self.state = state;
        self
    }

    /// Replace the configured translator.
    #[must_use]
    pub fn with_translator(mut self, translator: impl LineTranslator + 'static) -> Self
    {
        self.translator = Some(Box::new(translator));
        self
    }

    /// Turn source line resolution off.
    #[must_use]
    pub fn without_translator(mut self) -> Self
    {
        self.translator = None;
        self
    }

    pub fn config(&self) -> &TraceConfig
    {
        &self.config
    }

    pub fn state(&self) -> &Arc<SharedState>
    {
        &self.state
    }

    /// Capture and symbolicate the caller's stack, at most `max_depth` frames.
    ///
    /// Frame 0 is the return address into the function that called this
    /// method.
    #[inline(never)]
    pub fn capture(&self, max_depth: usize) -> Trace
    {
        let trace = self.capture_below(max_depth, Tracer::capture as usize);
        keep_frame(trace)
    }

    /// Capture below the public entry point starting at `entry`.
    #[inline(never)]
    pub(crate) fn capture_below(&self, max_depth: usize, entry: usize) -> Trace
    {
        let _guard = self.state.lock();

        let addresses = FrameCapturer::new(entry).capture(max_depth);
        if addresses.is_empty() {
            if max_depth > 0 {
                debug!("{}", StackdumpError::CaptureUnavailable);
            }
            return Trace::empty();
        }

        self.symbolicate_locked(&addresses)
    }

    /// Symbolicate addresses captured earlier, e.g. in a signal handler.
    pub fn symbolicate(&self, addresses: &[Address]) -> Trace
    {
        let _guard = self.state.lock();
        self.symbolicate_locked(addresses)
    }

    fn symbolicate_locked(&self, addresses: &[Address]) -> Trace
    {
        let lookup = self.module_lookup();
        let symbols = SymbolResolver::new();

        let frames: Vec<Frame> = addresses
            .iter()
            .enumerate()
            .map(|(index, &address)| resolve_frame(index, address, lookup.as_ref(), &symbols))
            .collect();

        let frames = match &self.translator {
            Some(translator) => SourceLineResolver::new(translator.as_ref()).resolve_lines(frames),
            None => frames,
        };

        Trace::from_frames(frames)
    }

    fn module_map(&self) -> Option<Arc<ModuleMap>>
    {
        let map = match self.config.map_snapshot {
            MapSnapshot::PerTrace => ModuleMap::from_proc_self().map(Arc::new),
            MapSnapshot::Cached => self.state.snapshot(),
        };
        match map {
            Ok(map) => Some(map),
            Err(err) => {
                debug!("module map unavailable: {err}");
                None
            }
        }
    }

    fn module_lookup(&self) -> Box<dyn ModuleLookup>
    {
        let map = self.module_map();
        match self.config.strategy {
            ResolutionStrategy::LiveIntrospection => match map {
                Some(map) => Box::new(LoaderResolver::with_map(map)),
                None => Box::new(LoaderResolver::new()),
            },
            ResolutionStrategy::MemoryMapFallback => Box::new(MapResolver::new(
                map.unwrap_or_default(),
                self.config.offset_correction,
            )),
        }
    }
}

impl Default for Tracer
{
    fn default() -> Self
    {
        Self::new(TraceConfig::default())
    }
}

impl std::fmt::Debug for Tracer
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {
        f.debug_struct("Tracer")
            .field("config", &self.config)
            .field("translator", &self.translator.is_some())
            .finish()
    }
}

/// Opaque to the optimiser, so an entry point that returns through it cannot
/// be compiled into a tail call and stays on the stack during the walk.
#[inline(never)]
pub(crate) fn keep_frame(trace: Trace) -> Trace
{
    std::hint::black_box(trace)
}

fn build_translator(kind: &TranslatorKind) -> Option<Box<dyn LineTranslator>>
{
    match kind {
        TranslatorKind::Process { program } => Some(Box::new(Addr2LineProcess::new(program.clone()))),
        TranslatorKind::Dwarf => Some(Box::new(DwarfTranslator::new())),
        TranslatorKind::Disabled => None,
    }
}

fn resolve_frame(index: usize, address: Address, lookup: &dyn ModuleLookup, symbols: &SymbolResolver) -> Frame
{
    let mut frame = Frame::new(index, address);

    let module = match lookup.resolve(address) {
        Ok(module) => Some(module),
        Err(err) => {
            debug!(index, "{err}");
            None
        }
    };
    if let Some(module) = &module {
        if let Some(offset) = module.offset_of(address) {
            frame = frame.with_module(module.path.clone(), offset);
        }
    }

    match symbols.resolve_symbol(address, module.as_ref()) {
        Ok(symbol) => frame = frame.with_symbol(make_symbol_name(symbol.name)),
        Err(err) => trace!(index, "{err}"),
    }

    frame
}
