//! Tests for the trace model, rendering and symbolication of bare addresses

use std::path::Path;
use std::sync::Arc;

use stackdump_core::types::{Address, Frame, SourceLocation, SymbolName, Trace};
use stackdump_core::{render, SharedState, TraceConfig, TraceFormatter, Tracer, TranslatorKind};

fn sample_trace() -> Trace
{
    Trace::from_frames(vec![
        Frame::new(7, Address::new(0x5555_0000_1a2b))
            .with_module("/opt/demo/bin/demo", 0x1a2b)
            .with_symbol(SymbolName::display_only("demo::f2"))
            .with_location(SourceLocation::new("/opt/demo/src/main.rs", Some(42))),
        Frame::new(3, Address::new(0x5555_0000_1c00))
            .with_module("/opt/demo/bin/demo", 0x1c00)
            .with_symbol(SymbolName::display_only("demo::f1"))
            .with_location(SourceLocation::from_file("/opt/demo/src/main.rs")),
        Frame::new(0, Address::new(0x7f3c_2a1b_2c3d)),
    ])
}

#[test]
fn test_indices_are_renumbered()
{
    let trace = sample_trace();
    let indices: Vec<usize> = trace.iter().map(|frame| frame.index).collect();
    assert_eq!(indices, vec![0, 1, 2]);
}

#[test]
fn test_render_layout()
{
    let text = render(&sample_trace());
    assert_eq!(
        text,
        "#0 0x1a2b demo::f2 (main.rs:42)\n#1 0x1c00 demo::f1\n#2 0x7f3c2a1b2c3d\n"
    );
}

#[test]
fn test_display_matches_render()
{
    let trace = sample_trace();
    assert_eq!(trace.to_string(), render(&trace));
}

#[test]
fn test_show_module_prefix()
{
    let text = TraceFormatter::default().with_module(true).render(&sample_trace());
    let first = text.lines().next().unwrap();
    assert_eq!(first, "#0 demo(+0x1a2b) demo::f2 (main.rs:42)");
}

#[test]
fn test_zero_line_is_not_a_line()
{
    let location = SourceLocation::new("a.rs", Some(0));
    assert_eq!(location.line, None);
}

#[test]
fn test_frame_accessors()
{
    let trace = sample_trace();
    let frame = &trace.frames()[0];
    assert_eq!(frame.module_path(), Some(Path::new("/opt/demo/bin/demo")));
    assert_eq!(frame.module_relative_offset(), Some(0x1a2b));
    assert_eq!(frame.source_line(), Some(42));
    assert!(trace.frames()[2].is_raw());
}

#[test]
fn test_unmapped_address_stays_raw()
{
    let tracer = Tracer::new(TraceConfig::default().with_translator(TranslatorKind::Disabled))
        .with_state(Arc::new(SharedState::new()));

    let trace = tracer.symbolicate(&[Address::new(0x10)]);
    assert_eq!(trace.len(), 1);
    assert!(trace.frames()[0].is_raw());
    assert_eq!(render(&trace), "#0 0x10\n");
}

#[test]
fn test_empty_input_gives_empty_trace()
{
    let tracer = Tracer::new(TraceConfig::default().with_translator(TranslatorKind::Disabled))
        .with_state(Arc::new(SharedState::new()));
    let trace = tracer.symbolicate(&[]);
    assert!(trace.is_empty());
    assert_eq!(render(&trace), "");
}
