/// Benchmarks for the inbound hot path: tokenizing frames and running them through the engine.
use std::sync::Arc;

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use serde_json::{Map, Value};
use ws_hypermedia::Result;
use ws_hypermedia::config::{Config, SecurityConfig};
use ws_hypermedia::engine::Engine;
use ws_hypermedia::protocol::{FrameLimits, parse};
use ws_hypermedia::render::{
    Animation, AnimationState, Keyframes, PlayState, Position, Renderer, Transition,
};
use ws_hypermedia::security::validate_json;

/// Renderer that accepts everything and resolves every id.
struct NullRenderer;

impl Renderer for NullRenderer {
    type Element = ();

    fn resolve_element(&self, _id: &str) -> Option<()> {
        Some(())
    }
    fn set_inner_html(&self, _element: &(), _html: &str) -> Result<()> {
        Ok(())
    }
    fn set_outer_html(&self, _element: &(), _html: &str) -> Result<()> {
        Ok(())
    }
    fn insert_adjacent(&self, _element: &(), _position: Position, _html: &str) -> Result<()> {
        Ok(())
    }
    fn remove_element(&self, _element: &()) -> Result<()> {
        Ok(())
    }
    fn add_classes(&self, _element: &(), _names: &[&str]) -> Result<()> {
        Ok(())
    }
    fn remove_classes(&self, _element: &(), _names: &[&str]) -> Result<()> {
        Ok(())
    }
    fn toggle_classes(&self, _element: &(), _names: &[&str]) -> Result<()> {
        Ok(())
    }
    fn set_attribute(&self, _element: &(), _name: &str, _value: &str) -> Result<()> {
        Ok(())
    }
    fn remove_attribute(&self, _element: &(), _name: &str) -> Result<()> {
        Ok(())
    }
    fn set_style_property(&self, _element: &(), _name: &str, _value: &str) -> Result<()> {
        Ok(())
    }
    fn remove_style_property(&self, _element: &(), _name: &str) -> Result<()> {
        Ok(())
    }
    fn dispatch_event(
        &self,
        _element: &(),
        _event_type: &str,
        _data: Option<&Map<String, Value>>,
    ) -> Result<()> {
        Ok(())
    }
    fn set_form_value(&self, _element: &(), _value: &str) -> Result<()> {
        Ok(())
    }
    fn set_checked(&self, _element: &(), _checked: bool) -> Result<()> {
        Ok(())
    }
    fn set_selected(&self, _element: &(), _values: &[&str]) -> Result<()> {
        Ok(())
    }
    fn set_animation(&self, _element: &(), _animation: &Animation) -> Result<()> {
        Ok(())
    }
    fn set_transition(&self, _element: &(), _transition: &Transition) -> Result<()> {
        Ok(())
    }
    fn remove_animation(&self, _element: &()) -> Result<()> {
        Ok(())
    }
    fn set_animation_play_state(&self, _element: &(), _state: PlayState) -> Result<()> {
        Ok(())
    }
    fn animation_state(&self, _element: &()) -> Result<AnimationState> {
        Ok(AnimationState::idle())
    }
    fn define_keyframes(&self, _element: &(), _name: &str, _keyframes: &Keyframes) -> Result<()> {
        Ok(())
    }
}

const FRAMES: [(&str, &str); 5] = [
    ("update", "update|content|<p>Hello, world</p>"),
    ("addClass", "addClass|banner|visible highlighted active"),
    ("escaped", "setAttr|avatar|src|~https://example.com/a.png?size=64|128~"),
    (
        "trigger",
        r#"trigger|cart|itemAdded|{"sku":"A-12","qty":2,"meta":{"source":"push"}}"#,
    ),
    ("custom", "subscribe|room|123"),
];

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("protocol/parse");
    let limits = FrameLimits::default();

    for (name, frame) in FRAMES {
        group.throughput(Throughput::Bytes(frame.len() as u64));
        group.bench_function(name, |b| {
            b.iter(|| parse(std::hint::black_box(frame), &limits).expect("frame should parse"));
        });
    }

    let large = format!("update|content|{}", "<li>row</li>".repeat(4096));
    group.throughput(Throughput::Bytes(large.len() as u64));
    group.bench_function("update/48KiB", |b| {
        b.iter(|| parse(std::hint::black_box(&large), &limits).expect("frame should parse"));
    });

    group.finish();
}

fn bench_engine(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine/process");

    let plain = Engine::new(&Config::default(), Arc::new(NullRenderer));
    let validating = Engine::new(
        &Config::builder()
            .security(SecurityConfig::builder().enable_json_validation(true).build())
            .build(),
        Arc::new(NullRenderer),
    );

    for (name, frame) in FRAMES {
        group.throughput(Throughput::Bytes(frame.len() as u64));
        group.bench_function(name, |b| {
            b.iter(|| plain.process(std::hint::black_box(frame)));
        });
    }

    let (_, trigger) = FRAMES[3];
    group.bench_function("trigger/validated", |b| {
        b.iter(|| validating.process(std::hint::black_box(trigger)));
    });

    group.finish();
}

fn bench_json(c: &mut Criterion) {
    let mut group = c.benchmark_group("security/validate_json");

    let payload = r#"{"user":{"id":42,"roles":["admin","editor"]},"items":[{"sku":"A-12","qty":2},{"sku":"B-7","qty":1}]}"#;
    group.throughput(Throughput::Bytes(payload.len() as u64));
    group.bench_function("nested", |b| {
        b.iter(|| validate_json(std::hint::black_box(payload), 1024 * 1024).expect("payload is clean"));
    });

    group.finish();
}

criterion_group!(benches, bench_parse, bench_engine, bench_json);
criterion_main!(benches);
