use criterion::{Criterion, black_box, criterion_group, criterion_main};
use scenario_forge::compiler::{StepMapper, StepRegistry, parse_scenarios, render_step_module};

const PHRASES: &[&str] = &[
    "open localhost:3000",
    "Login using email admin@example.com and password secret",
    "click Add to cart",
    "verify Order placed",
    "wait for the spinner to disappear",
];

fn benchmark_mapper(c: &mut Criterion) {
    let mapper = StepMapper::default();

    c.bench_function("map_step_phrases", |b| {
        b.iter(|| {
            for phrase in PHRASES {
                black_box(mapper.map(black_box(phrase)));
            }
        })
    });
}

fn benchmark_step_module(c: &mut Criterion) {
    let mut lines = Vec::new();
    for i in 0..50 {
        lines.push(format!("test scenario Flow {}", i));
        for phrase in PHRASES {
            lines.push(format!("{} {}", phrase, i));
        }
    }
    let parsed = parse_scenarios(&lines);
    let mapper = StepMapper::default();
    let registry = StepRegistry::new();

    c.bench_function("render_step_module_250_steps", |b| {
        b.iter(|| {
            black_box(render_step_module(
                black_box(&parsed.scenarios),
                &registry,
                &mapper,
                "http://localhost:3000/crud-app",
            ))
        })
    });
}

criterion_group!(benches, benchmark_mapper, benchmark_step_module);
criterion_main!(benches);
