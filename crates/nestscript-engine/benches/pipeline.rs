// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Compile and execute throughput for the source-to-IR-to-VM pipeline.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

use nestscript_engine::compiler::parse_module;
use nestscript_engine::{Engine, HostContext, VmConfig};

const FIB: &str = "function fib(n) { if (n < 2) { return n; } return fib(n - 1) + fib(n - 2); }\n\
                   r = fib(15);";

const LOOP: &str = "var o = { total: 0, items: [] };\n\
                    for (var i = 0; i < 2000; i++) { o.total += i % 7; o.items[i] = i * 2; }";

fn engine() -> Engine {
    Engine::with_host(HostContext::new(), VmConfig::default())
}

fn bench_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile");
    for (name, source) in [("fib", FIB), ("loop", LOOP)] {
        group.bench_with_input(BenchmarkId::from_parameter(name), source, |b, source| {
            b.iter(|| engine().compile(black_box(source)))
        });
    }
    group.finish();
}

fn bench_assemble(c: &mut Criterion) {
    let text = engine().compile(LOOP).map(|m| m.to_string()).unwrap_or_default();
    c.bench_function("assemble/loop", |b| b.iter(|| parse_module(black_box(&text))));
}

fn bench_execute(c: &mut Criterion) {
    let mut group = c.benchmark_group("execute");
    for (name, source) in [("fib", FIB), ("loop", LOOP)] {
        let Ok(module) = engine().compile(source) else {
            continue;
        };
        group.bench_with_input(BenchmarkId::from_parameter(name), &module, |b, module| {
            b.iter(|| engine().execute(black_box(module)))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_compile, bench_assemble, bench_execute);
criterion_main!(benches);
