use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};

use presence::storage::{Value, ValueRef};
use presence::{Policies, Presence, ScanNull};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize)]
struct Patch {
    #[serde(default, skip_serializing_if = "Presence::is_zero_for_omission")]
    name: Presence<String>,
    #[serde(default, skip_serializing_if = "Presence::is_zero_for_omission")]
    age: Presence<i16>,
    #[serde(default, skip_serializing_if = "Presence::is_zero_for_omission")]
    tags: Presence<Vec<String>>,
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let value = Presence::from_value(42i64);
    c.bench_function("marshal value", |b| b.iter(|| black_box(&value).marshal().unwrap()));
    let null: Presence<i64> = Presence::null();
    c.bench_function("marshal null", |b| b.iter(|| black_box(&null).marshal().unwrap()));

    let mut target: Presence<i64> = Presence::new_unset();
    c.bench_function("unmarshal value", |b| {
        b.iter(|| target.unmarshal(black_box(b"123456")).unwrap())
    });

    let patch = Patch {
        name: Presence::new_unset(),
        age: Presence::from_value(30),
        tags: Presence::from_value(vec!["a".into(), "b".into()]),
    };
    c.bench_function("record with omission", |b| {
        b.iter(|| serde_json::to_string(black_box(&patch)).unwrap())
    });
    let text = r#"{"age":30,"tags":["a","b"]}"#;
    c.bench_function("record decode", |b| {
        b.iter(|| serde_json::from_str::<Patch>(black_box(text)).unwrap())
    });

    let policies = Policies::default().with_scan_null(ScanNull::AsUnset);
    let mut small: Presence<i16> = Presence::new_unset();
    c.bench_function("scan i16", |b| {
        b.iter(|| small.scan_with(black_box(ValueRef::Integer(1234)), &policies).unwrap())
    });
    c.bench_function("scan null", |b| {
        b.iter(|| small.scan_with(black_box(ValueRef::Null), &policies).unwrap())
    });
    let stored = Value::Text(r#"["x","y","z"]"#.into());
    let mut opaque: Presence<Vec<String>> = Presence::new_unset();
    c.bench_function("scan opaque", |b| {
        b.iter(|| opaque.scan_with(black_box(ValueRef::from(&stored)), &policies).unwrap())
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
