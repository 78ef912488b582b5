use codec::{deserialize, serialize, DeserializeOptions, SerializeOptions};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use types::{SharedBuffer, SharedList, SharedMap, Value};

fn build_payload() -> Value {
    let root = SharedList::new();
    for i in 0..32 {
        let entry = SharedMap::new();
        entry.insert("seq", Value::Int(i));
        entry.insert("label", Value::Text(format!("entry-{i}")));
        entry.insert("data", Value::Buffer(SharedBuffer::zeroed(64)));
        root.push(Value::Map(entry));
    }
    Value::List(root)
}

fn bench_roundtrip(c: &mut Criterion) {
    let value = build_payload();
    let options = SerializeOptions::default();

    c.bench_function("serialize_nested_32x3", |b| {
        b.iter(|| serialize(black_box(&value), &options).unwrap())
    });

    let bytes = serialize(&value, &options).unwrap();
    c.bench_function("deserialize_nested_32x3", |b| {
        b.iter(|| deserialize(black_box(&bytes), &DeserializeOptions::default()).unwrap())
    });
}

criterion_group!(benches, bench_roundtrip);
criterion_main!(benches);
