use criterion::{black_box, criterion_group, criterion_main, Criterion};
use pbjson::{encode, EncodeOptions, Integer, Number, Object, Value};

fn sample_document() -> Value {
    let mut dimensions = Object::new();
    dimensions.insert("width", Value::Float(Number::from_f64(4.5)));
    dimensions.insert("thickness", Value::Float(Number::from_f64(0.7)));

    let mut doc = Object::new();
    doc.insert("name", Value::Text("the best".into()));
    doc.insert("burned", Value::Bool(false));
    doc.insert("toast", Value::Bool(true));
    doc.insert(
        "toppings",
        Value::Array(vec![
            Value::Text("jelly".into()),
            Value::Text("jam".into()),
            Value::Text("butter".into()),
        ]),
    );
    doc.insert("dimensions", Value::Object(dimensions));
    doc.insert("count", Value::Int(Integer::from(152i64)));
    Value::Object(doc)
}

fn encode_benchmark(c: &mut Criterion) {
    let doc = sample_document();
    let opts = EncodeOptions::new();
    c.bench_function("encode sample document", |b| {
        b.iter(|| encode(black_box(&doc), &opts).unwrap())
    });
}

fn decode_benchmark(c: &mut Criterion) {
    let doc = sample_document();
    let bytes = encode(&doc, &EncodeOptions::new()).unwrap();
    c.bench_function("decode sample document", |b| {
        b.iter(|| pbjson::decode(black_box(&bytes), &pbjson::DecodeOptions::new()).unwrap())
    });
}

criterion_group!(benches, encode_benchmark, decode_benchmark);
criterion_main!(benches);
