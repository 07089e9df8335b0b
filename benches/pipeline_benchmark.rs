use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};
use isni_convert_rs::resources::ResourceSelector;
use isni_convert_rs::test_support::{generate_dataset, term_table};
use isni_convert_rs::{Converter, ConverterConfig, Resource, Scope};
use std::hint::black_box;

fn benchmark_conversion(c: &mut Criterion) {
    let mut group = c.benchmark_group("conversion");
    let converter = Converter::with_encoder(ConverterConfig::default(), term_table())
        .expect("default config is valid");

    for count in [1_000u32, 10_000] {
        let dataset = generate_dataset(count, 42);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("records", count), &dataset, |b, dataset| {
            b.iter_batched(
                || dataset.records.clone(),
                |records| {
                    let conversion = converter
                        .convert(records, &Scope::all(), &dataset.resources)
                        .expect("conversion");
                    black_box(conversion.summary)
                },
                BatchSize::LargeInput,
            )
        });
    }
    group.finish();
}

fn benchmark_resource_selection(c: &mut Criterion) {
    let resources: Vec<Resource> = (0..500)
        .map(|i| {
            Resource::new(format!("Title {}", i % 120))
                .with_role(["author", "contributor", "subject"][i % 3])
                .with_language(["fin", "swe", "eng"][i % 3])
                .with_date(&format!("{}", 1950 + i % 70))
        })
        .collect();
    let languages = vec!["fin".to_string(), "swe".to_string()];
    let selector = ResourceSelector::new(10);

    c.bench_function("select_500_resources", |b| {
        b.iter_batched(
            || resources.clone(),
            |resources| black_box(selector.select(resources, &languages)),
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, benchmark_conversion, benchmark_resource_selection);
criterion_main!(benches);
