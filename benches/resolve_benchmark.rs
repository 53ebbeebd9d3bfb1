use std::fs;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tempfile::TempDir;

use fileserver::resolver::{decode_uri, UriResolver};

fn fixture() -> (TempDir, UriResolver) {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("file/a/b/c")).unwrap();
    fs::write(dir.path().join("file/readme.txt"), b"0123456789").unwrap();
    fs::write(dir.path().join("file/a/b/c/deep.txt"), b"deep").unwrap();
    let resolver = UriResolver::new("/file/", dir.path()).unwrap();
    (dir, resolver)
}

fn resolve_accepted_benchmark(c: &mut Criterion) {
    let (_dir, resolver) = fixture();
    let mut group = c.benchmark_group("resolve_accepted");

    let uris = [
        ("shallow", "/file/readme.txt"),
        ("deep", "/file/a/b/c/deep.txt"),
        ("missing", "/file/a/b/c/missing.txt"),
        ("directory", "/file/a/b/"),
    ];

    for (name, uri) in uris.iter() {
        group.bench_with_input(BenchmarkId::from_parameter(name), uri, |b, uri| {
            b.iter(|| resolver.resolve(black_box(uri), 0).unwrap());
        });
    }

    group.finish();
}

fn resolve_rejected_benchmark(c: &mut Criterion) {
    let (_dir, resolver) = fixture();
    let mut group = c.benchmark_group("resolve_rejected");

    let uris = [
        ("prefix", "/other/readme.txt"),
        ("traversal", "/file/../secret"),
        ("encoded_traversal", "/file/%2e%2e/secret"),
        ("insecure", "/file/%3Cscript%3E"),
    ];

    for (name, uri) in uris.iter() {
        group.bench_with_input(BenchmarkId::from_parameter(name), uri, |b, uri| {
            b.iter(|| resolver.resolve(black_box(uri), 0).unwrap_err());
        });
    }

    group.finish();
}

fn decode_uri_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_uri");

    let uris = [
        ("plain", "/file/readme.txt"),
        ("utf8", "/file/%E6%96%87%E6%A1%A3/%E8%AF%B4%E6%98%8E.txt"),
        ("latin1", "/file/caf%E9.txt"),
    ];

    for (name, uri) in uris.iter() {
        group.bench_with_input(BenchmarkId::from_parameter(name), uri, |b, uri| {
            b.iter(|| decode_uri(black_box(uri)));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    resolve_accepted_benchmark,
    resolve_rejected_benchmark,
    decode_uri_benchmark
);
criterion_main!(benches);
