use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use fileserver::request::Request;

fn simple_request_parse_benchmark(c: &mut Criterion) {
    let request = b"GET /file/readme.txt HTTP/1.1\r\nHost: localhost:8088\r\nUser-Agent: Test\r\n\r\n";

    c.bench_function("simple_request_parse", |b| {
        b.iter(|| {
            let _ = Request::try_from(black_box(request), 0).unwrap();
        });
    });
}

fn browser_request_parse_benchmark(c: &mut Criterion) {
    let request = b"GET /file/docs/guide.md?download=1 HTTP/1.1\r\n\
                    Host: localhost:8088\r\n\
                    User-Agent: Mozilla/5.0 (Windows NT 10.0; Win64; x64)\r\n\
                    Accept: text/html,application/xhtml+xml\r\n\
                    Accept-Language: en-US,en;q=0.9\r\n\
                    Accept-Encoding: gzip, deflate, br\r\n\
                    Connection: keep-alive\r\n\
                    Upgrade-Insecure-Requests: 1\r\n\
                    \r\n";

    c.bench_function("browser_request_parse", |b| {
        b.iter(|| {
            let _ = Request::try_from(black_box(request), 0).unwrap();
        });
    });
}

fn request_parse_different_methods_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("request_parse_methods");

    let requests = [
        ("GET", b"GET /file/ HTTP/1.1\r\nHost: localhost\r\n\r\n".as_slice()),
        ("HEAD", b"HEAD /file/ HTTP/1.1\r\nHost: localhost\r\n\r\n".as_slice()),
        (
            "POST",
            b"POST /file/ HTTP/1.1\r\nHost: localhost\r\nContent-Length: 0\r\n\r\n".as_slice(),
        ),
    ];

    for (method, request) in requests.iter() {
        group.bench_with_input(BenchmarkId::from_parameter(method), request, |b, request| {
            b.iter(|| {
                let _ = Request::try_from(black_box(request), 0).unwrap();
            });
        });
    }

    group.finish();
}

fn request_parse_different_path_lengths_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("request_parse_path_length");

    let paths = [
        ("short", "/file/"),
        ("medium", "/file/path/to/resource.txt"),
        ("long", "/file/very/long/path/to/some/resource/with/many/segments/and/a/query?param1=value1&param2=value2"),
        ("encoded", "/file/%E6%96%87%E6%A1%A3/%E8%AF%B4%E6%98%8E%20%E4%B9%A6.txt"),
    ];

    for (name, path) in paths.iter() {
        let request = format!("GET {} HTTP/1.1\r\nHost: localhost\r\n\r\n", path);
        group.bench_with_input(BenchmarkId::from_parameter(name), &request, |b, request| {
            b.iter(|| {
                let _ = Request::try_from(black_box(request.as_bytes()), 0).unwrap();
            });
        });
    }

    group.finish();
}

fn request_parse_invalid_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("request_parse_invalid");

    let requests = [
        ("no_version", b"GET /file/\r\n\r\n".as_slice()),
        ("bad_version", b"GET /file/ HTTP/2.0\r\n\r\n".as_slice()),
        ("not_utf8", b"GET /file/\xff HTTP/1.1\r\n\r\n".as_slice()),
    ];

    for (name, request) in requests.iter() {
        group.bench_with_input(BenchmarkId::from_parameter(name), request, |b, request| {
            b.iter(|| {
                let _ = Request::try_from(black_box(request), 0).unwrap_err();
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    simple_request_parse_benchmark,
    browser_request_parse_benchmark,
    request_parse_different_methods_benchmark,
    request_parse_different_path_lengths_benchmark,
    request_parse_invalid_benchmark
);
criterion_main!(benches);
