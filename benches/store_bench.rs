//! Benchmarks for calstore operations

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use calstore::{
    CalibrationStore, CipherEngine, CipherMode, FileBackend, MemoryBackend, StoreConfig,
};

const PASSPHRASE: &str = "benchmark passphrase";

fn cipher_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("cipher");
    let payload = vec![0x5Au8; 64];

    for mode in [CipherMode::Gcm, CipherMode::LegacyEcb] {
        let mut engine = CipherEngine::new(mode);
        engine.enable(PASSPHRASE).unwrap();
        let sealed = engine.encrypt(&payload).unwrap();

        let label = format!("{:?}", mode);
        group.bench_with_input(BenchmarkId::new("encrypt", &label), &payload, |b, p| {
            b.iter(|| engine.encrypt(black_box(p)).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("decrypt", &label), &sealed, |b, s| {
            b.iter(|| engine.decrypt(black_box(s)).unwrap())
        });
    }
    group.finish();
}

fn store_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("store");

    let mut plain = CalibrationStore::new(MemoryBackend::new());
    plain.begin("calib").unwrap();
    group.bench_function("set_int/memory", |b| {
        b.iter(|| plain.set_value("offset_x", black_box(12)).unwrap())
    });
    group.bench_function("get_int/memory", |b| {
        b.iter(|| plain.get_value(black_box("offset_x"), 0))
    });

    let mut sealed = CalibrationStore::with_config(MemoryBackend::new(), StoreConfig::default());
    sealed.begin("calib").unwrap();
    sealed.enable_encryption(PASSPHRASE).unwrap();
    sealed.set_value("gain", 1.25f32).unwrap();
    group.bench_function("get_float/memory_encrypted", |b| {
        b.iter(|| sealed.get_value(black_box("gain"), 0.0f32))
    });

    let dir = tempfile::TempDir::new().unwrap();
    let mut file = CalibrationStore::new(FileBackend::new(dir.path()));
    file.begin("calib").unwrap();
    for i in 0..32 {
        file.set_value(&format!("key_{:02}", i), i).unwrap();
    }
    group.bench_function("set_int/file_32_entries", |b| {
        b.iter(|| file.set_value("key_00", black_box(7)).unwrap())
    });
    group.bench_function("export_json/file_32_entries", |b| {
        b.iter(|| file.export_to_json().unwrap())
    });

    group.finish();
}

criterion_group!(benches, cipher_benchmarks, store_benchmarks);
criterion_main!(benches);
