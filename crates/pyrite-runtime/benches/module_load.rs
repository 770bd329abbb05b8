//! Load/unload throughput over the software reference device

use criterion::{criterion_group, criterion_main, Criterion};
use pyrite_device::{DeviceMemory, SoftDevice};
use pyrite_image::{Image, ImageBuilder};
use pyrite_runtime::Runtime;
use std::sync::Arc;

fn build_image(code_bytes: usize) -> Vec<u8> {
    let mut b = ImageBuilder::new(0xc4);
    b.add_kernel("vecAdd", &vec![0x42u8; code_bytes], &[8, 8, 8, 4]);
    b.add_global("lookup_table", 256);
    b.build().to_bytes()
}

fn bench_parse(c: &mut Criterion) {
    let bytes = build_image(64 * 1024);

    c.bench_function("image_parse_64k", |b| {
        b.iter(|| Image::parse(&bytes).unwrap())
    });
}

fn bench_load_unload(c: &mut Criterion) {
    let device = Arc::new(SoftDevice::new(0x01c4, 256 * 1024 * 1024));
    let rt = Runtime::new(vec![device as Arc<dyn DeviceMemory>]);
    rt.context_create(0).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bench.pyki");
    std::fs::write(&path, build_image(64 * 1024)).unwrap();

    c.bench_function("module_load_unload_64k", |b| {
        b.iter(|| {
            let module = rt.module_load(&path).unwrap();
            rt.module_unload(module).unwrap();
        })
    });
}

criterion_group!(benches, bench_parse, bench_load_unload);
criterion_main!(benches);
