use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use imagepipe::{DefaultCodec, Format, Image, ImageCodec, Params};

fn png_fixture(width: u32, height: u32) -> Vec<u8> {
    let inner = image::DynamicImage::ImageRgb8(image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    }));
    DefaultCodec
        .encode(&Image::new(inner, None), Format::Png, 80)
        .unwrap()
}

pub fn formula_resolution(c: &mut Criterion) {
    c.bench_function("formula simple", |b| {
        b.iter(|| imagepipe::geometry::compute_formula(black_box("100-10"), black_box(0.0)))
    });
    c.bench_function("formula chained", |b| {
        b.iter(|| imagepipe::geometry::compute_formula(black_box("x50-8a4r16"), black_box(1920.0)))
    });
}

pub fn pipeline_run(c: &mut Criterion) {
    let fixture = png_fixture(256, 256);

    c.bench_function("decode resize crop 256px", |b| {
        b.iter(|| {
            let mut p = imagepipe::open(fixture.clone())
                .resize(Params::width("x50"))
                .crop(Params::size(64, 64).with_anchor("tl"));
            black_box(p.done().run().unwrap())
        })
    });
}

criterion_group!(benches, formula_resolution, pipeline_run);
criterion_main!(benches);
