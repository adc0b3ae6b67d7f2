use criterion::{black_box, criterion_group, criterion_main, Criterion};
use model3_romset::{byte_swap, copy_region, mirror_region, place_rom, RegionMap, RomInfo};

const ROM_SIZE: usize = 2 * 1024 * 1024;

fn benchmark_placement(c: &mut Criterion) {
    let image: Vec<u8> = (0..ROM_SIZE).map(|i| i as u8).collect();

    // Une puce sur un bus 64 bits (4 puces de 16 bits)
    let interleaved = RomInfo::new("crom", "epr-20092.20", 0, ROM_SIZE)
        .interleaved(2, 8)
        .at_offset(2);
    let contiguous = RomInfo::new("vrom", "mpr-20097.26", 0, ROM_SIZE);

    let mut crom = vec![0u8; ROM_SIZE * 4];
    let mut vrom = vec![0u8; ROM_SIZE];
    let mut regions = RegionMap::new();
    regions.insert("crom", &mut crom).unwrap();
    regions.insert("vrom", &mut vrom).unwrap();

    let mut scratch = image.clone();
    c.bench_function("place_rom_interleaved", |b| {
        b.iter(|| place_rom(black_box(&mut scratch), &interleaved, &mut regions, true).unwrap())
    });

    c.bench_function("place_rom_contiguous", |b| {
        b.iter(|| place_rom(black_box(&mut scratch), &contiguous, &mut regions, true).unwrap())
    });
}

fn benchmark_transforms(c: &mut Criterion) {
    let mut data: Vec<u8> = (0..ROM_SIZE).map(|i| i as u8).collect();

    c.bench_function("byte_swap", |b| b.iter(|| byte_swap(black_box(&mut data))));

    let mut dest = vec![0u8; ROM_SIZE * 2];
    c.bench_function("copy_region", |b| {
        b.iter(|| copy_region(black_box(&mut dest), black_box(ROM_SIZE / 2), black_box(&data)))
    });

    let mut mirrored = vec![0u8; ROM_SIZE * 4];
    mirrored[..ROM_SIZE].copy_from_slice(&data);
    c.bench_function("mirror_region", |b| {
        b.iter(|| mirror_region(black_box(&mut mirrored), black_box(ROM_SIZE)))
    });
}

criterion_group!(benches, benchmark_placement, benchmark_transforms);
criterion_main!(benches);
