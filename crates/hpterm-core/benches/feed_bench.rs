use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use hpterm_core::{NullSurface, Parser, RecordingLink, SessionConfig, Terminal};

fn fnv1a64(bytes: &[u8]) -> u64 {
    const FNV_OFFSET: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;
    let mut hash = FNV_OFFSET;
    for &b in bytes {
        hash ^= u64::from(b);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

struct Corpus {
    id: &'static str,
    bytes: Vec<u8>,
}

fn corpora() -> Vec<Corpus> {
    let listing: Vec<u8> = (0..200)
        .flat_map(|i| format!("{i:04} READY  PROGRAM LOADED FROM DISC UNIT 7\r\n").into_bytes())
        .collect();

    let mut plot = b"\x1b*dA\x1b*m1a2X".to_vec();
    for i in 0..400 {
        plot.extend_from_slice(format!("\x1b*pf{},{}a{},{}bZ", i, i * 2, 511 - i, 389 - i).as_bytes());
    }

    let mut binary_plot = b"\x1b*pi".to_vec();
    for i in 0u8..250 {
        binary_plot.extend_from_slice(&[0x20 | (i & 0x0F), 0x20 | (i & 0x1F)]);
        binary_plot.extend_from_slice(&[0x20 | (i & 0x07), 0x20 | ((i >> 3) & 0x1F)]);
    }
    binary_plot.push(b'Z');

    let mut editing = Vec::new();
    for row in 0..24 {
        editing.extend_from_slice(
            format!("\x1b&a{row}r0C\x1bK\x1b&dBROW {row:02}\x1b&d@\x1b[2P\x1bL\x1bM").as_bytes(),
        );
    }

    vec![
        Corpus {
            id: "listing_v1",
            bytes: listing,
        },
        Corpus {
            id: "ascii_plot_v1",
            bytes: plot,
        },
        Corpus {
            id: "binary_plot_v1",
            bytes: binary_plot,
        },
        Corpus {
            id: "editing_v1",
            bytes: editing,
        },
    ]
}

fn parser_throughput_bench(c: &mut Criterion) {
    let mut group = c.benchmark_group("parser_throughput");
    for corpus in corpora() {
        eprintln!(
            "[hpterm-core bench] corpus={} bytes={} fnv1a64={:016x}",
            corpus.id,
            corpus.bytes.len(),
            fnv1a64(&corpus.bytes)
        );
        group.throughput(Throughput::Bytes(corpus.bytes.len() as u64));

        group.bench_with_input(
            BenchmarkId::new("advance_count", corpus.id),
            &corpus.bytes,
            |b, bytes| {
                let mut parser = Parser::new();
                b.iter(|| {
                    let mut count = 0u64;
                    for &byte in black_box(bytes.as_slice()) {
                        if parser.advance(byte).is_some() {
                            count += 1;
                        }
                    }
                    black_box(count);
                });
            },
        );
    }
    group.finish();
}

fn terminal_feed_bench(c: &mut Criterion) {
    let mut group = c.benchmark_group("terminal_feed");
    for corpus in corpora() {
        group.throughput(Throughput::Bytes(corpus.bytes.len() as u64));
        group.bench_with_input(
            BenchmarkId::new("feed", corpus.id),
            &corpus.bytes,
            |b, bytes| {
                let mut terminal = Terminal::with_config(
                    SessionConfig::default(),
                    RecordingLink::new(),
                    NullSurface,
                );
                b.iter(|| {
                    terminal.feed(black_box(bytes));
                    black_box(terminal.screen().cursor().x);
                });
            },
        );
    }
    group.finish();
}

criterion_group!(benches, parser_throughput_bench, terminal_feed_bench);
criterion_main!(benches);
