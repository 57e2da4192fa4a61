use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};

use blockparty::{classic_fallback, resolve_drag, BoardPiece, PieceId, Puzzle};

fn long_corridor_board() -> Puzzle {
    Puzzle {
        width: 64,
        height: 3,
        pieces: vec![
            BoardPiece::new(PieceId::new(1), 0, 1, 1, 1, true),
            BoardPiece::new(PieceId::new(2), 63, 1, 1, 1, false),
        ],
        goal: (62, 1),
    }
}

fn bench_resolver(c: &mut Criterion) {
    let classic = classic_fallback();
    let corridor = long_corridor_board();

    c.bench_function("resolve_drag/classic_blocked", |b| {
        let piece = classic.piece(PieceId::new(1)).unwrap();
        b.iter(|| resolve_drag(black_box(&classic), black_box(piece), 0.0, 3.0));
    });

    c.bench_function("resolve_drag/classic_one_free_cell", |b| {
        let piece = classic.piece(PieceId::new(7)).unwrap();
        b.iter(|| resolve_drag(black_box(&classic), black_box(piece), 0.0, 3.0));
    });

    c.bench_function("resolve_drag/corridor_62_cells", |b| {
        let piece = corridor.piece(PieceId::new(1)).unwrap();
        b.iter(|| resolve_drag(black_box(&corridor), black_box(piece), 62.0, 0.0));
    });
}

criterion_group!(benches, bench_resolver);
criterion_main!(benches);
