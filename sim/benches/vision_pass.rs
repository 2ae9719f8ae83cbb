//! Criterion benchmarks for the vision pass.
//!
//! Benchmarks:
//!   - single footprint recompute over featured terrain, small and large radius
//!   - full step with every agent crossing a tile
//!   - full step with every agent gated (no movement)
//!
//! Run with: cargo bench -p fow_sim --bench vision_pass

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};

use fow_sim::{
    update_visibility, FogConfig, FogWorld, GridBounds, HeightField, Position, TileGrid,
    VisionAgentConfig, VisionFootprint,
};

const FIELD_CELLS: usize = 256;
const CELL_SIZE: f64 = 100.0;

fn featured_config() -> FogConfig {
    let size = FIELD_CELLS as f64 * CELL_SIZE;
    FogConfig {
        bounds: GridBounds::new((0.0, 0.0), (size, size)),
        tile_size: CELL_SIZE as f32,
        ..Default::default()
    }
}

fn featured_field() -> HeightField {
    HeightField::new_with_features(FIELD_CELLS, FIELD_CELLS, CELL_SIZE)
}

// ---------------------------------------------------------------------------
// Benchmark: single recompute
// ---------------------------------------------------------------------------

fn bench_single_recompute(c: &mut Criterion) {
    let mut group = c.benchmark_group("vision_recompute");
    let config = featured_config();
    let field = featured_field();
    let mut grid = match TileGrid::new(config.bounds, config.tile_size, &field) {
        Ok(grid) => grid,
        Err(err) => panic!("bench grid: {err}"),
    };

    for radius in [1024.0f32, 4096.0] {
        let mut footprint = VisionFootprint::new();
        group.bench_function(format!("radius_{radius}"), |b| {
            b.iter(|| {
                update_visibility(
                    &mut grid,
                    &mut footprint,
                    black_box((8_050.0, 12_850.0, 50.0)),
                    black_box(radius),
                    config.blocking_threshold,
                );
            });
        });
    }

    group.finish();
}

// ---------------------------------------------------------------------------
// Benchmark: full step
// ---------------------------------------------------------------------------

fn spawn_agents(count: u32) -> FogWorld {
    let mut fog = match FogWorld::initialize(featured_config(), featured_field()) {
        Ok(fog) => fog,
        Err(err) => panic!("bench world: {err}"),
    };
    let cols = (count as f64).sqrt().ceil() as u32;
    for id in 0..count {
        let x = 1_000.0 + (id % cols) as f64 * 700.0;
        let y = 1_000.0 + (id / cols) as f64 * 700.0;
        let agent = VisionAgentConfig {
            sight_radius: 1024.0,
            ..Default::default()
        };
        if let Err(err) = fog.spawn_agent(id, Position::new(x, y, 50.0), agent) {
            panic!("bench agent: {err}");
        }
    }
    fog.step(0.0);
    fog
}

fn bench_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("vision_step");
    group.sample_size(20);

    group.bench_function("256_agents_moving", |b| {
        b.iter_batched(
            || {
                let mut fog = spawn_agents(256);
                // Shift every agent one tile east
                for id in 0..256u32 {
                    let cols = 16;
                    let x = 1_100.0 + (id % cols) as f64 * 700.0;
                    let y = 1_000.0 + (id / cols) as f64 * 700.0;
                    let _ = fog.set_agent_position(id, x, y, 50.0);
                }
                fog
            },
            |mut fog| {
                fog.step(1.0 / 30.0);
                black_box(fog.grid().visible_tile_count())
            },
            BatchSize::LargeInput,
        );
    });

    let mut idle = spawn_agents(1024);
    group.bench_function("1024_agents_idle", |b| {
        b.iter(|| idle.step(black_box(1.0 / 30.0)));
    });

    group.finish();
}

criterion_group!(benches, bench_single_recompute, bench_step);
criterion_main!(benches);
