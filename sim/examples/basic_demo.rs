//! Basic demonstration of the fog of war engine.
//!
//! Run with: cargo run --example basic_demo

use fow_sim::{FogConfig, FogWorld, GridBounds, HeightField, Position, VisionAgentConfig};

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    println!("=== Fog of War - Visibility Demo ===\n");

    // 64x64 field of 100-unit cells with a ridge and two hills
    let field = HeightField::new_with_features(64, 64, 100.0);
    let config = FogConfig {
        bounds: GridBounds::new((0.0, 0.0), (6400.0, 6400.0)),
        tile_size: 100.0,
        minimap_resolution: (16, 16),
        ..Default::default()
    };
    let mut fog = match FogWorld::initialize(config, field) {
        Ok(fog) => fog,
        Err(err) => {
            eprintln!("failed to initialize: {err}");
            return;
        }
    };

    // Scouts walking east across the ridge
    for id in 0..4 {
        let y = 800.0 + id as f64 * 1400.0;
        let agent = VisionAgentConfig {
            sight_radius: 1024.0,
            ..Default::default()
        };
        if let Err(err) = fog.spawn_agent(id, Position::new(300.0, y, 50.0), agent) {
            eprintln!("failed to spawn agent {id}: {err}");
        }
    }

    println!("Running 120 steps...\n");
    for step in 0..120u32 {
        for id in 0..4u32 {
            let x = 300.0 + step as f64 * 45.0;
            let y = 800.0 + id as f64 * 1400.0;
            // Ids are all registered above
            let _ = fog.set_agent_position(id, x, y, 50.0);
        }
        fog.step(1.0 / 30.0);

        if (step + 1) % 20 == 0 {
            let stats = fog.vision_stats();
            println!(
                "--- Step {} (t={:.2}s) --- visible tiles: {} recomputed: {}",
                fog.current_tick(),
                fog.current_time(),
                fog.grid().visible_tile_count(),
                stats.last_pass_recomputes
            );
            print_fog(&fog);
        }
    }

    println!("\n=== Final State ===\n");
    let snapshot = fog.snapshot();
    for agent in &snapshot.agents {
        println!(
            "  Agent {}: pos=({:.0}, {:.0}) revealing {} tiles",
            agent.id, agent.x, agent.y, agent.revealed_tiles
        );
    }
    println!(
        "  Minimap units: {}",
        fog.occupancy().total_count()
    );
}

/// Print the visibility grid, one character per 2x2 tiles.
fn print_fog(fog: &FogWorld) {
    let grid = fog.grid();
    for j in (0..grid.resolution_y).step_by(2).rev() {
        let row: String = (0..grid.resolution_x)
            .step_by(2)
            .map(|i| {
                let (x, y) = grid.tile_ij_to_center_world(fow_sim::TileIJ::new(i, j));
                if fog.is_world_location_visible(x, y) {
                    '.'
                } else {
                    '#'
                }
            })
            .collect();
        println!("  {row}");
    }
}
