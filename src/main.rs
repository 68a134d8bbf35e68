//! Homestead - headless settlement runner
//!
//! Generates a small seeded world with two settlements, runs the simulation
//! for a number of steps and prints a summary. Useful for watching the
//! autonomous systems without a renderer.

use std::path::PathBuf;

use clap::Parser;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use homestead::agent::AgentRole;
use homestead::city::stockpile::ResourceType;
use homestead::city::structure::StructureKind;
use homestead::core::config::SimulationConfig;
use homestead::core::error::Result;
use homestead::core::types::{Cell, Vec2};
use homestead::simulation::{
    agent_views, road_views, run_simulation_tick, save_to_file, settlement_views,
    structure_views, SimulationEvent, SimulationState,
};
use homestead::spatial::terrain::TerrainGrid;
use homestead::spatial::tile::Tile;

/// Run a headless settlement simulation
#[derive(Parser, Debug)]
#[command(name = "homestead")]
#[command(about = "Run a seeded settlement simulation and print a summary")]
struct Args {
    /// Number of simulation steps
    #[arg(long, default_value_t = 600)]
    steps: u64,

    /// Seconds of simulated time per step
    #[arg(long, default_value_t = 0.1)]
    dt: f32,

    /// Random seed for deterministic runs
    #[arg(long)]
    seed: Option<u64>,

    /// TOML file overriding configuration defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the final state as JSON to this path
    #[arg(long)]
    save: Option<PathBuf>,

    /// Grid width in cells
    #[arg(long, default_value_t = 64)]
    width: i32,

    /// Grid height in cells
    #[arg(long, default_value_t = 48)]
    height: i32,

    /// Print every simulation event as it happens
    #[arg(long, short = 'v')]
    verbose: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();
    let seed = args.seed.unwrap_or_else(rand::random);

    let config = match &args.config {
        Some(path) => SimulationConfig::load_from_toml(path)?,
        None => SimulationConfig::default(),
    };
    config.validate()?;

    tracing::info!(
        "Generating {}x{} world with seed {}",
        args.width,
        args.height,
        seed
    );
    let grid = demo_terrain(&config, args.width, args.height, seed)?;
    let mut state = SimulationState::new(config, grid, seed);
    populate(&mut state);

    let mut counts = EventCounts::default();
    for _ in 0..args.steps {
        for event in run_simulation_tick(&mut state, args.dt) {
            if args.verbose {
                println!("[{:>5}] {:?}", state.tick, event);
            }
            counts.record(&event);
        }
    }

    print_summary(&state, &counts);

    if let Some(path) = &args.save {
        save_to_file(&state, path)?;
    }
    Ok(())
}

/// Grass world with a few forest, water and mountain blobs
fn demo_terrain(config: &SimulationConfig, width: i32, height: i32, seed: u64) -> Result<TerrainGrid> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut tiles = vec![Tile::Grass; (width.max(1) * height.max(1)) as usize];

    let blobs = [
        (Tile::Forest, 6, 5),
        (Tile::Water, 2, 4),
        (Tile::Mountain, 2, 3),
    ];
    for (tile, count, radius) in blobs {
        for _ in 0..count {
            let cx = rng.gen_range(0..width.max(1));
            let cy = rng.gen_range(0..height.max(1));
            let r = rng.gen_range(2..=radius);
            for dy in -r..=r {
                for dx in -r..=r {
                    let (x, y) = (cx + dx, cy + dy);
                    if x < 0 || y < 0 || x >= width || y >= height || dx * dx + dy * dy > r * r {
                        continue;
                    }
                    tiles[(y * width + x) as usize] = tile;
                }
            }
        }
    }

    TerrainGrid::from_tiles(width, height, config.cell_size, config.edge_buffer, tiles)
}

fn populate(state: &mut SimulationState) {
    let w = state.grid.world_width();
    let h = state.grid.world_height();
    let sites = [
        ("Ashford", Vec2::new(w * 0.3, h * 0.5)),
        ("Brookhollow", Vec2::new(w * 0.7, h * 0.5)),
    ];

    for (name, pos) in sites {
        // Clear a little ground so the founding cell is reachable
        let center = state.grid.world_to_cell(pos);
        for dy in -2..=2 {
            for dx in -2..=2 {
                let cell = Cell::new(center.col + dx, center.row + dy);
                if state.grid.tile_at(cell).is_some_and(|t| !t.is_passable()) {
                    state.grid.set_tile(cell, Tile::Grass);
                }
            }
        }

        let id = state.add_settlement(name, pos);
        let home = state.settlements[id].position;
        let stock = &mut state.settlements[id].stockpile;
        stock.add(ResourceType::Wood, 150);
        stock.add(ResourceType::Stone, 60);
        stock.add(ResourceType::Food, 40);

        state.spawn_agent(id, AgentRole::builder(), home);
        state.spawn_agent(id, AgentRole::builder(), home);
        for _ in 0..3 {
            state.spawn_agent(id, AgentRole::worker(), home);
        }
        state.enqueue_build(id, StructureKind::Market);
        state.enqueue_build(id, StructureKind::House);
    }
}

#[derive(Debug, Default)]
struct EventCounts {
    structures: usize,
    failed: usize,
    roads: usize,
    spawned: usize,
    delivered: u32,
    trades: usize,
    regrown: usize,
}

impl EventCounts {
    fn record(&mut self, event: &SimulationEvent) {
        match event {
            SimulationEvent::StructureCompleted { .. } => self.structures += 1,
            SimulationEvent::ConstructionFailed { .. } => self.failed += 1,
            SimulationEvent::RoadCompleted { .. } => self.roads += 1,
            SimulationEvent::AgentSpawned { .. } => self.spawned += 1,
            SimulationEvent::ResourcesDelivered { amount, .. } => self.delivered += amount,
            SimulationEvent::TradeCompleted { .. } => self.trades += 1,
            SimulationEvent::ForestRegrown { cells, .. } => self.regrown += cells,
            _ => {}
        }
    }
}

fn print_summary(state: &SimulationState, counts: &EventCounts) {
    println!("\n=== HOMESTEAD ===");
    println!("Tick {} ({:.1}s simulated)", state.tick, state.elapsed);
    println!();

    for view in settlement_views(state) {
        println!(
            "{}: population {}/{}, traders {}, housing {:?}, queued {}, road needs {}",
            view.name,
            view.population,
            view.capacity,
            view.traders,
            view.housing,
            view.queued_builds,
            view.road_needs
        );
        let stock: Vec<String> = view
            .resources
            .iter()
            .map(|(r, n)| format!("{} {}", r.name(), n))
            .collect();
        println!("  stock: {}", stock.join(", "));
    }

    let structures = structure_views(state);
    let roads = road_views(state);
    let finished = roads.iter().filter(|r| r.completion >= 1.0).count();
    println!();
    println!(
        "Structures: {}  Roads: {} ({} finished)  Agents: {}",
        structures.len(),
        roads.len(),
        finished,
        agent_views(state).len()
    );
    println!(
        "Events: {} built, {} failed, {} roads, {} spawned, {} delivered, {} trades, {} forest regrown",
        counts.structures,
        counts.failed,
        counts.roads,
        counts.spawned,
        counts.delivered,
        counts.trades,
        counts.regrown
    );

    let recent: Vec<_> = state.messages.iter().rev().take(5).collect();
    if !recent.is_empty() {
        println!();
        println!("Recent messages:");
        for message in recent.into_iter().rev() {
            println!("  [{}] {}", message.tick, message.text);
        }
    }
}
