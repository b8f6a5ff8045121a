//! Headless Movement Runner
//!
//! Deploys two fleets on opposite flanks, sends each unit to the mirrored
//! cell on the far side and ticks until everyone is idle. Prints a summary
//! (optionally JSON) of how movement went.

use clap::{Parser, ValueEnum};
use serde::Serialize;
use war_movement::battle::movement::{
    FullSpaceMovementRules, GroundMovementRules, SimpleMovementRules, SpaceMovementRules,
};
use war_movement::battle::{
    FreeFormMovementHandler, Location, MovementHandler, MovementRules, PlacementGrid, Structure,
    TickSummary, UnitClass, WarMovementHandler, WarUnit, DEFAULT_RETREAT_MARGIN,
};
use war_movement::core::{MovementConfig, PlayerId, Result, UnitId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "kebab-case")]
enum Arena {
    Simple,
    Ground,
    Space,
    FullSpace,
    FreeForm,
}

/// Headless Movement Runner - two fleets crossing the arena
#[derive(Parser, Debug)]
#[command(name = "battle_runner")]
#[command(about = "Run a movement-only battle and report how units got across")]
struct Args {
    /// Movement rules to run with
    #[arg(long, value_enum, default_value_t = Arena::FullSpace)]
    arena: Arena,

    /// Arena width in cells
    #[arg(long, default_value_t = 60)]
    width: i32,

    /// Arena height in cells
    #[arg(long, default_value_t = 40)]
    height: i32,

    /// Units per side
    #[arg(long, default_value_t = 12)]
    units: usize,

    /// Maximum ticks before giving up
    #[arg(long, default_value_t = 2000)]
    max_ticks: u64,

    /// Movement config TOML (defaults apply to missing keys)
    #[arg(long)]
    config: Option<String>,

    /// Random seed (overrides the config seed)
    #[arg(long)]
    seed: Option<u64>,

    /// Output JSON format
    #[arg(long)]
    json: bool,

    /// Verbose output (per-tick counters)
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Serialize)]
struct RunResult {
    arena: Arena,
    units: usize,
    ticks: u64,
    arrived: usize,
    still_moving: usize,
    plans_applied: usize,
    plans_retried: usize,
    plans_dropped: usize,
    replans: usize,
    holds: usize,
    seed: Option<u64>,
}

impl RunResult {
    fn new(arena: Arena, units: usize, seed: Option<u64>) -> Self {
        Self {
            arena,
            units,
            ticks: 0,
            arrived: 0,
            still_moving: 0,
            plans_applied: 0,
            plans_retried: 0,
            plans_dropped: 0,
            replans: 0,
            holds: 0,
            seed,
        }
    }

    fn record(&mut self, summary: &TickSummary) {
        self.arrived += summary.arrived;
        self.plans_applied += summary.planning.applied;
        self.plans_retried += summary.planning.retried;
        self.plans_dropped += summary.planning.dropped;
        self.replans += summary.replanning;
        self.holds += summary.holding;
    }
}

/// Mixed fleet composition, largest ships first
fn fleet_class(index: usize, arena: Arena) -> UnitClass {
    match arena {
        Arena::Ground => UnitClass::GroundVehicle,
        _ => match index % 6 {
            0 => UnitClass::Battleship,
            1 | 2 => UnitClass::Cruiser,
            _ => UnitClass::Fighter,
        },
    }
}

/// Free cells in growing squares around `center`, nearest ring first
///
/// Picked cells keep one empty cell between each other so large ships
/// start outside each other's exclusion zone.
fn deployment_cells<R: MovementRules>(
    handler: &WarMovementHandler<R>,
    probe: UnitId,
    center: Location,
    count: usize,
) -> Vec<Location> {
    let Some(pathfinding) = handler.pathfinding_for(probe) else {
        return Vec::new();
    };
    let mut cells = vec![center];
    for radius in 2..(2 * count as u32 + 2) {
        for cell in pathfinding.square_around(center, radius) {
            if cells.iter().all(|placed| placed.chebyshev(&cell) >= 2) {
                cells.push(cell);
            }
        }
        if cells.len() >= count {
            break;
        }
    }
    cells.truncate(count);
    cells
}

fn deploy<R: MovementRules>(
    handler: &mut WarMovementHandler<R>,
    args: &Args,
    owner: u32,
    center: Location,
) -> Result<Vec<UnitId>> {
    let flagship = WarUnit::new(UnitId::new(), PlayerId(owner), fleet_class(0, args.arena), center);
    let flagship_id = flagship.id;
    handler.add_unit(flagship)?;

    let cells = deployment_cells(handler, flagship_id, center, args.units);
    let mut ids = vec![flagship_id];
    for (i, cell) in cells.into_iter().filter(|&c| c != center).enumerate() {
        if ids.len() >= args.units {
            break;
        }
        let heading = if owner == 1 { 0.0 } else { std::f64::consts::PI };
        let unit = WarUnit::new(UnitId::new(), PlayerId(owner), fleet_class(i + 1, args.arena), cell)
            .with_heading(heading);
        ids.push(unit.id);
        handler.add_unit(unit)?;
    }
    Ok(ids)
}

fn mirrored(location: Location, width: i32) -> Location {
    Location::of(width - 1 - location.x, location.y)
}

fn send_across<H: MovementHandler>(handler: &mut H, width: i32) -> Result<()> {
    for id in handler.unit_ids() {
        let Some(unit) = handler.unit(id) else {
            continue;
        };
        let goal = mirrored(unit.location, width);
        handler.set_movement_goal(id, goal)?;
    }
    Ok(())
}

fn run<H: MovementHandler>(handler: &mut H, args: &Args, result: &mut RunResult) -> Result<()> {
    send_across(handler, args.width)?;

    for tick in 1..=args.max_ticks {
        let summary = handler.advance_tick()?;
        result.record(&summary);
        result.ticks = tick;

        if args.verbose && !args.json && tick % 50 == 0 {
            eprintln!(
                "Tick {}: moving={} rotating={} holding={} replanning={} arrived={}",
                tick, summary.moving, summary.rotating, summary.holding, summary.replanning, result.arrived
            );
        }

        let busy = summary.moving + summary.rotating + summary.holding + summary.replanning + summary.waiting;
        if busy == 0 && summary.planning.submitted == 0 {
            break;
        }
    }

    result.still_moving = handler
        .unit_ids()
        .into_iter()
        .filter_map(|id| handler.unit(id))
        .filter(|unit| unit.goal.is_some())
        .count();
    Ok(())
}

fn run_grid<R: MovementRules>(rules: R, config: MovementConfig, args: &Args, result: &mut RunResult) -> Result<()> {
    let mut handler = WarMovementHandler::new(rules, config)?;
    let west = Location::of(args.width / 8, args.height / 2);
    let east = Location::of(args.width - 1 - args.width / 8, args.height / 2);
    let friendly = deploy(&mut handler, args, 1, west)?;
    let enemy = deploy(&mut handler, args, 2, east)?;
    tracing::info!("Deployed {} vs {} units", friendly.len(), enemy.len());
    run(&mut handler, args, result)
}

fn run_free_form(config: MovementConfig, args: &Args, result: &mut RunResult) -> Result<()> {
    let mut handler = FreeFormMovementHandler::new(config)?;
    for owner in [1u32, 2] {
        let x = if owner == 1 { args.width / 8 } else { args.width - 1 - args.width / 8 };
        for i in 0..args.units {
            let y = (i as i32 * 2) % args.height.max(1);
            let unit = WarUnit::new(UnitId::new(), PlayerId(owner), fleet_class(i, args.arena), Location::of(x, y));
            handler.add_unit(unit)?;
        }
    }
    run(&mut handler, args, result)
}

/// A wall down the middle with three gaps
fn ground_placement(width: i32, height: i32) -> PlacementGrid {
    let x = width / 2;
    let third = (height / 3).max(1);
    let structures: Vec<Structure> = (0..3)
        .map(|i| Structure {
            origin: Location::of(x, i * third + 1),
            width: 1,
            height: (third - 2).max(1),
        })
        .collect();
    PlacementGrid::from_structures(&structures)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => MovementConfig::load(path)?,
        None => MovementConfig::default(),
    };
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    config.validate()?;

    let mut result = RunResult::new(args.arena, args.units * 2, config.seed);

    match args.arena {
        Arena::Simple => run_grid(SimpleMovementRules::new(args.width, args.height), config, &args, &mut result)?,
        Arena::Ground => {
            let rules = GroundMovementRules::new(args.width, args.height, ground_placement(args.width, args.height));
            run_grid(rules, config, &args, &mut result)?
        }
        Arena::Space => {
            let rules = SpaceMovementRules::new(args.width, args.height, DEFAULT_RETREAT_MARGIN);
            run_grid(rules, config, &args, &mut result)?
        }
        Arena::FullSpace => {
            let rules = FullSpaceMovementRules::new(args.width, args.height, DEFAULT_RETREAT_MARGIN);
            run_grid(rules, config, &args, &mut result)?
        }
        Arena::FreeForm => run_free_form(config, &args, &mut result)?,
    }

    if args.json {
        match serde_json::to_string_pretty(&result) {
            Ok(json) => println!("{}", json),
            Err(e) => tracing::error!("Failed to serialize result: {}", e),
        }
    } else {
        println!("Movement Result");
        println!("===============");
        println!("Arena: {:?}", result.arena);
        println!("Ticks: {}", result.ticks);
        println!("Arrived: {} / {}", result.arrived, result.units);
        println!("Still moving: {}", result.still_moving);
        println!(
            "Plans: {} applied, {} retried, {} dropped",
            result.plans_applied, result.plans_retried, result.plans_dropped
        );
        println!("Replans: {}  Holds: {}", result.replans, result.holds);
        if let Some(seed) = result.seed {
            println!("Seed: {}", seed);
        }
    }

    Ok(())
}
