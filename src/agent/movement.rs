//! Movement along computed paths
//!
//! Paths are computed lazily: an agent with a target but no path asks the
//! planner on its next move. Agents standing on a road tile move faster.

use std::f32::consts::TAU;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use slotmap::Key;

use crate::agent::Agent;
use crate::core::types::Vec2;
use crate::simulation::state::SimulationState;
use crate::spatial::pathfinding::{PathError, PathOptions};
use crate::spatial::tile::Tile;

/// Result of one movement step
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MoveOutcome {
    Arrived,
    Moving,
}

/// Compute a path to the agent's target if it has none
pub fn ensure_path(
    state: &SimulationState,
    agent: &mut Agent,
    options: PathOptions,
) -> Result<(), PathError> {
    if agent.path().is_some() {
        return Ok(());
    }
    let Some(goal) = agent.target_position() else {
        return Ok(());
    };
    let waypoints = plan_waypoints(state, agent.position, goal, options)?;
    agent.receive_path(waypoints);
    Ok(())
}

/// Waypoints from `from` to `goal`, ending exactly on `goal` when the goal
/// cell itself was reachable
pub fn plan_waypoints(
    state: &SimulationState,
    from: Vec2,
    goal: Vec2,
    options: PathOptions,
) -> Result<Vec<Vec2>, PathError> {
    let blocked = if options.ignore_structures {
        Default::default()
    } else {
        state.structure_cells()
    };
    let planner = state.path_planner(&blocked);
    let mut waypoints = planner.find_path(from, goal, options)?;
    let goal_cell = state.grid.world_to_cell(goal);
    if let Some(last) = waypoints.last_mut() {
        if state.grid.world_to_cell(*last) == goal_cell {
            *last = goal;
        }
    }
    Ok(waypoints)
}

/// Advance along the current path by `speed * dt`, returning the outcome and
/// the distance actually covered
pub fn advance(state: &SimulationState, agent: &mut Agent, speed: f32, dt: f32) -> (MoveOutcome, f32) {
    let on_road = state.grid.tile_at_world(agent.position) == Some(Tile::Road);
    let factor = if on_road {
        state.config.road_speed_factor
    } else {
        1.0
    };
    let mut budget = speed * factor * dt;
    let mut traveled = 0.0;
    let mut position = agent.position;

    let Some(cursor) = agent.path_mut() else {
        return (MoveOutcome::Arrived, 0.0);
    };

    while let Some(waypoint) = cursor.current() {
        let remaining = position.distance(&waypoint);
        if remaining <= budget {
            budget -= remaining;
            traveled += remaining;
            position = waypoint;
            cursor.index += 1;
        } else {
            position = position.step_toward(waypoint, budget);
            traveled += budget;
            break;
        }
    }

    let finished = cursor.is_finished();
    agent.position = position;
    if finished {
        (MoveOutcome::Arrived, traveled)
    } else {
        (MoveOutcome::Moving, traveled)
    }
}

/// Ensure a path, then advance; path failures are returned to the caller
pub fn move_toward_target(
    state: &SimulationState,
    agent: &mut Agent,
    options: PathOptions,
    speed: f32,
    dt: f32,
) -> Result<(MoveOutcome, f32), PathError> {
    ensure_path(state, agent, options)?;
    Ok(advance(state, agent, speed, dt))
}

/// Random passable point around the agent's settlement
///
/// Seeded from the agent id and the tick so agent steps stay deterministic
/// without mutable access to the shared generator.
pub fn wander_target(state: &SimulationState, agent: &Agent) -> Option<Vec2> {
    let home = state.settlements.get(agent.settlement)?.position;
    let seed = agent.id.data().as_ffi() ^ state.tick.wrapping_mul(0x9E37_79B9_7F4A_7C15);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let radius = state.config.wander_radius;
    for _ in 0..4 {
        let r = rng.gen_range(radius * 0.25..=radius);
        let angle = rng.gen_range(0.0..TAU);
        let candidate = state.grid.snap(state.grid.clamp_to_buffer(home.offset_polar(r, angle)));
        if state.grid.is_passable(state.grid.world_to_cell(candidate)) {
            return Some(candidate);
        }
    }
    None
}
