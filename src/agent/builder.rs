//! Builder state machine
//!
//! An idle builder looks for work in a fixed order: a global build task for
//! its settlement, the head of the settlement's build queue, an unfinished
//! road nobody is working on, the most urgent road need. Failing all of
//! those it eventually wanders.

use serde::{Deserialize, Serialize};

use crate::agent::movement::{self, MoveOutcome};
use crate::agent::{Agent, AgentRole, BuilderData, Command, Target};
use crate::city::construction::{apply_build_work, plan_road_work, ContributionResult};
use crate::city::settlement::Settlement;
use crate::city::stockpile::{Materials, ResourceType};
use crate::city::structure::StructureKind;
use crate::core::types::{RoadId, Vec2};
use crate::simulation::state::SimulationState;
use crate::spatial::pathfinding::PathOptions;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuilderState {
    Idle,
    Moving,
    Building,
    BuildingRoad,
    Wandering,
}

/// Work a builder has committed to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BuilderTask {
    /// A structure already paid for; `site` stays reserved until completion
    Structure {
        kind: StructureKind,
        site: Vec2,
        paid: Materials,
        progress: f32,
    },
    /// A claimed road; `work` is the unspent work carried between steps
    Road { road: RoadId, work: f32 },
}

pub fn step(state: &SimulationState, agent: &mut Agent, dt: f32) -> Vec<Command> {
    let mut commands = Vec::new();
    let mut data = match &agent.role {
        AgentRole::Builder(b) => b.clone(),
        _ => return commands,
    };

    match data.state {
        BuilderState::Idle => idle(state, agent, &mut data, dt, &mut commands),
        BuilderState::Moving => moving(state, agent, &mut data, dt, &mut commands),
        BuilderState::Building => building(agent, &mut data, dt, &mut commands),
        BuilderState::BuildingRoad => building_road(state, agent, &mut data, dt, &mut commands),
        BuilderState::Wandering => wandering(state, agent, &mut data, dt),
    }

    agent.role = AgentRole::Builder(data);
    commands
}

fn idle(
    state: &SimulationState,
    agent: &mut Agent,
    data: &mut BuilderData,
    dt: f32,
    commands: &mut Vec<Command>,
) {
    agent.idle_time += dt;
    let Some(settlement) = state.settlements.get(agent.settlement) else {
        return;
    };

    if take_global_task(state, agent, data, commands)
        || take_queued_build(state, settlement, agent, data, commands)
        || resume_road(state, agent, data, commands)
        || start_road(state, settlement, agent, commands)
    {
        agent.idle_time = 0.0;
        return;
    }

    if agent.idle_time >= state.config.wander_cooldown {
        agent.idle_time = 0.0;
        if let Some(spot) = movement::wander_target(state, agent) {
            agent.set_target(Target::Position(spot), spot);
            data.state = BuilderState::Wandering;
        }
    }
}

/// Commit to a structure: reserve the site and head there along `path`
fn begin_structure(
    agent: &mut Agent,
    data: &mut BuilderData,
    kind: StructureKind,
    site: Vec2,
    paid: Materials,
    path: Vec<Vec2>,
) {
    data.task = Some(BuilderTask::Structure {
        kind,
        site,
        paid,
        progress: 0.0,
    });
    data.state = BuilderState::Moving;
    agent.set_target(Target::Position(site), site);
    agent.receive_path(path);
}

fn take_global_task(
    state: &SimulationState,
    agent: &mut Agent,
    data: &mut BuilderData,
    commands: &mut Vec<Command>,
) -> bool {
    let Some(task) = state
        .build_tasks
        .iter()
        .find(|t| t.settlement == agent.settlement)
    else {
        return false;
    };

    match movement::plan_waypoints(
        state,
        agent.position,
        task.position,
        PathOptions::through_structures(),
    ) {
        Ok(path) => {
            tracing::debug!("Builder {:?} took build task {}", agent.id, task.id);
            commands.push(Command::TakeBuildTask { task: task.id });
            begin_structure(agent, data, task.kind, task.position, task.paid.clone(), path);
            true
        }
        Err(e) => {
            // Nobody can start it from here; release the site and the materials
            commands.push(Command::AbandonBuildTask { task: task.id });
            commands.push(Command::Message(format!(
                "Builder cannot reach {} site, task dropped: {}",
                task.kind.name(),
                e
            )));
            false
        }
    }
}

fn take_queued_build(
    state: &SimulationState,
    settlement: &Settlement,
    agent: &mut Agent,
    data: &mut BuilderData,
    commands: &mut Vec<Command>,
) -> bool {
    let Some(kind) = settlement.build_queue.peek_next() else {
        return false;
    };
    let cost = kind.cost();
    if !settlement.stockpile.has_materials(&cost) {
        commands.push(Command::Message(format!(
            "{} cannot afford a {}",
            settlement.name,
            kind.name()
        )));
        return false;
    }

    let site = match state.find_site(settlement.position, kind, Some(agent.id)) {
        Ok(site) => site,
        Err(e) => {
            commands.push(Command::DequeueBuild {
                settlement: settlement.id,
                kind,
            });
            commands.push(Command::Message(format!("{}: {} for {}", settlement.name, e, kind.name())));
            return false;
        }
    };

    match movement::plan_waypoints(state, agent.position, site, PathOptions::through_structures()) {
        Ok(path) => {
            commands.push(Command::DequeueBuild {
                settlement: settlement.id,
                kind,
            });
            commands.push(Command::Deduct {
                settlement: settlement.id,
                materials: cost.clone(),
            });
            begin_structure(agent, data, kind, site, cost, path);
            true
        }
        Err(e) => {
            commands.push(Command::DequeueBuild {
                settlement: settlement.id,
                kind,
            });
            commands.push(Command::Message(format!(
                "{}: builder cannot reach {} site, entry dropped: {}",
                settlement.name,
                kind.name(),
                e
            )));
            false
        }
    }
}

/// Pick up the nearest unfinished, unclaimed road of this settlement
fn resume_road(
    state: &SimulationState,
    agent: &mut Agent,
    data: &mut BuilderData,
    commands: &mut Vec<Command>,
) -> bool {
    let candidate = state
        .roads
        .values()
        .filter(|r| r.owner == Some(agent.settlement) && !r.is_usable() && !r.is_claimed())
        .filter_map(|r| {
            let next = state.grid.cell_to_world(r.next_cell()?);
            Some((r.id, next, next.distance_squared(&agent.position)))
        })
        .min_by(|a, b| a.2.total_cmp(&b.2));

    let Some((road, next, _)) = candidate else {
        return false;
    };
    commands.push(Command::ClaimRoad {
        road,
        agent: agent.id,
    });
    data.task = Some(BuilderTask::Road { road, work: 0.0 });
    data.state = BuilderState::Moving;
    agent.set_target(Target::Road(road), next);
    true
}

/// Turn the settlement's most urgent road need into a road
fn start_road(
    state: &SimulationState,
    settlement: &Settlement,
    agent: &Agent,
    commands: &mut Vec<Command>,
) -> bool {
    let Some(need) = settlement.next_road_need() else {
        return false;
    };
    let blocked = Default::default();
    let planner = state.path_planner(&blocked);
    let options = PathOptions {
        ignore_structures: true,
        prefer_roads: true,
    };
    let from = state.grid.world_to_cell(need.from);
    let to = state.grid.world_to_cell(need.to);

    match planner.find_cell_path(from, to, options) {
        Ok(tiles) => {
            commands.push(Command::StartRoad {
                agent: agent.id,
                settlement: settlement.id,
                need: *need,
                tiles,
            });
            true
        }
        Err(e) => {
            commands.push(Command::DropRoadNeed {
                settlement: settlement.id,
                target: need.target,
            });
            commands.push(Command::Message(format!("{}: cannot route road: {}", settlement.name, e)));
            false
        }
    }
}

fn go_idle(agent: &mut Agent, data: &mut BuilderData) {
    data.task = None;
    data.state = BuilderState::Idle;
    agent.clear_target();
}

fn moving(
    state: &SimulationState,
    agent: &mut Agent,
    data: &mut BuilderData,
    dt: f32,
    commands: &mut Vec<Command>,
) {
    let speed = state.config.agent_speed;
    match data.task.clone() {
        Some(BuilderTask::Structure { kind, paid, .. }) => {
            match movement::move_toward_target(state, agent, PathOptions::through_structures(), speed, dt) {
                Ok((MoveOutcome::Arrived, _)) => data.state = BuilderState::Building,
                Ok((MoveOutcome::Moving, _)) => {}
                Err(e) => {
                    commands.push(Command::Refund {
                        settlement: agent.settlement,
                        materials: paid,
                    });
                    commands.push(Command::Message(format!(
                        "Builder lost the way to a {} site: {}",
                        kind.name(),
                        e
                    )));
                    go_idle(agent, data);
                }
            }
        }
        Some(BuilderTask::Road { road, .. }) => {
            let Some(next) = state
                .roads
                .get(road)
                .and_then(|r| r.next_cell())
                .map(|c| state.grid.cell_to_world(c))
            else {
                // Road gone or finished by someone else
                go_idle(agent, data);
                return;
            };
            agent.set_target(Target::Road(road), next);
            match movement::move_toward_target(state, agent, PathOptions::through_structures(), speed, dt) {
                Ok((MoveOutcome::Arrived, _)) => data.state = BuilderState::BuildingRoad,
                Ok((MoveOutcome::Moving, _)) => {}
                Err(e) => {
                    commands.push(Command::ReleaseRoad {
                        road,
                        agent: agent.id,
                    });
                    commands.push(Command::Message(format!("Builder cannot reach road: {}", e)));
                    go_idle(agent, data);
                }
            }
        }
        None => go_idle(agent, data),
    }
}

fn building(agent: &mut Agent, data: &mut BuilderData, dt: f32, commands: &mut Vec<Command>) {
    let Some(BuilderTask::Structure {
        kind,
        site,
        paid,
        progress,
    }) = data.task.as_mut()
    else {
        go_idle(agent, data);
        return;
    };

    if let ContributionResult::Completed = apply_build_work(progress, *kind, dt) {
        commands.push(Command::CompleteStructure {
            agent: agent.id,
            settlement: agent.settlement,
            kind: *kind,
            site: *site,
            paid: std::mem::take(paid),
        });
        go_idle(agent, data);
    }
}

fn building_road(
    state: &SimulationState,
    agent: &mut Agent,
    data: &mut BuilderData,
    dt: f32,
    commands: &mut Vec<Command>,
) {
    let Some(BuilderTask::Road { road: road_id, work }) = data.task.clone() else {
        go_idle(agent, data);
        return;
    };
    let Some(road) = state.roads.get(road_id) else {
        go_idle(agent, data);
        return;
    };
    let wood = state
        .settlements
        .get(agent.settlement)
        .map(|s| s.stockpile.get(ResourceType::Wood))
        .unwrap_or(0);

    let budget = work + state.config.road_build_speed * dt;
    let plan = plan_road_work(road, &state.grid, budget, wood, &state.config);

    for step in &plan.steps {
        commands.push(Command::LayRoadCell {
            road: road_id,
            settlement: agent.settlement,
            step: *step,
        });
    }
    if let Some(last) = plan.steps.last() {
        agent.position = state.grid.cell_to_world(last.cell);
    }

    if plan.finishes(road) {
        go_idle(agent, data);
    } else if plan.starved && plan.steps.is_empty() {
        commands.push(Command::ReleaseRoad {
            road: road_id,
            agent: agent.id,
        });
        commands.push(Command::Message("Road work paused: not enough wood".to_string()));
        go_idle(agent, data);
    } else {
        data.task = Some(BuilderTask::Road {
            road: road_id,
            work: plan.leftover,
        });
    }
}

fn wandering(state: &SimulationState, agent: &mut Agent, data: &mut BuilderData, dt: f32) {
    let speed = state.config.agent_speed;
    match movement::move_toward_target(state, agent, PathOptions::through_structures(), speed, dt) {
        Ok((MoveOutcome::Moving, _)) => {}
        _ => go_idle(agent, data),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::SimulationConfig;
    use crate::simulation::tick::SimulationEvent;
    use crate::spatial::terrain::TerrainGrid;
    use crate::spatial::tile::Tile;

    fn world() -> SimulationState {
        let config = SimulationConfig::default();
        let grid = TerrainGrid::new(40, 40, config.cell_size, config.edge_buffer, Tile::Grass);
        SimulationState::new(config, grid, 11)
    }

    fn run(state: &mut SimulationState, id: crate::core::types::AgentId, dt: f32) {
        let mut agent = state.agents[id].clone();
        let commands = step(state, &mut agent, dt);
        state.agents[id] = agent;
        let mut events: Vec<SimulationEvent> = Vec::new();
        for c in commands {
            c.apply(state, &mut events);
        }
    }

    #[test]
    fn test_queued_build_is_paid_and_completed() {
        let mut state = world();
        let home = state.add_settlement("Ashford", Vec2::new(400.0, 400.0));
        state.settlements[home].stockpile.add(ResourceType::Wood, 50);
        state.settlements[home].stockpile.add(ResourceType::Stone, 10);
        state.enqueue_build(home, StructureKind::House);
        let pos = state.settlements[home].position;
        let b = state.spawn_agent(home, AgentRole::builder(), pos);

        run(&mut state, b, 0.5);
        assert!(state.settlements[home].build_queue.is_empty());
        assert_eq!(state.settlements[home].stockpile.get(ResourceType::Wood), 30);
        assert!(state.agents[b].reserved_site().is_some());

        for _ in 0..200 {
            run(&mut state, b, 0.5);
        }
        assert_eq!(state.structures.len(), 1);
        assert!(state.agents[b].reserved_site().is_none());
    }

    #[test]
    fn test_unaffordable_queue_entry_stays_queued() {
        let mut state = world();
        let home = state.add_settlement("Ashford", Vec2::new(400.0, 400.0));
        state.enqueue_build(home, StructureKind::Market);
        let pos = state.settlements[home].position;
        let b = state.spawn_agent(home, AgentRole::builder(), pos);
        run(&mut state, b, 0.5);
        assert_eq!(state.settlements[home].build_queue.len(), 1);
        assert!(state.messages.contains("cannot afford"));
    }

    #[test]
    fn test_impossible_site_drops_entry_with_message() {
        let mut state = world();
        let home = state.add_settlement("Ashford", Vec2::new(400.0, 400.0));
        state.settlements[home].stockpile.add(ResourceType::Wood, 50);
        state.enqueue_build(home, StructureKind::Fishery);
        let pos = state.settlements[home].position;
        let b = state.spawn_agent(home, AgentRole::builder(), pos);
        run(&mut state, b, 0.5);
        assert!(state.settlements[home].build_queue.is_empty());
        assert_eq!(state.settlements[home].stockpile.get(ResourceType::Wood), 50);
        assert!(state.messages.contains("no water-adjacent site"));
    }

    /// Surround the cell under `site` with water
    fn wall_in(state: &mut SimulationState, site: Vec2) {
        let center = state.grid.world_to_cell(site);
        for cell in center.neighbors() {
            state.grid.set_tile(cell, Tile::Water);
        }
    }

    #[test]
    fn test_unreachable_task_is_dropped_and_refunded() {
        let mut state = world();
        let home = state.add_settlement("Ashford", Vec2::new(400.0, 400.0));
        state.settlements[home].stockpile.add(ResourceType::Wood, 50);
        state.settlements[home].stockpile.add(ResourceType::Stone, 10);
        let task = state
            .create_build_task(home, StructureKind::House)
            .unwrap()
            .expect("task created");
        assert_eq!(state.settlements[home].stockpile.get(ResourceType::Wood), 30);
        let site = state.build_tasks[0].position;
        wall_in(&mut state, site);
        let pos = state.settlements[home].position;
        let b = state.spawn_agent(home, AgentRole::builder(), pos);

        run(&mut state, b, 0.5);

        assert!(state.build_tasks.iter().all(|t| t.id != task));
        assert_eq!(state.pending_builds(home, StructureKind::House), 0);
        assert_eq!(state.settlements[home].stockpile.get(ResourceType::Wood), 50);
        assert_eq!(state.settlements[home].stockpile.get(ResourceType::Stone), 10);
        assert!(state.agents[b].reserved_site().is_none());
        assert!(state.messages.contains("cannot reach"));

        // Further steps neither refund twice nor pick anything up
        for _ in 0..20 {
            run(&mut state, b, 0.5);
        }
        assert_eq!(state.settlements[home].stockpile.get(ResourceType::Wood), 50);
        assert_eq!(state.settlements[home].stockpile.get(ResourceType::Stone), 10);
    }

    #[test]
    fn test_unreachable_queued_site_drops_entry_unpaid() {
        let mut state = world();
        let home = state.add_settlement("Ashford", Vec2::new(400.0, 400.0));
        state.settlements[home].stockpile.add(ResourceType::Wood, 50);
        state.settlements[home].stockpile.add(ResourceType::Stone, 10);
        state.enqueue_build(home, StructureKind::House);
        state.enqueue_build(home, StructureKind::House);
        let pos = state.settlements[home].position;
        let b = state.spawn_agent(home, AgentRole::builder(), pos);
        let site = state
            .find_site(pos, StructureKind::House, Some(b))
            .expect("open grass has a site");
        wall_in(&mut state, site);

        run(&mut state, b, 0.5);

        assert_eq!(state.settlements[home].build_queue.len(), 1);
        assert_eq!(state.settlements[home].stockpile.get(ResourceType::Wood), 50);
        assert_eq!(state.settlements[home].stockpile.get(ResourceType::Stone), 10);
        assert!(state.agents[b].reserved_site().is_none());
        assert!(state.messages.contains("entry dropped"));
    }

    #[test]
    fn test_unclaimed_road_is_resumed() {
        let mut state = world();
        let home = state.add_settlement("Ashford", Vec2::new(400.0, 400.0));
        state.settlements[home].stockpile.add(ResourceType::Wood, 100);
        let tiles: Vec<_> = (20..25).map(|c| crate::core::types::Cell::new(c, 20)).collect();
        let start = state.grid.cell_to_world(tiles[0]);
        let end = state.grid.cell_to_world(tiles[4]);
        let road = state.add_road(Some(home), None, start, end, tiles);
        let pos = state.settlements[home].position;
        let b = state.spawn_agent(home, AgentRole::builder(), pos);

        run(&mut state, b, 0.5);
        assert_eq!(state.roads[road].builder, Some(b));
        for _ in 0..100 {
            run(&mut state, b, 0.5);
        }
        assert!(state.roads[road].is_usable());
        assert_eq!(state.roads[road].builder, None);
    }
}
