#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state for the Castle Siege navigation engine.
//!
//! The world owns the grid, the flow fields regenerated every tick, the
//! player and castle targets, and every registered agent. All mutation flows
//! through [`apply`]; read access is provided by the [`query`] module.

pub mod field;
pub mod grid;

use std::time::Duration;

use castle_siege_core::{
    collision, AgentId, AgentProfile, Bounds, Command, Event, MovementPolicy, RegistrationError,
    TargetKind, UnregistrationError,
};
use glam::Vec2;
use thiserror::Error;
use tracing::{debug, warn};

pub use field::{Field, FieldCell, FieldSet, TopologyError};
pub use grid::{Grid, GridCell, MapLayout};

/// Distance beyond the map edge at which agents are despawned.
const DESPAWN_MARGIN: f32 = 200.0;

/// Reach added around the castle footprint so agents halted at its walls touch it.
const CASTLE_REACH: f32 = 1.0;

const DEFAULT_PLAYER_BOUNDS: Bounds = Bounds::from_xywh(384.0, 284.0, 16.0, 22.0);

/// Failures that abort command processing.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum WorldError {
    /// Flow field regeneration hit a malformed or disconnected map.
    #[error("flow field regeneration failed: {0}")]
    Topology(#[from] TopologyError),
}

/// Represents the authoritative Castle Siege world state.
#[derive(Debug)]
pub struct World {
    grid: Grid,
    fields: FieldSet,
    player: Bounds,
    castle: Option<Bounds>,
    agents: Vec<Agent>,
    next_agent_id: u32,
    tick_index: u64,
}

impl World {
    /// Creates a world on the shipped fortress map.
    ///
    /// Flow fields carry no force until the first tick regenerates them.
    #[must_use]
    pub fn new() -> Self {
        Self::with_layout(&MapLayout::fortress())
    }

    /// Creates a world on the provided map layout.
    #[must_use]
    pub fn with_layout(layout: &MapLayout) -> Self {
        let grid = Grid::from_layout(layout);
        let fields = FieldSet::new(&grid);
        let castle = grid
            .castle_bounds()
            .map(|bounds| bounds.inflated(CASTLE_REACH));
        Self {
            grid,
            fields,
            player: DEFAULT_PLAYER_BOUNDS,
            castle,
            agents: Vec::new(),
            next_agent_id: 0,
            tick_index: 0,
        }
    }

    fn agent_mut(&mut self, agent: AgentId) -> Option<&mut Agent> {
        self.agents.iter_mut().find(|candidate| candidate.id == agent)
    }

    fn agent_index(&self, agent: AgentId) -> Option<usize> {
        self.agents.iter().position(|candidate| candidate.id == agent)
    }

    fn target_bounds(&self, target: TargetKind) -> Option<Bounds> {
        match target {
            TargetKind::Player => Some(self.player),
            TargetKind::Castle => self.castle,
        }
    }

    fn register(&mut self, profile: AgentProfile, position: Vec2, out_events: &mut Vec<Event>) {
        if !profile_is_valid(&profile) {
            out_events.push(Event::RegistrationRejected {
                position,
                reason: RegistrationError::InvalidProfile,
            });
            return;
        }

        let bounds = Bounds::new(position, profile.size);
        if profile.policy == MovementPolicy::FieldFollowing
            && collision::first_overlap(&bounds, self.grid.wall_bounds()).is_some()
        {
            out_events.push(Event::RegistrationRejected {
                position,
                reason: RegistrationError::OverlapsWall,
            });
            return;
        }

        let id = AgentId::new(self.next_agent_id);
        self.next_agent_id = self.next_agent_id.saturating_add(1);
        self.agents.push(Agent {
            id,
            bounds,
            velocity: Vec2::ZERO,
            profile,
            cooldown_remaining: Duration::ZERO,
        });
        debug!(agent = id.get(), x = position.x, y = position.y, "registered agent");
        out_events.push(Event::AgentRegistered { agent: id, bounds });
    }

    fn despawn_out_of_bounds(&mut self, out_events: &mut Vec<Event>) {
        let playable = self.grid.bounds().inflated(DESPAWN_MARGIN);
        self.agents.retain(|agent| {
            if collision::overlaps(&agent.bounds, &playable) {
                return true;
            }
            debug!(agent = agent.id.get(), "despawned agent outside the map");
            out_events.push(Event::AgentDespawned { agent: agent.id });
            false
        });
    }

    fn regenerate_fields(&mut self) -> Result<(), TopologyError> {
        let player_cell = self.grid.cell_containing(self.player.center());
        self.fields.regenerate(&self.grid, player_cell)
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

/// Applies the provided command to the world, mutating state deterministically.
///
/// Rejected requests are reported as events. An error is returned only when
/// the flow fields cannot be regenerated, which signals a malformed map.
pub fn apply(
    world: &mut World,
    command: Command,
    out_events: &mut Vec<Event>,
) -> Result<(), WorldError> {
    match command {
        Command::Tick { dt } => {
            world.tick_index = world.tick_index.saturating_add(1);
            for agent in &mut world.agents {
                agent.cooldown_remaining = agent.cooldown_remaining.saturating_sub(dt);
            }
            world.despawn_out_of_bounds(out_events);
            world.regenerate_fields()?;
            out_events.push(Event::TimeAdvanced { dt });
        }
        Command::PlacePlayer { bounds } => {
            world.player = bounds;
        }
        Command::ScrollMap { delta } => {
            world.grid.scroll(delta);
            world.castle = world.castle.map(|castle| castle.translated(delta));
            for agent in &mut world.agents {
                agent.bounds = agent.bounds.translated(delta);
            }
            out_events.push(Event::MapScrolled {
                origin: world.grid.origin(),
            });
        }
        Command::RegisterAgent { profile, position } => {
            world.register(profile, position, out_events);
        }
        Command::UnregisterAgent { agent } => match world.agent_index(agent) {
            Some(index) => {
                let _ = world.agents.remove(index);
                debug!(agent = agent.get(), "unregistered agent");
                out_events.push(Event::AgentUnregistered { agent });
            }
            None => out_events.push(Event::UnregistrationRejected {
                agent,
                reason: UnregistrationError::MissingAgent,
            }),
        },
        Command::MoveAgent { agent, delta } => {
            if let Some(entry) = world.agent_mut(agent) {
                let from = entry.bounds.origin();
                entry.bounds = entry.bounds.translated(delta);
                entry.velocity = delta;
                out_events.push(Event::AgentMoved {
                    agent,
                    from,
                    to: entry.bounds.origin(),
                });
            }
        }
        Command::AttemptAttack { agent } => {
            let Some(index) = world.agent_index(agent) else {
                return Ok(());
            };
            let target = world.agents[index].profile.target;
            let Some(target_bounds) = world.target_bounds(target) else {
                return Ok(());
            };
            let entry = &mut world.agents[index];
            if entry.cooldown_remaining.is_zero()
                && collision::overlaps(&entry.bounds, &target_bounds)
            {
                entry.cooldown_remaining = entry.profile.attack_cooldown;
                entry.velocity = Vec2::ZERO;
                out_events.push(Event::AgentAttacked { agent, target });
            }
        }
        Command::ReportStall { agent } => {
            if let Some(entry) = world.agent_mut(agent) {
                entry.velocity = Vec2::ZERO;
                warn!(
                    agent = agent.get(),
                    x = entry.bounds.origin().x,
                    y = entry.bounds.origin().y,
                    "agent blocked on both axes"
                );
                out_events.push(Event::AgentStalled { agent });
            }
        }
    }

    Ok(())
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use castle_siege_core::{
        collision, AgentId, AgentSnapshot, AgentView, Bounds, FieldKind, TargetKind,
    };

    use super::{Field, FieldSet, Grid, World};

    /// Provides read-only access to the world's grid.
    #[must_use]
    pub fn grid(world: &World) -> &Grid {
        &world.grid
    }

    /// Provides read-only access to the field of the provided kind.
    #[must_use]
    pub fn field(world: &World, kind: FieldKind) -> &Field {
        world.fields.get(kind)
    }

    /// Provides read-only access to every field at once.
    #[must_use]
    pub fn fields(world: &World) -> &FieldSet {
        &world.fields
    }

    /// Captures a read-only view of the registered agents.
    #[must_use]
    pub fn agent_view(world: &World) -> AgentView {
        let snapshots: Vec<AgentSnapshot> = world
            .agents
            .iter()
            .map(|agent| AgentSnapshot {
                id: agent.id,
                bounds: agent.bounds,
                velocity: agent.velocity,
                profile: agent.profile,
                attack_ready: agent.cooldown_remaining.is_zero(),
            })
            .collect();
        AgentView::from_snapshots(snapshots)
    }

    /// Hitbox last reported for the player.
    #[must_use]
    pub fn player_bounds(world: &World) -> Bounds {
        world.player
    }

    /// Hitbox of the castle, if the map has one.
    #[must_use]
    pub fn castle_bounds(world: &World) -> Option<Bounds> {
        world.castle
    }

    /// Hitbox of the provided target kind.
    #[must_use]
    pub fn target_bounds(world: &World, target: TargetKind) -> Option<Bounds> {
        world.target_bounds(target)
    }

    /// Hitboxes of every wall cell, castle cells included.
    #[must_use]
    pub fn wall_bounds(world: &World) -> &[Bounds] {
        world.grid.wall_bounds()
    }

    /// Agents whose hitbox overlaps the provided attack hitbox, in id order.
    #[must_use]
    pub fn agents_hit_by(world: &World, hitbox: &Bounds) -> Vec<AgentId> {
        let mut hits: Vec<AgentId> = world
            .agents
            .iter()
            .filter(|agent| collision::overlaps(hitbox, &agent.bounds))
            .map(|agent| agent.id)
            .collect();
        hits.sort();
        hits
    }

    /// Number of ticks processed so far.
    #[must_use]
    pub fn tick_index(world: &World) -> u64 {
        world.tick_index
    }
}

#[derive(Clone, Debug)]
struct Agent {
    id: AgentId,
    bounds: Bounds,
    velocity: Vec2,
    profile: AgentProfile,
    cooldown_remaining: Duration,
}

fn profile_is_valid(profile: &AgentProfile) -> bool {
    profile.size.is_finite()
        && profile.size.x > 0.0
        && profile.size.y > 0.0
        && profile.movement_speed.is_finite()
        && profile.movement_speed >= 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use castle_siege_core::{CellCoord, EnemyKind, FieldKind};

    fn small_world() -> World {
        let layout = MapLayout::from_ascii(
            &["C.....", "C..#..", "...#..", "......"],
            32,
            32,
        );
        World::with_layout(&layout)
    }

    fn register(world: &mut World, kind: EnemyKind, x: f32, y: f32) -> Vec<Event> {
        let mut events = Vec::new();
        apply(
            world,
            Command::RegisterAgent {
                profile: kind.profile(),
                position: Vec2::new(x, y),
            },
            &mut events,
        )
        .expect("registration never fails");
        events
    }

    #[test]
    fn registration_allocates_monotonic_ids() {
        let mut world = small_world();
        let first = register(&mut world, EnemyKind::Eyeleen, 160.0, 0.0);
        let second = register(&mut world, EnemyKind::Eyeleen, 160.0, 64.0);

        assert!(matches!(
            first.as_slice(),
            [Event::AgentRegistered { agent, .. }] if agent.get() == 0
        ));
        assert!(matches!(
            second.as_slice(),
            [Event::AgentRegistered { agent, .. }] if agent.get() == 1
        ));
        assert_eq!(query::agent_view(&world).len(), 2);
    }

    #[test]
    fn field_following_agents_cannot_register_inside_walls() {
        let mut world = small_world();
        let events = register(&mut world, EnemyKind::Mouthy, 90.0, 40.0);
        assert_eq!(
            events,
            vec![Event::RegistrationRejected {
                position: Vec2::new(90.0, 40.0),
                reason: RegistrationError::OverlapsWall,
            }]
        );

        let flyer = register(&mut world, EnemyKind::Eyelet, 90.0, 40.0);
        assert!(matches!(flyer.as_slice(), [Event::AgentRegistered { .. }]));
    }

    #[test]
    fn invalid_profiles_are_rejected() {
        let mut world = small_world();
        let mut profile = EnemyKind::Robey.profile();
        profile.movement_speed = f32::NAN;
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::RegisterAgent {
                profile,
                position: Vec2::ZERO,
            },
            &mut events,
        )
        .expect("registration never fails");

        assert!(matches!(
            events.as_slice(),
            [Event::RegistrationRejected {
                reason: RegistrationError::InvalidProfile,
                ..
            }]
        ));
        assert!(query::agent_view(&world).is_empty());
    }

    #[test]
    fn unregistering_unknown_agent_is_rejected() {
        let mut world = small_world();
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::UnregisterAgent {
                agent: AgentId::new(7),
            },
            &mut events,
        )
        .expect("unregistration never fails");

        assert_eq!(
            events,
            vec![Event::UnregistrationRejected {
                agent: AgentId::new(7),
                reason: UnregistrationError::MissingAgent,
            }]
        );
    }

    #[test]
    fn tick_regenerates_fields_from_player_and_castle() {
        let mut world = small_world();
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::PlacePlayer {
                bounds: Bounds::from_xywh(164.0, 100.0, 16.0, 16.0),
            },
            &mut events,
        )
        .expect("placement");
        apply(
            &mut world,
            Command::Tick {
                dt: Duration::from_millis(16),
            },
            &mut events,
        )
        .expect("connected map");

        assert_eq!(
            events,
            vec![Event::TimeAdvanced {
                dt: Duration::from_millis(16)
            }]
        );
        let player = query::field(&world, FieldKind::FlowToPlayer);
        assert_eq!(player.targets(), &[CellCoord::new(5, 3)]);
        assert_eq!(player.force(CellCoord::new(0, 3)), Some(5));

        let castle = query::field(&world, FieldKind::FlowToCastle);
        assert_eq!(castle.force(CellCoord::new(0, 1)), Some(0));
        assert_eq!(castle.force(CellCoord::new(5, 3)), Some(7));
        assert_eq!(query::tick_index(&world), 1);
    }

    #[test]
    fn attack_requires_contact_and_respects_cooldown() {
        let mut world = small_world();
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::PlacePlayer {
                bounds: Bounds::from_xywh(170.0, 100.0, 16.0, 16.0),
            },
            &mut events,
        )
        .expect("placement");
        let _ = register(&mut world, EnemyKind::Eyeleen, 150.0, 96.0);
        let agent = AgentId::new(0);

        events.clear();
        apply(&mut world, Command::AttemptAttack { agent }, &mut events).expect("attack");
        apply(&mut world, Command::AttemptAttack { agent }, &mut events).expect("attack");
        assert_eq!(
            events,
            vec![Event::AgentAttacked {
                agent,
                target: TargetKind::Player,
            }]
        );
        assert!(!query::agent_view(&world).get(agent).expect("agent").attack_ready);

        apply(
            &mut world,
            Command::Tick {
                dt: Duration::from_secs(1),
            },
            &mut events,
        )
        .expect("tick");
        assert!(query::agent_view(&world).get(agent).expect("agent").attack_ready);
    }

    #[test]
    fn attack_out_of_reach_is_ignored() {
        let mut world = small_world();
        let _ = register(&mut world, EnemyKind::Eyeleen, 0.0, 100.0);
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::AttemptAttack {
                agent: AgentId::new(0),
            },
            &mut events,
        )
        .expect("attack");
        assert!(events.is_empty());
    }

    #[test]
    fn agents_far_outside_the_map_despawn_on_tick() {
        let mut world = small_world();
        let _ = register(&mut world, EnemyKind::Eyelet, 150.0, 0.0);
        let _ = register(&mut world, EnemyKind::Eyelet, 150.0, 0.0);
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::MoveAgent {
                agent: AgentId::new(1),
                delta: Vec2::new(500.0, 0.0),
            },
            &mut events,
        )
        .expect("move");

        events.clear();
        apply(
            &mut world,
            Command::Tick {
                dt: Duration::from_millis(16),
            },
            &mut events,
        )
        .expect("tick");

        assert_eq!(events[0], Event::AgentDespawned { agent: AgentId::new(1) });
        let remaining: Vec<_> = query::agent_view(&world)
            .iter()
            .map(|agent| agent.id)
            .collect();
        assert_eq!(remaining, vec![AgentId::new(0)]);
    }

    #[test]
    fn scrolling_moves_cells_agents_and_castle_together() {
        let mut world = small_world();
        let _ = register(&mut world, EnemyKind::Mouthy, 128.0, 96.0);
        let castle_before = query::castle_bounds(&world).expect("castle");
        let mut events = Vec::new();
        let delta = Vec2::new(-40.0, 10.0);
        apply(&mut world, Command::ScrollMap { delta }, &mut events).expect("scroll");

        assert_eq!(events, vec![Event::MapScrolled { origin: delta }]);
        let agent = *query::agent_view(&world)
            .get(AgentId::new(0))
            .expect("agent");
        assert_eq!(agent.bounds.origin(), Vec2::new(88.0, 106.0));
        assert_eq!(
            query::castle_bounds(&world),
            Some(castle_before.translated(delta))
        );
        let grid = query::grid(&world);
        assert_eq!(grid.cell_containing(agent.bounds.origin()), Some(CellCoord::new(4, 3)));
        assert_eq!(
            grid.cell_bounds(CellCoord::new(0, 0)),
            Some(Bounds::from_xywh(-40.0, 10.0, 32.0, 32.0))
        );
    }

    #[test]
    fn attack_hitboxes_report_overlapping_agents() {
        let mut world = small_world();
        let _ = register(&mut world, EnemyKind::Eyeleen, 100.0, 100.0);
        let _ = register(&mut world, EnemyKind::Eyeleen, 10.0, 10.0);
        let _ = register(&mut world, EnemyKind::Eyeleen, 110.0, 90.0);

        let hits = query::agents_hit_by(&world, &Bounds::from_xywh(95.0, 95.0, 20.0, 20.0));
        assert_eq!(hits, vec![AgentId::new(0), AgentId::new(2)]);
    }
}
