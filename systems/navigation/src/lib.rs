#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic navigation system that steers agents toward their targets.
//!
//! Field-following agents read directions from the flow field of their
//! target and never step into a wall: every candidate move is checked by a
//! one-step lookahead before it is proposed. Direct-chase agents fly straight
//! at their target. Agents already touching their target attack instead of
//! moving.

use std::collections::BTreeMap;

use castle_siege_core::{
    collision, AgentId, AgentSnapshot, AgentView, Bounds, CellCoord, Command, Direction, Event,
    MovementPolicy, TargetKind,
};
use castle_siege_world::{Field, FieldSet, Grid};
use glam::Vec2;
use tracing::trace;

/// Distance between consecutive line-of-sight probes, in pixels.
pub const LINE_OF_SIGHT_STRIDE: f32 = 50.0;

/// Hitboxes of the entities agents may pursue.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TargetBounds {
    /// Hitbox of the player.
    pub player: Bounds,
    /// Hitbox of the castle, if the map has one.
    pub castle: Option<Bounds>,
}

impl TargetBounds {
    /// Hitbox of the provided target kind.
    #[must_use]
    pub fn get(&self, target: TargetKind) -> Option<Bounds> {
        match target {
            TargetKind::Player => Some(self.player),
            TargetKind::Castle => self.castle,
        }
    }
}

/// Outcome of the per-axis lookahead.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CollisionPrediction {
    /// Moving along the X axis alone would overlap a wall.
    pub x: bool,
    /// Moving along the Y axis alone would overlap a wall.
    pub y: bool,
    /// First wall hit by the X-only move.
    pub wall_x: Option<Bounds>,
    /// First wall hit by the Y-only move.
    pub wall_y: Option<Bounds>,
}

/// Tests the X and Y components of `velocity` separately against every wall.
#[must_use]
pub fn predict_collision(bounds: &Bounds, velocity: Vec2, walls: &[Bounds]) -> CollisionPrediction {
    let along_x = bounds.translated(Vec2::new(velocity.x, 0.0));
    let along_y = bounds.translated(Vec2::new(0.0, velocity.y));
    let wall_x = collision::first_overlap(&along_x, walls).copied();
    let wall_y = collision::first_overlap(&along_y, walls).copied();

    CollisionPrediction {
        x: wall_x.is_some(),
        y: wall_y.is_some(),
        wall_x,
        wall_y,
    }
}

/// Walks agent-sized probes from `bounds` toward `target` every
/// [`LINE_OF_SIGHT_STRIDE`] pixels.
///
/// Returns `true` when a probe reaches the target before any probe touches a
/// wall. Probing gives up once it has passed the target distance by a stride
/// or left `area`. Walls thinner than the stride may be skipped.
#[must_use]
pub fn line_of_sight(bounds: &Bounds, target: &Bounds, walls: &[Bounds], area: &Bounds) -> bool {
    let offset = target.center() - bounds.center();
    let heading = offset.normalize_or_zero();
    let reach = offset.length() + LINE_OF_SIGHT_STRIDE;

    let mut travelled = 0.0;
    while travelled <= reach {
        let probe = bounds.translated(heading * travelled);
        if !collision::overlaps(&probe, area) {
            return false;
        }
        if collision::first_overlap(&probe, walls).is_some() {
            return false;
        }
        if collision::overlaps(&probe, target) {
            return true;
        }
        if heading == Vec2::ZERO {
            return false;
        }
        travelled += LINE_OF_SIGHT_STRIDE;
    }

    false
}

/// Pure system that reacts to world events and emits movement and attack commands.
#[derive(Debug, Default)]
pub struct Navigation {
    remembered: BTreeMap<AgentId, RememberedCell>,
}

impl Navigation {
    /// Consumes world events and immutable views to emit agent commands.
    ///
    /// Agents are steered only on ticks that advanced time.
    pub fn handle(
        &mut self,
        events: &[Event],
        agent_view: &AgentView,
        grid: &Grid,
        fields: &FieldSet,
        targets: &TargetBounds,
        out: &mut Vec<Command>,
    ) {
        for event in events {
            match event {
                Event::AgentUnregistered { agent } | Event::AgentDespawned { agent } => {
                    let _ = self.remembered.remove(agent);
                }
                _ => {}
            }
        }

        if !events
            .iter()
            .any(|event| matches!(event, Event::TimeAdvanced { .. }))
        {
            return;
        }

        self.remembered
            .retain(|agent, _| agent_view.get(*agent).is_some());

        for agent in agent_view.iter() {
            let Some(target) = targets.get(agent.profile.target) else {
                continue;
            };

            if collision::overlaps(&agent.bounds, &target) {
                if agent.attack_ready {
                    out.push(Command::AttemptAttack { agent: agent.id });
                }
                continue;
            }

            match agent.profile.policy {
                MovementPolicy::DirectChase => chase_directly(agent, &target, out),
                MovementPolicy::FieldFollowing => {
                    let field = fields.get(agent.profile.target.field_kind());
                    self.follow_field(agent, &target, grid, field, out);
                }
            }
        }
    }

    /// Steps a field-following agent along its flow field, or straight at the
    /// target when it is in sight.
    ///
    /// An agent whose centre sits in the target's own (stationary) cell but
    /// does not touch the target stays put unless line of sight picks it up;
    /// with a 50 px stride the probe can overshoot a target only a few pixels
    /// away.
    fn follow_field(
        &mut self,
        agent: &AgentSnapshot,
        target: &Bounds,
        grid: &Grid,
        field: &Field,
        out: &mut Vec<Command>,
    ) {
        let walls = grid.wall_bounds();
        let area = grid.bounds();
        let speed = agent.profile.movement_speed;

        let step = if line_of_sight(&agent.bounds, target, walls, &area) {
            heading(&agent.bounds, target) * speed
        } else {
            match self.current_direction(agent, grid, field) {
                Some(direction) if direction != Direction::Stationary => {
                    direction.velocity() * speed
                }
                _ => return,
            }
        };

        if step == Vec2::ZERO {
            return;
        }

        match resolve_step(&agent.bounds, step, speed, walls, &area) {
            Step::Move(delta) => out.push(Command::MoveAgent {
                agent: agent.id,
                delta,
            }),
            Step::Stalled => out.push(Command::ReportStall { agent: agent.id }),
        }
    }

    /// Refreshes the remembered cell and returns its current direction.
    fn current_direction(
        &mut self,
        agent: &AgentSnapshot,
        grid: &Grid,
        field: &Field,
    ) -> Option<Direction> {
        let sampled = grid.cell_containing(agent.bounds.center());

        let keep = self.remembered.get(&agent.id).is_some_and(|remembered| {
            field.direction(remembered.cell) == remembered.direction
                && grid
                    .cell_bounds(remembered.cell)
                    .is_some_and(|cell| collision::overlaps(&agent.bounds, &cell))
        });

        if !keep {
            match sampled {
                Some(cell) => {
                    trace!(
                        agent = agent.id.get(),
                        column = cell.column(),
                        row = cell.row(),
                        "following new cell"
                    );
                    let _ = self.remembered.insert(
                        agent.id,
                        RememberedCell {
                            cell,
                            direction: field.direction(cell),
                        },
                    );
                }
                None => {
                    let _ = self.remembered.remove(&agent.id);
                }
            }
        }

        self.remembered
            .get(&agent.id)
            .and_then(|remembered| field.direction(remembered.cell))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct RememberedCell {
    cell: CellCoord,
    direction: Option<Direction>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Step {
    Move(Vec2),
    Stalled,
}

fn heading(from: &Bounds, to: &Bounds) -> Vec2 {
    (to.center() - from.center()).normalize_or_zero()
}

fn chase_directly(agent: &AgentSnapshot, target: &Bounds, out: &mut Vec<Command>) {
    let delta = heading(&agent.bounds, target) * agent.profile.movement_speed;
    if delta != Vec2::ZERO {
        out.push(Command::MoveAgent {
            agent: agent.id,
            delta,
        });
    }
}

/// Turns a desired step into a wall-free move that stays on the map.
///
/// A step that would cut into a wall is first shortened so the agent ends flush
/// against it. Once flush, the blocked axis is dropped and the open axis is
/// driven at full speed, away from the wall that blocked the other axis. Both
/// axes blocked means a stall, as does a slide that would leave `area`.
fn resolve_step(
    bounds: &Bounds,
    step: Vec2,
    speed: f32,
    walls: &[Bounds],
    area: &Bounds,
) -> Step {
    let prediction = predict_collision(bounds, step, walls);

    let approach = Vec2::new(
        prediction.wall_x.map_or(0.0, |wall| {
            gap(bounds.origin().x, bounds.max().x, wall.origin().x, wall.max().x, step.x)
        }),
        prediction.wall_y.map_or(0.0, |wall| {
            gap(bounds.origin().y, bounds.max().y, wall.origin().y, wall.max().y, step.y)
        }),
    );
    if approach != Vec2::ZERO && is_clear(bounds, approach, walls, area) {
        return Step::Move(approach);
    }

    let delta = match (prediction.wall_x, prediction.wall_y) {
        (Some(_), Some(_)) => return Step::Stalled,
        (None, None) => {
            if is_clear(bounds, step, walls, area) {
                step
            } else {
                Vec2::new(step.x, 0.0)
            }
        }
        (Some(wall), None) => {
            let upward = if step.y != 0.0 {
                step.y < 0.0
            } else {
                bounds.origin().y < wall.origin().y
            };
            Vec2::new(0.0, if upward { -speed } else { speed })
        }
        (None, Some(wall)) => {
            let leftward = if step.x != 0.0 {
                step.x < 0.0
            } else {
                bounds.origin().x < wall.origin().x
            };
            Vec2::new(if leftward { -speed } else { speed }, 0.0)
        }
    };

    if delta == Vec2::ZERO || !is_clear(bounds, delta, walls, area) {
        return Step::Stalled;
    }
    Step::Move(delta)
}

/// Signed distance along one axis between the agent's leading edge and `wall`.
fn gap(start: f32, end: f32, wall_start: f32, wall_end: f32, direction: f32) -> f32 {
    if direction < 0.0 {
        -(start - wall_end).max(0.0)
    } else if direction > 0.0 {
        (wall_start - end).max(0.0)
    } else {
        0.0
    }
}

/// A move is clear when it touches no wall and does not carry an agent that
/// is on the map off it.
fn is_clear(bounds: &Bounds, delta: Vec2, walls: &[Bounds], area: &Bounds) -> bool {
    let moved = bounds.translated(delta);
    collision::first_overlap(&moved, walls).is_none()
        && (!collision::contains(area, bounds) || collision::contains(area, &moved))
}
