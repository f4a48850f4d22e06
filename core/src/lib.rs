#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Castle Siege navigation engine.
//!
//! This crate defines the message surface that connects the host adapter, the
//! authoritative world, and pure systems. Hosts submit [`Command`] values
//! describing desired mutations, the world executes those commands via its
//! `apply` entry point, and then broadcasts [`Event`] values for systems to
//! react to deterministically. Systems consume event streams, query immutable
//! snapshots, and respond exclusively with new command batches.

pub mod collision;

use std::time::Duration;

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Scalar applied to both axes of a diagonal flow direction.
///
/// Kept at `0.7` rather than `1/sqrt(2)` so diagonal movement matches the
/// established game feel.
pub const DIAGONAL_SCALAR: f32 = 0.7;

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Advances the simulation clock and regenerates the flow fields.
    Tick {
        /// Duration of simulated time that elapsed since the previous frame.
        dt: Duration,
    },
    /// Reports the player's current hitbox in world coordinates.
    PlacePlayer {
        /// Hitbox occupied by the player.
        bounds: Bounds,
    },
    /// Scrolls the map, shifting the grid origin and every agent.
    ScrollMap {
        /// Offset applied to the map origin and to all agents.
        delta: Vec2,
    },
    /// Requests that a new agent be registered with the engine.
    RegisterAgent {
        /// Movement and combat parameters of the agent.
        profile: AgentProfile,
        /// Upper-left corner of the agent's hitbox in world coordinates.
        position: Vec2,
    },
    /// Requests removal of an agent from the engine.
    UnregisterAgent {
        /// Identifier of the agent to remove.
        agent: AgentId,
    },
    /// Requests that an agent move by the provided offset.
    MoveAgent {
        /// Identifier of the agent to move.
        agent: AgentId,
        /// Offset applied to the agent's position.
        delta: Vec2,
    },
    /// Requests that an agent attack its target if its cooldown allows it.
    AttemptAttack {
        /// Identifier of the attacking agent.
        agent: AgentId,
    },
    /// Reports that an agent could not move on either axis this tick.
    ReportStall {
        /// Identifier of the stalled agent.
        agent: AgentId,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that the simulation clock advanced and the fields were rebuilt.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Announces the new map origin after a scroll.
    MapScrolled {
        /// World position of the grid's upper-left corner.
        origin: Vec2,
    },
    /// Confirms that an agent was registered.
    AgentRegistered {
        /// Identifier allocated to the agent.
        agent: AgentId,
        /// Hitbox occupied by the agent after registration.
        bounds: Bounds,
    },
    /// Reports that a registration request was rejected.
    RegistrationRejected {
        /// Position supplied with the request.
        position: Vec2,
        /// Specific reason the registration failed.
        reason: RegistrationError,
    },
    /// Confirms that an agent was removed on request.
    AgentUnregistered {
        /// Identifier of the removed agent.
        agent: AgentId,
    },
    /// Reports that an unregistration request was rejected.
    UnregistrationRejected {
        /// Identifier supplied with the request.
        agent: AgentId,
        /// Specific reason the removal failed.
        reason: UnregistrationError,
    },
    /// Reports that an agent left the playable area and was removed.
    AgentDespawned {
        /// Identifier of the removed agent.
        agent: AgentId,
    },
    /// Confirms that an agent moved.
    AgentMoved {
        /// Identifier of the agent that moved.
        agent: AgentId,
        /// Upper-left corner before the move.
        from: Vec2,
        /// Upper-left corner after the move.
        to: Vec2,
    },
    /// Reports that an agent is blocked on both axes.
    AgentStalled {
        /// Identifier of the stalled agent.
        agent: AgentId,
    },
    /// Confirms that an agent attacked its target.
    AgentAttacked {
        /// Identifier of the attacking agent.
        agent: AgentId,
        /// Target that received the attack.
        target: TargetKind,
    },
}

/// Unique identifier assigned to an agent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AgentId(u32);

impl AgentId {
    /// Creates a new agent identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Location of a single grid cell expressed as column and row coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    column: u32,
    row: u32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Returns the coordinate displaced by the provided column and row deltas.
    ///
    /// Yields `None` when the result would have a negative index.
    #[must_use]
    pub fn offset(self, columns: i32, rows: i32) -> Option<CellCoord> {
        let column = self.column.checked_add_signed(columns)?;
        let row = self.row.checked_add_signed(rows)?;
        Some(CellCoord::new(column, row))
    }
}

/// Static classification of a grid cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum CellKind {
    /// Walkable ground.
    #[default]
    Open,
    /// Impassable to ground movement.
    Wall,
    /// Part of the castle: a wall for movement, but a target for the castle field.
    CastleWall,
}

impl CellKind {
    /// Reports whether the cell blocks ground movement.
    #[must_use]
    pub const fn is_wall(self) -> bool {
        matches!(self, Self::Wall | Self::CastleWall)
    }

    /// Reports whether the cell belongs to the castle footprint.
    #[must_use]
    pub const fn is_castle(self) -> bool {
        matches!(self, Self::CastleWall)
    }
}

/// Logical layers maintained over the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Topology only; never carries force.
    Raw,
    /// Flow toward the cell containing the player.
    FlowToPlayer,
    /// Flow toward the castle footprint.
    FlowToCastle,
}

impl FieldKind {
    /// Every field kind in a stable order.
    pub const ALL: [FieldKind; 3] = [Self::Raw, Self::FlowToPlayer, Self::FlowToCastle];

    /// Reports whether a cell of the provided kind may carry force in this field.
    ///
    /// Castle cells are eligible only within the castle field; every other wall
    /// is ineligible everywhere.
    #[must_use]
    pub const fn admits(self, cell: CellKind) -> bool {
        match self {
            Self::Raw | Self::FlowToPlayer => !cell.is_wall(),
            Self::FlowToCastle => !cell.is_wall() || cell.is_castle(),
        }
    }
}

/// Symbolic flow direction stored on every forced cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Toward decreasing row indices.
    North,
    /// Toward decreasing rows and increasing columns.
    NorthEast,
    /// Toward increasing column indices.
    East,
    /// Toward increasing rows and columns.
    SouthEast,
    /// Toward increasing row indices.
    South,
    /// Toward increasing rows and decreasing columns.
    SouthWest,
    /// Toward decreasing column indices.
    West,
    /// Toward decreasing rows and columns.
    NorthWest,
    /// The cell is itself a target.
    Stationary,
}

impl Direction {
    /// Resolves the direction that leads from `from` to the adjacent cell `to`.
    ///
    /// Returns `None` when the cells are not 8-connected neighbours.
    #[must_use]
    pub fn between(from: CellCoord, to: CellCoord) -> Option<Direction> {
        let columns = i64::from(to.column()) - i64::from(from.column());
        let rows = i64::from(to.row()) - i64::from(from.row());
        match (columns, rows) {
            (0, -1) => Some(Self::North),
            (1, -1) => Some(Self::NorthEast),
            (1, 0) => Some(Self::East),
            (1, 1) => Some(Self::SouthEast),
            (0, 1) => Some(Self::South),
            (-1, 1) => Some(Self::SouthWest),
            (-1, 0) => Some(Self::West),
            (-1, -1) => Some(Self::NorthWest),
            _ => None,
        }
    }

    /// Velocity multiplier associated with the direction.
    #[must_use]
    pub fn velocity(self) -> Vec2 {
        let d = DIAGONAL_SCALAR;
        match self {
            Self::North => Vec2::new(0.0, -1.0),
            Self::NorthEast => Vec2::new(d, -d),
            Self::East => Vec2::new(1.0, 0.0),
            Self::SouthEast => Vec2::new(d, d),
            Self::South => Vec2::new(0.0, 1.0),
            Self::SouthWest => Vec2::new(-d, d),
            Self::West => Vec2::new(-1.0, 0.0),
            Self::NorthWest => Vec2::new(-d, -d),
            Self::Stationary => Vec2::ZERO,
        }
    }
}

/// Axis-aligned rectangle in world coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Bounds {
    origin: Vec2,
    size: Vec2,
}

impl Bounds {
    /// Creates a rectangle from its upper-left corner and size.
    #[must_use]
    pub const fn new(origin: Vec2, size: Vec2) -> Self {
        Self { origin, size }
    }

    /// Creates a rectangle from scalar components.
    #[must_use]
    pub const fn from_xywh(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            origin: Vec2::new(x, y),
            size: Vec2::new(width, height),
        }
    }

    /// Upper-left corner of the rectangle.
    #[must_use]
    pub const fn origin(&self) -> Vec2 {
        self.origin
    }

    /// Width and height of the rectangle.
    #[must_use]
    pub const fn size(&self) -> Vec2 {
        self.size
    }

    /// Lower-right corner of the rectangle.
    #[must_use]
    pub fn max(&self) -> Vec2 {
        self.origin + self.size
    }

    /// Centre point of the rectangle.
    #[must_use]
    pub fn center(&self) -> Vec2 {
        self.origin + self.size * 0.5
    }

    /// Returns the rectangle moved by the provided offset.
    #[must_use]
    pub fn translated(&self, delta: Vec2) -> Self {
        Self {
            origin: self.origin + delta,
            size: self.size,
        }
    }

    /// Returns the rectangle grown by `amount` on every side.
    #[must_use]
    pub fn inflated(&self, amount: f32) -> Self {
        Self {
            origin: self.origin - Vec2::splat(amount),
            size: self.size + Vec2::splat(amount * 2.0),
        }
    }

    /// Smallest rectangle containing both inputs.
    #[must_use]
    pub fn union(&self, other: &Bounds) -> Self {
        let min = self.origin.min(other.origin);
        let max = self.max().max(other.max());
        Self {
            origin: min,
            size: max - min,
        }
    }
}

/// Entity an agent pursues.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    /// The player character.
    Player,
    /// The castle footprint.
    Castle,
}

impl TargetKind {
    /// Field consulted by agents that follow flow fields toward this target.
    #[must_use]
    pub const fn field_kind(self) -> FieldKind {
        match self {
            Self::Player => FieldKind::FlowToPlayer,
            Self::Castle => FieldKind::FlowToCastle,
        }
    }
}

/// Movement strategies available to agents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementPolicy {
    /// Follows the target's flow field and slides along walls.
    FieldFollowing,
    /// Moves straight at the target, ignoring walls.
    DirectChase,
}

/// Static parameters describing how an agent moves and attacks.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AgentProfile {
    /// Width and height of the agent's hitbox.
    pub size: Vec2,
    /// Distance travelled per tick at full velocity.
    pub movement_speed: f32,
    /// Strategy used to steer the agent.
    pub policy: MovementPolicy,
    /// Entity the agent pursues.
    pub target: TargetKind,
    /// Minimum time between two successful attacks.
    pub attack_cooldown: Duration,
}

/// Enemy archetypes that waves may spawn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnemyKind {
    /// Flying eye that chases the player in a straight line.
    Eyelet,
    /// Ground walker that follows the flow field toward the player.
    Mouthy,
    /// Small flyer that chases the player in a straight line.
    Eyeleen,
    /// Tall flyer that chases the player in a straight line.
    Robey,
}

impl EnemyKind {
    /// Builds the agent profile used when spawning this kind.
    #[must_use]
    pub fn profile(self) -> AgentProfile {
        let (width, height, policy) = match self {
            Self::Eyelet => (40.0, 32.0, MovementPolicy::DirectChase),
            Self::Mouthy => (40.0, 32.0, MovementPolicy::FieldFollowing),
            Self::Eyeleen => (32.0, 18.0, MovementPolicy::DirectChase),
            Self::Robey => (26.0, 40.0, MovementPolicy::DirectChase),
        };
        AgentProfile {
            size: Vec2::new(width, height),
            movement_speed: 1.0,
            policy,
            target: TargetKind::Player,
            attack_cooldown: Duration::from_secs(1),
        }
    }
}

/// Reasons an agent registration may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RegistrationError {
    /// The profile has a non-positive size or a negative or non-finite speed.
    InvalidProfile,
    /// The requested hitbox overlaps a wall cell.
    OverlapsWall,
}

/// Reasons an agent removal may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UnregistrationError {
    /// No agent with the provided identifier exists.
    MissingAgent,
}

/// Immutable representation of a single agent's state used for queries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AgentSnapshot {
    /// Unique identifier assigned to the agent.
    pub id: AgentId,
    /// Hitbox currently occupied by the agent.
    pub bounds: Bounds,
    /// Offset applied by the most recent move.
    pub velocity: Vec2,
    /// Movement and combat parameters of the agent.
    pub profile: AgentProfile,
    /// Indicates whether the attack cooldown has elapsed.
    pub attack_ready: bool,
}

/// Read-only snapshot describing all registered agents.
#[derive(Clone, Debug, Default)]
pub struct AgentView {
    snapshots: Vec<AgentSnapshot>,
}

impl AgentView {
    /// Creates a new agent view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<AgentSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured agent snapshots in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = &AgentSnapshot> {
        self.snapshots.iter()
    }

    /// Looks up the snapshot captured for the provided agent.
    #[must_use]
    pub fn get(&self, agent: AgentId) -> Option<&AgentSnapshot> {
        self.snapshots
            .binary_search_by_key(&agent, |snapshot| snapshot.id)
            .ok()
            .map(|index| &self.snapshots[index])
    }

    /// Number of captured agents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Reports whether the view holds no agents.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<AgentSnapshot> {
        self.snapshots
    }
}
