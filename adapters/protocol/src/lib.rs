#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Line-oriented JSON protocol spoken with the game engine.
//!
//! The engine sends one configuration line at startup, then a stream of
//! frames. Turn frames become [`ArenaSnapshot`]s, action frames become
//! breach events. Orders are written back as two lines per turn: the build
//! list for structures, upgrades and removals, then the deploy list with one
//! entry per mobile unit.

mod config;
mod frame;

use breach_core::{Cell, Command, UnitCatalog};
use serde_json::{json, Value};
use thiserror::Error;

pub use breach_world::ArenaSnapshot;
pub use config::decode_config;
pub use frame::{decode_frame, expects_orders, Frame};

/// Errors raised while decoding engine messages.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The line is not the JSON the engine is expected to send.
    #[error("malformed engine message: {0}")]
    Json(#[from] serde_json::Error),
    /// `turnInfo` lacks a required value.
    #[error("turn info is missing the {0}")]
    MissingTurnInfo(&'static str),
    /// `turnInfo` names a phase the protocol does not define.
    #[error("unknown frame phase {0}")]
    UnknownPhase(i64),
    /// A player stats array is too short.
    #[error("stats of player {player} hold {found} values, expected at least 3")]
    ShortStats {
        /// Engine player number, 1 or 2.
        player: u8,
        /// Values present.
        found: usize,
    },
    /// A unit entry is not `[x, y, health, id]`.
    #[error("malformed unit entry {0}")]
    MalformedUnit(String),
    /// A breach entry is not `[location, unit type, damage, id, owner]`.
    #[error("malformed breach entry {0}")]
    MalformedBreach(String),
    /// A breach names a unit type the catalog does not know.
    #[error("unknown unit type {0}")]
    UnknownUnitType(String),
    /// A breach owner is neither 1 nor 2.
    #[error("breach owner {0} is neither 1 nor 2")]
    InvalidBreachOwner(String),
}

/// Orders for one turn, ready to be written as two lines.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TurnOrders {
    /// Structures, upgrades and removals.
    pub build: String,
    /// Mobile units, one entry per unit.
    pub deploy: String,
}

impl TurnOrders {
    /// Orders that do nothing, submitted when a turn cannot be played.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            build: "[]".to_owned(),
            deploy: "[]".to_owned(),
        }
    }
}

fn order(shorthand: &str, cell: Cell) -> Value {
    json!([shorthand, cell.x(), cell.y()])
}

/// Encodes accepted commands into the engine's two order lines.
#[must_use]
pub fn encode_orders(commands: &[Command], catalog: &UnitCatalog) -> TurnOrders {
    let mut build = Vec::new();
    let mut deploy = Vec::new();

    for command in commands {
        match command {
            Command::Spawn { kind, cell, count } if kind.is_stationary() => {
                build.extend((0..*count).map(|_| order(catalog.shorthand(*kind), *cell)));
            }
            Command::Spawn { kind, cell, count } => {
                deploy.extend((0..*count).map(|_| order(catalog.shorthand(*kind), *cell)));
            }
            Command::Upgrade { cell } => build.push(order(catalog.upgrade_shorthand(), *cell)),
            Command::Remove { cell } => build.push(order(catalog.remove_shorthand(), *cell)),
        }
    }

    TurnOrders {
        build: Value::Array(build).to_string(),
        deploy: Value::Array(deploy).to_string(),
    }
}
