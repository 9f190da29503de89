use breach_core::{BreachEvent, Cell, PlayerStats, Resources, Side, UnitCatalog, UnitKind};
use breach_world::{ArenaSnapshot, PlacedUnit};
use serde::Deserialize;
use serde_json::Value;

use crate::ProtocolError;

const REMOVAL_GROUP: usize = 6;
const UPGRADE_GROUP: usize = 7;

/// Decoded engine frame.
#[derive(Clone, Debug, PartialEq)]
pub enum Frame {
    /// Start of a turn; the engine waits for our orders.
    Turn(ArenaSnapshot),
    /// Simulation frame of the action phase.
    Action {
        /// Breaches reported by the frame.
        breaches: Vec<BreachEvent>,
    },
    /// The game is over.
    GameOver,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFrame {
    turn_info: Vec<i64>,
    #[serde(default)]
    p1_stats: Vec<f32>,
    #[serde(default)]
    p2_stats: Vec<f32>,
    #[serde(default)]
    p1_units: Vec<Vec<Value>>,
    #[serde(default)]
    p2_units: Vec<Vec<Value>>,
    #[serde(default)]
    events: RawEvents,
}

#[derive(Default, Deserialize)]
struct RawEvents {
    #[serde(default)]
    breach: Vec<Vec<Value>>,
}

/// Reports whether the line announces a turn that needs orders back.
///
/// Used to keep the exchange in step when a turn frame fails to decode.
#[must_use]
pub fn expects_orders(line: &str) -> bool {
    serde_json::from_str::<Value>(line)
        .ok()
        .and_then(|frame| frame.get("turnInfo")?.get(0)?.as_i64())
        == Some(0)
}

/// Decodes one engine frame line.
pub fn decode_frame(line: &str, catalog: &UnitCatalog) -> Result<Frame, ProtocolError> {
    let raw: RawFrame = serde_json::from_str(line)?;
    let phase = *raw.turn_info.first().ok_or(ProtocolError::MissingTurnInfo("phase"))?;
    match phase {
        0 => decode_turn(&raw).map(Frame::Turn),
        1 => {
            let breaches = raw
                .events
                .breach
                .iter()
                .map(|entry| decode_breach(entry, catalog))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Frame::Action { breaches })
        }
        2 => Ok(Frame::GameOver),
        other => Err(ProtocolError::UnknownPhase(other)),
    }
}

fn decode_turn(raw: &RawFrame) -> Result<ArenaSnapshot, ProtocolError> {
    let turn = raw
        .turn_info
        .get(1)
        .and_then(|turn| u32::try_from(*turn).ok())
        .ok_or(ProtocolError::MissingTurnInfo("turn"))?;

    let mut units = decode_units(&raw.p1_units, Side::Friendly)?;
    units.extend(decode_units(&raw.p2_units, Side::Enemy)?);

    Ok(ArenaSnapshot {
        turn,
        friendly: decode_stats(&raw.p1_stats, 1)?,
        enemy: decode_stats(&raw.p2_stats, 2)?,
        units,
    })
}

fn decode_stats(values: &[f32], player: u8) -> Result<PlayerStats, ProtocolError> {
    match values {
        [health, structure, mobile, ..] => Ok(PlayerStats {
            health: *health,
            resources: Resources::new(*structure, *mobile),
        }),
        _ => Err(ProtocolError::ShortStats {
            player,
            found: values.len(),
        }),
    }
}

fn decode_units(groups: &[Vec<Value>], owner: Side) -> Result<Vec<PlacedUnit>, ProtocolError> {
    let mut units: Vec<PlacedUnit> = Vec::new();
    for (index, group) in groups.iter().enumerate() {
        for entry in group {
            let (cell, health) = decode_unit_entry(entry)?;
            match (UnitKind::from_index(index), index) {
                (Some(kind), _) => units.push(PlacedUnit::new(cell, kind, owner).with_health(health)),
                (None, REMOVAL_GROUP) => {
                    if let Some(unit) = stationary_at(&mut units, cell) {
                        unit.pending_removal = true;
                    }
                }
                (None, UPGRADE_GROUP) => {
                    if let Some(unit) = stationary_at(&mut units, cell) {
                        unit.upgraded = true;
                    }
                }
                (None, _) => log::warn!("ignoring unit group {index} at {cell:?}"),
            }
        }
    }
    Ok(units)
}

fn stationary_at(units: &mut [PlacedUnit], cell: Cell) -> Option<&mut PlacedUnit> {
    units
        .iter_mut()
        .find(|unit| unit.cell == cell && unit.kind.is_stationary())
}

fn decode_unit_entry(entry: &Value) -> Result<(Cell, f32), ProtocolError> {
    let malformed = || ProtocolError::MalformedUnit(entry.to_string());
    let fields = entry.as_array().ok_or_else(malformed)?;
    let coordinate = |index: usize| {
        fields
            .get(index)
            .and_then(Value::as_i64)
            .and_then(|value| i32::try_from(value).ok())
    };
    let x = coordinate(0).ok_or_else(malformed)?;
    let y = coordinate(1).ok_or_else(malformed)?;
    let health = fields
        .get(2)
        .and_then(Value::as_f64)
        .ok_or_else(malformed)?;
    Ok((Cell::new(x, y), health as f32))
}

fn decode_breach(entry: &[Value], catalog: &UnitCatalog) -> Result<BreachEvent, ProtocolError> {
    let malformed = || ProtocolError::MalformedBreach(Value::Array(entry.to_vec()).to_string());
    let [location, unit_type, damage, unit_id, owner, ..] = entry else {
        return Err(malformed());
    };

    let cell = location
        .as_array()
        .and_then(|xy| match xy.as_slice() {
            [x, y, ..] => Some(Cell::new(
                i32::try_from(x.as_i64()?).ok()?,
                i32::try_from(y.as_i64()?).ok()?,
            )),
            _ => None,
        })
        .ok_or_else(malformed)?;
    let kind = match unit_type {
        Value::Number(index) => index
            .as_u64()
            .and_then(|index| UnitKind::from_index(usize::try_from(index).ok()?)),
        Value::String(shorthand) => catalog.kind_for_shorthand(shorthand),
        _ => None,
    }
    .ok_or_else(|| ProtocolError::UnknownUnitType(unit_type.to_string()))?;
    let owner = match owner.as_i64() {
        Some(1) => Side::Friendly,
        Some(2) => Side::Enemy,
        _ => return Err(ProtocolError::InvalidBreachOwner(owner.to_string())),
    };
    let unit_id = match unit_id {
        Value::String(id) => id.clone(),
        other => other.to_string(),
    };

    Ok(BreachEvent {
        cell,
        kind,
        damage: damage.as_f64().ok_or_else(malformed)? as f32,
        unit_id,
        owner,
    })
}
