use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use breach_core::UnitCatalog;
use breach_protocol::{decode_config, decode_frame, encode_orders, expects_orders, Frame, TurnOrders};
use breach_system_turn::TurnOrchestrator;
use breach_world::Arena;

/// Whether the exchange continues after a line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Flow {
    Continue,
    Stop,
}

/// One game against the engine: the catalog from the config line and the
/// orchestrator that plays every turn frame.
pub(crate) struct Session {
    orchestrator: TurnOrchestrator,
    catalog: Option<UnitCatalog>,
}

impl Session {
    pub(crate) fn new(orchestrator: TurnOrchestrator) -> Self {
        Self {
            orchestrator,
            catalog: None,
        }
    }

    /// Reads engine lines until the game ends or input closes.
    pub(crate) fn run(&mut self, input: impl BufRead, mut output: impl Write) -> Result<()> {
        for line in input.lines() {
            let line = line.context("failed to read engine message")?;
            if line.trim().is_empty() {
                continue;
            }
            if self.handle_line(&line, &mut output)? == Flow::Stop {
                log::info!("game over");
                break;
            }
        }
        Ok(())
    }

    pub(crate) fn handle_line(&mut self, line: &str, output: &mut impl Write) -> Result<Flow> {
        let Some(catalog) = self.catalog.as_ref() else {
            let catalog = decode_config(line).unwrap_or_else(|error| {
                log::warn!("could not decode game config, using built-in units: {error}");
                UnitCatalog::default()
            });
            self.catalog = Some(catalog);
            return Ok(Flow::Continue);
        };

        match decode_frame(line, catalog) {
            Ok(Frame::Turn(snapshot)) => {
                let mut arena = Arena::from_snapshot(catalog.clone(), snapshot);
                let report = self.orchestrator.play_turn(&mut arena);
                write_orders(output, &encode_orders(&report.commands, catalog))?;
            }
            Ok(Frame::Action { breaches }) => {
                for breach in &breaches {
                    self.orchestrator.record_breach(breach);
                }
            }
            Ok(Frame::GameOver) => return Ok(Flow::Stop),
            Err(error) if expects_orders(line) => {
                log::warn!("submitting an empty turn, frame did not decode: {error}");
                write_orders(output, &TurnOrders::empty())?;
            }
            Err(error) => log::warn!("skipping engine frame: {error}"),
        }
        Ok(Flow::Continue)
    }
}

fn write_orders(output: &mut impl Write, orders: &TurnOrders) -> Result<()> {
    writeln!(output, "{}", orders.build).context("failed to write build orders")?;
    writeln!(output, "{}", orders.deploy).context("failed to write deploy orders")?;
    output.flush().context("failed to flush orders")
}

#[cfg(test)]
mod tests {
    use super::*;
    use breach_system_turn::StrategyProfile;

    const CONFIG: &str = r#"{"unitInformation": []}"#;
    const OPENING: &str = r#"{"turnInfo": [0, 0, -1], "p1Stats": [30, 40, 5], "p2Stats": [30, 40, 5],
        "p1Units": [], "p2Units": []}"#;

    fn session(strategy: &str) -> Session {
        let profile = StrategyProfile::builtin(strategy).expect("built-in profile");
        Session::new(TurnOrchestrator::new(profile, 7))
    }

    fn play(session: &mut Session, lines: &[&str]) -> Vec<String> {
        let input = lines.join("\n");
        let mut output = Vec::new();
        session
            .run(input.as_bytes(), &mut output)
            .expect("session runs");
        String::from_utf8(output)
            .expect("orders are utf-8")
            .lines()
            .map(str::to_owned)
            .collect()
    }

    #[test]
    fn turn_frames_are_answered_with_two_lines() {
        let mut session = session("starter");
        let lines = play(
            &mut session,
            &[CONFIG, OPENING, r#"{"turnInfo": [1, 0, 3], "events": {"breach": []}}"#],
        );

        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("[[\"DF\""), "opening builds turrets: {}", lines[0]);
        assert!(lines[1].starts_with("[[\"EI\""), "starter stalls early: {}", lines[1]);
    }

    #[test]
    fn broken_turn_frames_still_get_an_empty_turn() {
        let mut session = session("viral");
        let lines = play(
            &mut session,
            &[CONFIG, r#"{"turnInfo": [0, 1, -1], "p1Stats": [30]}"#, "garbage"],
        );

        assert_eq!(lines, vec!["[]".to_owned(), "[]".to_owned()]);
    }

    #[test]
    fn action_breaches_reach_the_orchestrator() {
        let mut session = session("starter");
        let lines = play(
            &mut session,
            &[
                CONFIG,
                r#"{"turnInfo": [1, 0, 9], "events": {"breach": [[[3, 10], 3, 1.0, "5", 2], [[24, 17], 3, 1.0, "6", 1]]}}"#,
            ],
        );

        assert!(lines.is_empty());
        assert_eq!(session.orchestrator.breaches(), &[breach_core::Cell::new(3, 10)]);
    }

    #[test]
    fn game_over_stops_reading() {
        let mut session = session("wall");
        let lines = play(&mut session, &[CONFIG, r#"{"turnInfo": [2, 12, 0]}"#, OPENING]);
        assert!(lines.is_empty());
    }
}
