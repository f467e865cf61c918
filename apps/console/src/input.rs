use clap::{Parser, Subcommand};
use client_core::UserAction;
use shared::{
    domain::{MineId, RoverId},
    protocol::UpdateMineRequest,
};

/// One console line. The first word names the command.
#[derive(Parser, Debug)]
#[command(multicall = true)]
struct ConsoleLine {
    #[command(subcommand)]
    command: ConsoleCommand,
}

#[derive(Subcommand, Debug)]
enum ConsoleCommand {
    /// Reload the map
    Map,
    /// Reload the mine registry
    Mines,
    /// Reload the rover roster
    Rovers,
    /// Reload everything
    Refresh,
    /// Select a grid cell by its on-screen position (headers are row/column 0)
    Click { view_row: usize, view_col: usize },
    /// Place a mine; row and col default to the selected cell
    Mine {
        serial: i64,
        row: Option<i64>,
        col: Option<i64>,
    },
    /// Create a rover at the origin facing South
    Rover { commands: String },
    /// Run a rover's stored commands on the service
    Dispatch { id: i64 },
    /// Open a live session for a rover
    Open { id: i64 },
    /// Send one command code over the live session
    Send { code: String },
    /// Close the live session
    Close,
    /// Replace the map with an empty one of the given size
    Resize { rows: usize, cols: usize },
    /// Move a mine
    MoveMine { id: i64, row: i64, col: i64 },
    DeleteMine { id: i64 },
    UpdateRover { id: i64, commands: String },
    DeleteRover { id: i64 },
    /// Look a rover up (creating it when missing), dispatch it and report the outcome
    Simulate { id: i64, commands: Option<String> },
    /// Check a disarm PIN for a mine serial
    VerifyPin { serial: String, pin: String },
    /// Search the disarm PIN for a mine serial
    FindPin { serial: String },
    Quit,
}

#[derive(Debug, PartialEq, Eq)]
pub enum ParsedLine {
    Empty,
    Action(UserAction),
    /// Help or a usage error to show the user.
    Message(String),
}

pub fn parse_line(line: &str) -> ParsedLine {
    let words: Vec<&str> = line.split_whitespace().collect();
    match words.as_slice() {
        [] => return ParsedLine::Empty,
        // A lone character is a command code for the live session.
        [code] if code.chars().count() == 1 => {
            return ParsedLine::Action(UserAction::SendCommand((*code).to_string()))
        }
        _ => {}
    }

    match ConsoleLine::try_parse_from(words) {
        Ok(parsed) => ParsedLine::Action(parsed.command.into_action()),
        Err(err) => ParsedLine::Message(err.render().to_string()),
    }
}

impl ConsoleCommand {
    fn into_action(self) -> UserAction {
        match self {
            Self::Map => UserAction::RefreshMap,
            Self::Mines => UserAction::RefreshMines,
            Self::Rovers => UserAction::RefreshRovers,
            Self::Refresh => UserAction::RefreshAll,
            Self::Click { view_row, view_col } => UserAction::SelectCell { view_row, view_col },
            Self::Mine { serial, row, col } => UserAction::CreateMine { serial, row, col },
            Self::Rover { commands } => UserAction::CreateRover { commands },
            Self::Dispatch { id } => UserAction::DispatchRover(RoverId(id)),
            Self::Open { id } => UserAction::OpenSession(RoverId(id)),
            Self::Send { code } => UserAction::SendCommand(code),
            Self::Close => UserAction::CloseSession,
            Self::Resize { rows, cols } => UserAction::ResizeMap { rows, cols },
            Self::MoveMine { id, row, col } => UserAction::UpdateMine {
                id: MineId(id),
                request: UpdateMineRequest {
                    row: Some(row),
                    col: Some(col),
                    serial_num: None,
                },
            },
            Self::DeleteMine { id } => UserAction::DeleteMine(MineId(id)),
            Self::UpdateRover { id, commands } => UserAction::UpdateRover {
                id: RoverId(id),
                commands,
            },
            Self::DeleteRover { id } => UserAction::DeleteRover(RoverId(id)),
            Self::Simulate { id, commands } => UserAction::Simulate {
                id: RoverId(id),
                commands,
            },
            Self::VerifyPin { serial, pin } => UserAction::VerifyPin { serial, pin },
            Self::FindPin { serial } => UserAction::FindPin { serial },
            Self::Quit => UserAction::Quit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn action(line: &str) -> UserAction {
        match parse_line(line) {
            ParsedLine::Action(action) => action,
            other => panic!("expected action for {line:?}, got {other:?}"),
        }
    }

    #[test]
    fn blank_lines_are_ignored() {
        assert_eq!(parse_line("   "), ParsedLine::Empty);
    }

    #[test]
    fn single_character_is_a_live_command() {
        assert_eq!(action("F"), UserAction::SendCommand("F".into()));
        assert_eq!(action(" m "), UserAction::SendCommand("m".into()));
        assert_eq!(action("send L"), UserAction::SendCommand("L".into()));
    }

    #[test]
    fn mine_coordinates_are_optional() {
        assert_eq!(
            action("mine 5 2 3"),
            UserAction::CreateMine {
                serial: 5,
                row: Some(2),
                col: Some(3)
            }
        );
        assert_eq!(
            action("mine 5"),
            UserAction::CreateMine {
                serial: 5,
                row: None,
                col: None
            }
        );
    }

    #[test]
    fn multi_word_commands_use_kebab_case() {
        assert_eq!(action("open 7"), UserAction::OpenSession(RoverId(7)));
        assert_eq!(action("delete-rover 3"), UserAction::DeleteRover(RoverId(3)));
        assert_eq!(
            action("verify-pin MINE-1 1234"),
            UserAction::VerifyPin {
                serial: "MINE-1".into(),
                pin: "1234".into()
            }
        );
        assert_eq!(
            action("simulate 4"),
            UserAction::Simulate {
                id: RoverId(4),
                commands: None
            }
        );
    }

    #[test]
    fn malformed_lines_produce_a_message() {
        assert!(matches!(parse_line("open seven"), ParsedLine::Message(_)));
        assert!(matches!(parse_line("launch 3"), ParsedLine::Message(_)));
        assert!(matches!(parse_line("help"), ParsedLine::Message(_)));
    }
}
