//! Live control session for a single rover.
//!
//! The service answers every command with exactly one event on the same connection
//! and carries no request identifiers, so events are paired with sent commands by
//! arrival order. Each sent command gets a local sequence number; the oldest pending
//! one is matched against every decoded event and mismatches are logged.

use std::collections::VecDeque;

use chrono::Utc;
use shared::{
    domain::{CommandCode, RoverId},
    protocol::RoverEvent,
};
use tracing::{debug, info, warn};

use crate::{
    dashboard::EventLogEntry,
    error::SessionError,
    sync::RefreshSet,
    transport::{LinkSignal, LiveLink},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Closed,
    Connecting,
    Open,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionPhase {
    pub connection: ConnectionState,
    pub halted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SentCommand {
    pub seq: u64,
    pub code: CommandCode,
}

/// What the controller must do in response to one inbound event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventOutcome {
    pub entry: EventLogEntry,
    pub refresh: RefreshSet,
    /// `(x, y)` of a detonation to mark on the grid.
    pub detonation: Option<(i64, i64)>,
    /// True only for the event that moved the session into the halted state.
    pub newly_halted: bool,
}

pub struct CommandSession {
    rover_id: RoverId,
    connection: ConnectionState,
    halted: bool,
    last_command_sent: Option<CommandCode>,
    next_seq: u64,
    in_flight: VecDeque<SentCommand>,
    link: Option<LiveLink>,
    used: bool,
}

impl CommandSession {
    pub fn new(rover_id: RoverId) -> Self {
        Self {
            rover_id,
            connection: ConnectionState::Closed,
            halted: false,
            last_command_sent: None,
            next_seq: 1,
            in_flight: VecDeque::new(),
            link: None,
            used: false,
        }
    }

    pub fn rover_id(&self) -> RoverId {
        self.rover_id
    }

    pub fn phase(&self) -> SessionPhase {
        SessionPhase {
            connection: self.connection,
            halted: self.halted,
        }
    }

    pub fn is_open(&self) -> bool {
        self.connection == ConnectionState::Open
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn last_command_sent(&self) -> Option<CommandCode> {
        self.last_command_sent
    }

    pub fn pending(&self) -> impl Iterator<Item = &SentCommand> {
        self.in_flight.iter()
    }

    /// Closed → Connecting. A session instance connects at most once.
    pub fn begin_connect(&mut self) -> Result<SessionPhase, SessionError> {
        if self.used || self.connection != ConnectionState::Closed {
            return Err(SessionError::Connect(format!(
                "session for rover {} was already started",
                self.rover_id
            )));
        }
        self.used = true;
        self.connection = ConnectionState::Connecting;
        Ok(self.phase())
    }

    /// Connecting → Open.
    pub fn attach(&mut self, link: LiveLink) -> SessionPhase {
        if self.connection == ConnectionState::Connecting {
            self.link = Some(link);
            self.connection = ConnectionState::Open;
            info!(rover_id = self.rover_id.0, "live session open");
        }
        self.phase()
    }

    /// Connecting → Closed after a failed handshake.
    pub fn fail_connect(&mut self) -> SessionPhase {
        if self.connection == ConnectionState::Connecting {
            self.connection = ConnectionState::Closed;
        }
        self.phase()
    }

    /// Transmits one command code. Never queues: anything but an open session rejects
    /// without touching `last_command_sent` or the sequence counter.
    pub fn send(&mut self, raw: &str) -> Result<SentCommand, SessionError> {
        if self.connection != ConnectionState::Open {
            return Err(SessionError::NotConnected);
        }
        let code = CommandCode::parse(raw)?;
        let link = self.link.as_ref().ok_or(SessionError::NotConnected)?;
        if !link.transmit(code.to_string()) {
            return Err(SessionError::NotConnected);
        }

        let sent = SentCommand {
            seq: self.next_seq,
            code,
        };
        self.next_seq += 1;
        self.last_command_sent = Some(code);
        self.in_flight.push_back(sent);
        debug!(
            rover_id = self.rover_id.0,
            seq = sent.seq,
            command = %code,
            "command sent"
        );
        Ok(sent)
    }

    /// Records and classifies one inbound frame. Every frame answers the oldest
    /// pending command, whether or not it decodes.
    pub fn receive(&mut self, raw: &str) -> EventOutcome {
        let answered = self.in_flight.pop_front();
        let mut event = match serde_json::from_str::<RoverEvent>(raw) {
            Ok(event) => event,
            Err(err) => {
                warn!(rover_id = self.rover_id.0, %err, "undecodable live event");
                return EventOutcome {
                    entry: log_entry(
                        answered.map(|sent| sent.seq),
                        raw,
                        format!("⚠️ Unrecognized event: {err}"),
                    ),
                    refresh: RefreshSet::NONE,
                    detonation: None,
                    newly_halted: false,
                };
            }
        };

        match (answered, event.command) {
            (Some(sent), Some(command)) if sent.code != command => warn!(
                rover_id = self.rover_id.0,
                seq = sent.seq,
                expected = %sent.code,
                received = %command,
                "event does not echo the oldest pending command"
            ),
            // Events that omit `command` answer whatever was sent last.
            (_, None) => {
                event.command = answered.map(|sent| sent.code).or(self.last_command_sent);
            }
            _ => {}
        }

        let refresh = if event.is_successful_result() {
            RefreshSet::MAP_AND_MINES
        } else {
            RefreshSet::NONE
        };

        let mut detonation = None;
        let mut newly_halted = false;
        if event.reports_mine() && event.command != Some(CommandCode::DISARM) {
            detonation = event.x.zip(event.y);
            newly_halted = !self.halted;
            self.halted = true;
            warn!(
                rover_id = self.rover_id.0,
                x = ?event.x,
                y = ?event.y,
                "mine triggered; rover halted"
            );
        }

        if let Some(command) = event.command {
            self.last_command_sent = Some(command);
        }

        EventOutcome {
            entry: log_entry(answered.map(|sent| sent.seq), raw, event.summary()),
            refresh,
            detonation,
            newly_halted,
        }
    }

    /// Any state → Closed. Returns false when already closed.
    pub fn close(&mut self) -> bool {
        if self.connection == ConnectionState::Closed {
            return false;
        }
        self.connection = ConnectionState::Closed;
        self.link = None;
        self.in_flight.clear();
        info!(rover_id = self.rover_id.0, "live session closed");
        true
    }

    /// Next signal from the connection; never resolves while no link is attached.
    pub async fn next_signal(&mut self) -> LinkSignal {
        match self.link.as_mut() {
            Some(link) => link.recv().await,
            None => std::future::pending().await,
        }
    }
}

fn log_entry(seq: Option<u64>, raw: &str, summary: String) -> EventLogEntry {
    EventLogEntry {
        received_at: Utc::now(),
        seq,
        raw: raw.to_string(),
        summary,
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
