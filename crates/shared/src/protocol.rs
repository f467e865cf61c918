use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};

use crate::domain::{CommandCode, Direction, Grid, Mine, MineId, Rover, RoverId};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapResponse {
    pub map: Grid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MinesResponse {
    pub mines: Vec<Mine>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoversResponse {
    pub rovers: Vec<Rover>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResizeMapRequest {
    pub row: usize,
    pub col: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateMineRequest {
    pub row: i64,
    pub col: i64,
    #[serde(rename = "serialNum")]
    pub serial_num: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateMineRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub col: Option<i64>,
    #[serde(
        rename = "serialNum",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub serial_num: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRoverRequest {
    pub commands: String,
    pub x: i64,
    pub y: i64,
    pub direction: Direction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateRoverRequest {
    pub commands: String,
}

/// Body of every mutating endpoint: a human-readable message plus whatever id the
/// endpoint assigned.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRoverResponse {
    #[serde(default)]
    pub message: String,
    pub id: RoverId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchResponse {
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rover: Option<Rover>,
}

/// Event pushed by the service on a live rover session.
///
/// The service answers every inbound command with one event. Movement results carry
/// `result`; mine reports carry `mine` and, on a detonation, the `x`/`y` of the cell.
/// A field holding a value of the wrong shape decodes as absent, so one odd field
/// never hides the rest of the event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoverEvent {
    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub command: Option<CommandCode>,
    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub result: Option<bool>,
    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub mine: Option<bool>,
    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub x: Option<i64>,
    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub y: Option<i64>,
    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub direction: Option<Direction>,
    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub new_position: Option<(i64, i64)>,
    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub pin: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub error: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub message: Option<String>,
}

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

impl RoverEvent {
    pub fn is_successful_result(&self) -> bool {
        self.result == Some(true)
    }

    pub fn reports_mine(&self) -> bool {
        self.mine == Some(true)
    }

    /// One-line human description of the event.
    pub fn summary(&self) -> String {
        if let Some(error) = &self.error {
            return format!("❌ Error: {error}");
        }
        if self.reports_mine() && self.command != Some(CommandCode::DISARM) {
            return match (self.x, self.y) {
                (Some(x), Some(y)) => format!("💥 Mine triggered at (x {x}, y {y})"),
                _ => "💥 Mine triggered".to_string(),
            };
        }
        let Some(command) = self.command else {
            return match &self.message {
                Some(message) => format!("ℹ️ {message}"),
                None => "ℹ️ Event without command".to_string(),
            };
        };
        match command {
            CommandCode::MOVE => match (self.result, self.new_position) {
                (Some(true), Some((row, col))) => {
                    format!("✅ Move successful → New Position: [{row}, {col}]")
                }
                (Some(true), None) => "✅ Move successful".to_string(),
                _ => "❌ Move failed".to_string(),
            },
            CommandCode::LEFT => format!("↩️ Turned Left → New Direction: {}", self.direction_name()),
            CommandCode::RIGHT => {
                format!("↪️ Turned Right → New Direction: {}", self.direction_name())
            }
            CommandCode::DISARM => match (self.result, &self.pin) {
                _ if self.reports_mine() => "🛠️ Mine reported under rover".to_string(),
                (Some(true), Some(pin)) => format!("🛠️ Disarmed Mine → PIN: {pin}"),
                (Some(true), None) => "🛠️ Disarmed Mine".to_string(),
                _ => "❌ Disarm Failed".to_string(),
            },
            other => format!("ℹ️ Executed Command: {other}"),
        }
    }

    fn direction_name(&self) -> &'static str {
        self.direction.map(Direction::name).unwrap_or("unknown")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoverPath(pub RoverId);

impl RoverPath {
    pub fn live_session(self) -> String {
        format!("/ws/rovers/{}", self.0 .0)
    }

    pub fn dispatch(self) -> String {
        format!("/rovers/{}/dispatch", self.0 .0)
    }

    pub fn resource(self) -> String {
        format!("/rovers/{}", self.0 .0)
    }
}

pub fn mine_resource(id: MineId) -> String {
    format!("/mines/{}", id.0)
}
