//! The single rendered view shared by every component, and its change feed.

use std::{collections::VecDeque, fmt, sync::Arc};

use chrono::{DateTime, Utc};
use shared::domain::{Grid, Mine, Rover};
use tokio::sync::{broadcast, Mutex};

use crate::{
    render::{GridCoords, GridView, RegistryView},
    session::{ConnectionState, SessionPhase},
};

const EVENT_LOG_TAIL: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewChange {
    Grid,
    Mines,
    Rovers,
    EventLog,
    Affordances,
    Selection,
    Notification,
    Dispatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiveIndicator {
    Online,
    Offline,
}

impl LiveIndicator {
    pub fn label(self) -> &'static str {
        match self {
            Self::Online => "🟢 Online",
            Self::Offline => "🔴 Offline",
        }
    }
}

/// Controls and indicators that depend on the live session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Affordances {
    pub status: &'static str,
    pub controls_visible: bool,
    /// Whether the rover command buttons accept input.
    pub commands_enabled: bool,
    pub live: LiveIndicator,
}

impl Affordances {
    pub fn for_phase(phase: SessionPhase) -> Self {
        match (phase.connection, phase.halted) {
            (ConnectionState::Closed, _) => Self {
                status: "Disconnected",
                controls_visible: false,
                commands_enabled: false,
                live: LiveIndicator::Offline,
            },
            (ConnectionState::Connecting, _) => Self {
                status: "Connecting",
                controls_visible: false,
                commands_enabled: false,
                live: LiveIndicator::Offline,
            },
            (ConnectionState::Open, false) => Self {
                status: "Connected",
                controls_visible: true,
                commands_enabled: true,
                live: LiveIndicator::Online,
            },
            (ConnectionState::Open, true) => Self {
                status: "Connected (halted)",
                controls_visible: true,
                commands_enabled: false,
                live: LiveIndicator::Online,
            },
        }
    }
}

impl Default for Affordances {
    fn default() -> Self {
        Self::for_phase(SessionPhase::default())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventLogEntry {
    pub received_at: DateTime<Utc>,
    /// Sequence number of the sent command this event answers, when one was pending.
    pub seq: Option<u64>,
    pub raw: String,
    pub summary: String,
}

#[derive(Debug, Clone, Default)]
pub struct EventLog {
    entries: Vec<EventLogEntry>,
}

impl EventLog {
    pub fn push(&mut self, entry: EventLogEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[EventLogEntry] {
        &self.entries
    }

    /// The newest `count` entries, oldest first.
    pub fn tail(&self, count: usize) -> &[EventLogEntry] {
        let start = self.entries.len().saturating_sub(count);
        &self.entries[start..]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct Dashboard {
    grid: GridView,
    mines: RegistryView,
    rovers: RegistryView,
    events: EventLog,
    affordances: Affordances,
    selected: Option<GridCoords>,
    notifications: VecDeque<String>,
    dispatch_status: Option<String>,
}

impl Default for Dashboard {
    fn default() -> Self {
        Self {
            grid: GridView::default(),
            mines: RegistryView::empty_mines(),
            rovers: RegistryView::empty_rovers(),
            events: EventLog::default(),
            affordances: Affordances::default(),
            selected: None,
            notifications: VecDeque::new(),
            dispatch_status: None,
        }
    }
}

impl Dashboard {
    pub fn render_grid(&mut self, grid: &Grid) {
        self.grid = GridView::render(grid);
    }

    pub fn render_mines(&mut self, mines: &[Mine]) {
        self.mines = RegistryView::mines(mines);
    }

    pub fn render_rovers(&mut self, rovers: &[Rover]) {
        self.rovers = RegistryView::rovers(rovers);
    }

    pub fn mark_mine_hit(&mut self, x: i64, y: i64) -> bool {
        self.grid.mark_mine_hit(x, y)
    }

    /// Publishes the clicked cell's coordinates to the mine form.
    pub fn click_cell(&mut self, view_row: usize, view_col: usize) -> Option<GridCoords> {
        let coords = self.grid.click(view_row, view_col)?;
        self.selected = Some(coords);
        Some(coords)
    }

    pub fn apply_phase(&mut self, phase: SessionPhase) {
        self.affordances = Affordances::for_phase(phase);
    }

    pub fn append_event(&mut self, entry: EventLogEntry) {
        self.events.push(entry);
    }

    pub fn notify(&mut self, message: impl Into<String>) {
        self.notifications.push_back(message.into());
    }

    pub fn take_notifications(&mut self) -> Vec<String> {
        self.notifications.drain(..).collect()
    }

    pub fn set_dispatch_status(&mut self, status: Option<String>) {
        self.dispatch_status = status;
    }

    pub fn grid(&self) -> &GridView {
        &self.grid
    }

    pub fn mines(&self) -> &RegistryView {
        &self.mines
    }

    pub fn rovers(&self) -> &RegistryView {
        &self.rovers
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub fn affordances(&self) -> Affordances {
        self.affordances
    }

    pub fn selected(&self) -> Option<GridCoords> {
        self.selected
    }

    pub fn dispatch_enabled(&self) -> bool {
        self.dispatch_status.is_none()
    }
}

impl fmt::Display for Dashboard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.grid)?;
        if let Some(selected) = self.selected {
            writeln!(f, "selected: row {}, col {}", selected.row, selected.col)?;
        }
        write!(f, "{}", self.mines)?;
        write!(f, "{}", self.rovers)?;
        if let Some(status) = &self.dispatch_status {
            writeln!(f, "{status}")?;
        }
        let controls = if !self.affordances.controls_visible {
            "hidden"
        } else if self.affordances.commands_enabled {
            "L R M D"
        } else {
            "disabled"
        };
        writeln!(
            f,
            "live: {} | {} | controls: {controls}",
            self.affordances.live.label(),
            self.affordances.status,
        )?;
        for entry in self.events.tail(EVENT_LOG_TAIL) {
            writeln!(f, "  {}  {}", entry.raw, entry.summary)?;
        }
        Ok(())
    }
}

/// Dashboard handle shared between the sync client, dispatchers and controller.
/// Every mutation is announced on the change feed.
#[derive(Clone)]
pub struct SharedDashboard {
    inner: Arc<Mutex<Dashboard>>,
    changes: broadcast::Sender<ViewChange>,
}

impl Default for SharedDashboard {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedDashboard {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(256);
        Self {
            inner: Arc::new(Mutex::new(Dashboard::default())),
            changes,
        }
    }

    pub async fn update<R>(&self, change: ViewChange, f: impl FnOnce(&mut Dashboard) -> R) -> R {
        let result = {
            let mut guard = self.inner.lock().await;
            f(&mut guard)
        };
        let _ = self.changes.send(change);
        result
    }

    pub async fn read<R>(&self, f: impl FnOnce(&Dashboard) -> R) -> R {
        let guard = self.inner.lock().await;
        f(&guard)
    }

    /// Consumes pending notifications without announcing a change.
    pub async fn drain_notifications(&self) -> Vec<String> {
        self.inner.lock().await.take_notifications()
    }

    pub async fn snapshot(&self) -> Dashboard {
        self.inner.lock().await.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ViewChange> {
        self.changes.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(raw: &str) -> EventLogEntry {
        EventLogEntry {
            received_at: Utc::now(),
            seq: None,
            raw: raw.to_string(),
            summary: String::new(),
        }
    }

    #[test]
    fn affordances_follow_phase() {
        let closed = Affordances::for_phase(SessionPhase::default());
        assert_eq!(closed.live, LiveIndicator::Offline);
        assert!(!closed.commands_enabled);

        let open = Affordances::for_phase(SessionPhase {
            connection: ConnectionState::Open,
            halted: false,
        });
        assert_eq!(open.live, LiveIndicator::Online);
        assert!(open.controls_visible && open.commands_enabled);

        let halted = Affordances::for_phase(SessionPhase {
            connection: ConnectionState::Open,
            halted: true,
        });
        assert!(halted.controls_visible);
        assert!(!halted.commands_enabled);
    }

    #[test]
    fn event_log_tail_is_latest_first_to_last() {
        let mut log = EventLog::default();
        for raw in ["a", "b", "c"] {
            log.push(entry(raw));
        }
        let tail: Vec<&str> = log.tail(2).iter().map(|e| e.raw.as_str()).collect();
        assert_eq!(tail, ["b", "c"]);
        assert_eq!(log.tail(10).len(), 3);
    }

    #[test]
    fn notifications_drain_once() {
        let mut dashboard = Dashboard::default();
        dashboard.notify("Mine created");
        assert_eq!(dashboard.take_notifications(), ["Mine created"]);
        assert!(dashboard.take_notifications().is_empty());
    }

    #[tokio::test]
    async fn updates_are_announced() {
        let shared = SharedDashboard::new();
        let mut changes = shared.subscribe();
        shared
            .update(ViewChange::Notification, |dashboard| dashboard.notify("hi"))
            .await;
        assert_eq!(changes.recv().await.expect("change"), ViewChange::Notification);
        assert_eq!(
            shared.read(|dashboard| dashboard.notifications.len()).await,
            1
        );
    }
}
