//! Top-level controller: owns the live session and routes user actions and live
//! signals to the dispatchers, the sync client and the dashboard.

use std::{
    ops::ControlFlow,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use shared::{
    domain::{MineId, RoverId},
    protocol::UpdateMineRequest,
};
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, info, warn};

use crate::{
    actions::ActionDispatcher,
    api::RoverApi,
    dashboard::{SharedDashboard, ViewChange},
    error::SessionError,
    pin::{find_pin, pin_is_valid, PIN_HASH_PREFIX},
    session::{CommandSession, SessionPhase},
    sync::{RefreshSet, StateSyncClient},
    transport::{LinkSignal, SessionConnector},
};

pub const NOT_CONNECTED_NOTICE: &str = "WebSocket is not connected";
pub const HALTED_NOTICE: &str = "Rover is halted after a mine detonation; commands are disabled";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserAction {
    RefreshMap,
    RefreshMines,
    RefreshRovers,
    RefreshAll,
    /// Click on a rendered grid position.
    SelectCell {
        view_row: usize,
        view_col: usize,
    },
    /// Missing coordinates are taken from the selected cell.
    CreateMine {
        serial: i64,
        row: Option<i64>,
        col: Option<i64>,
    },
    CreateRover {
        commands: String,
    },
    DispatchRover(RoverId),
    OpenSession(RoverId),
    SendCommand(String),
    CloseSession,
    ResizeMap {
        rows: usize,
        cols: usize,
    },
    UpdateMine {
        id: MineId,
        request: UpdateMineRequest,
    },
    DeleteMine(MineId),
    UpdateRover {
        id: RoverId,
        commands: String,
    },
    DeleteRover(RoverId),
    Simulate {
        id: RoverId,
        commands: Option<String>,
    },
    VerifyPin {
        serial: String,
        pin: String,
    },
    FindPin {
        serial: String,
    },
    Quit,
}

pub struct RoverConsole {
    dashboard: SharedDashboard,
    sync: StateSyncClient,
    actions: ActionDispatcher,
    connector: Arc<dyn SessionConnector>,
    session: Option<CommandSession>,
    background: Vec<JoinHandle<()>>,
    pin_searches: Vec<JoinHandle<()>>,
    pin_cancel: Arc<AtomicBool>,
}

impl RoverConsole {
    pub fn new(
        api: Arc<dyn RoverApi>,
        connector: Arc<dyn SessionConnector>,
        dashboard: SharedDashboard,
    ) -> Self {
        let sync = StateSyncClient::new(Arc::clone(&api), dashboard.clone());
        let actions = ActionDispatcher::new(api, sync.clone(), dashboard.clone());
        Self {
            dashboard,
            sync,
            actions,
            connector,
            session: None,
            background: Vec::new(),
            pin_searches: Vec::new(),
            pin_cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn dashboard(&self) -> &SharedDashboard {
        &self.dashboard
    }

    pub fn session(&self) -> Option<&CommandSession> {
        self.session.as_ref()
    }

    /// Initial load of every view.
    pub async fn start(&self) {
        let report = self.sync.refresh(RefreshSet::ALL).await;
        if !report.is_ok() {
            warn!("initial load incomplete");
        }
    }

    pub async fn handle_action(&mut self, action: UserAction) -> ControlFlow<()> {
        debug!(?action, "user action");
        match action {
            UserAction::RefreshMap => self.refresh(RefreshSet::MAP).await,
            UserAction::RefreshMines => self.refresh(RefreshSet::MINES).await,
            UserAction::RefreshRovers => self.refresh(RefreshSet::ROVERS).await,
            UserAction::RefreshAll => self.refresh(RefreshSet::ALL).await,
            UserAction::SelectCell { view_row, view_col } => {
                let selected = self
                    .dashboard
                    .update(ViewChange::Selection, |dashboard| {
                        dashboard.click_cell(view_row, view_col)
                    })
                    .await;
                if selected.is_none() {
                    debug!(view_row, view_col, "click outside the data cells");
                }
            }
            UserAction::CreateMine { serial, row, col } => {
                self.create_mine(serial, row, col).await;
            }
            UserAction::CreateRover { commands } => {
                let _ = self.actions.create_rover(&commands).await;
            }
            UserAction::DispatchRover(id) => {
                let _ = self.actions.dispatch_rover(id).await;
            }
            UserAction::OpenSession(id) => self.open_session(id).await,
            UserAction::SendCommand(raw) => self.send_command(&raw).await,
            UserAction::CloseSession => self.close_session().await,
            UserAction::ResizeMap { rows, cols } => {
                let _ = self.actions.resize_map(rows, cols).await;
            }
            UserAction::UpdateMine { id, request } => {
                let _ = self.actions.update_mine(id, request).await;
            }
            UserAction::DeleteMine(id) => {
                let _ = self.actions.delete_mine(id).await;
            }
            UserAction::UpdateRover { id, commands } => {
                let _ = self.actions.update_rover_commands(id, &commands).await;
            }
            UserAction::DeleteRover(id) => {
                let _ = self.actions.delete_rover(id).await;
            }
            UserAction::Simulate { id, commands } => {
                let _ = self.actions.simulate(id, commands.as_deref()).await;
            }
            UserAction::VerifyPin { serial, pin } => {
                let notice = if pin_is_valid(&serial, &pin) {
                    format!("PIN {pin} disarms mine {serial}")
                } else {
                    format!("PIN {pin} does not disarm mine {serial}")
                };
                self.notify(notice).await;
            }
            UserAction::FindPin { serial } => self.spawn_pin_search(serial),
            UserAction::Quit => return ControlFlow::Break(()),
        }
        ControlFlow::Continue(())
    }

    /// Replaces any existing session with a new one for `rover_id`.
    pub async fn open_session(&mut self, rover_id: RoverId) {
        self.close_session().await;

        let mut session = CommandSession::new(rover_id);
        let phase = match session.begin_connect() {
            Ok(phase) => phase,
            Err(err) => {
                self.notify(err.to_string()).await;
                return;
            }
        };
        self.apply_phase(phase).await;
        self.session = Some(session);

        let connector = Arc::clone(&self.connector);
        let connected = connector.connect(rover_id).await;
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let phase = match connected {
            Ok(link) => session.attach(link),
            Err(err) => {
                warn!(rover_id = rover_id.0, error = %format!("{err:#}"), "live session failed");
                let phase = session.fail_connect();
                self.notify(format!("Could not open live session for rover {rover_id}: {err}"))
                    .await;
                phase
            }
        };
        self.apply_phase(phase).await;
    }

    pub async fn send_command(&mut self, raw: &str) {
        let Some(session) = self.session.as_mut() else {
            self.notify(NOT_CONNECTED_NOTICE).await;
            return;
        };
        if session.is_open() && session.is_halted() {
            self.notify(HALTED_NOTICE).await;
            return;
        }
        match session.send(raw) {
            Ok(sent) => debug!(seq = sent.seq, command = %sent.code, "command queued on link"),
            Err(SessionError::NotConnected) => {
                self.notify(NOT_CONNECTED_NOTICE).await
            }
            Err(err) => self.notify(err.to_string()).await,
        }
    }

    pub async fn close_session(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if session.close() {
            let phase = session.phase();
            self.apply_phase(phase).await;
        }
    }

    pub async fn handle_signal(&mut self, signal: LinkSignal) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        match signal {
            LinkSignal::Event(raw) => {
                let outcome = session.receive(&raw);
                let phase = session.phase();
                self.dashboard
                    .update(ViewChange::EventLog, |dashboard| {
                        dashboard.append_event(outcome.entry)
                    })
                    .await;
                if let Some((x, y)) = outcome.detonation {
                    let marked = self
                        .dashboard
                        .update(ViewChange::Grid, |dashboard| dashboard.mark_mine_hit(x, y))
                        .await;
                    if !marked {
                        warn!(x, y, "detonation outside the rendered grid");
                    }
                }
                if outcome.newly_halted {
                    self.apply_phase(phase).await;
                }
                if !outcome.refresh.is_empty() {
                    self.background.retain(|handle| !handle.is_finished());
                    self.background.push(self.sync.spawn_refresh(outcome.refresh));
                }
            }
            LinkSignal::Closed { reason } => {
                info!(
                    rover_id = session.rover_id().0,
                    reason = reason.as_deref().unwrap_or("none"),
                    "live session ended by peer"
                );
                if session.close() {
                    let phase = session.phase();
                    self.apply_phase(phase).await;
                }
            }
        }
    }

    pub async fn next_signal(&mut self) -> LinkSignal {
        match self.session.as_mut() {
            Some(session) => session.next_signal().await,
            None => std::future::pending().await,
        }
    }

    /// Waits for every refresh started so far. PIN searches are not awaited.
    pub async fn settle(&mut self) {
        for handle in self.background.drain(..) {
            if let Err(err) = handle.await {
                warn!(%err, "background task failed");
            }
        }
    }

    /// Multiplexes user actions and live signals until `Quit` or the action channel
    /// closes.
    pub async fn run(mut self, mut actions: mpsc::Receiver<UserAction>) {
        self.start().await;
        loop {
            tokio::select! {
                action = actions.recv() => {
                    let Some(action) = action else {
                        break;
                    };
                    if self.handle_action(action).await.is_break() {
                        break;
                    }
                }
                signal = self.next_signal() => self.handle_signal(signal).await,
            }
        }
        self.close_session().await;
        self.cancel_pin_searches();
        self.settle().await;
        info!("console stopped");
    }

    async fn refresh(&self, set: RefreshSet) {
        self.sync.refresh(set).await;
    }

    async fn create_mine(&self, serial: i64, row: Option<i64>, col: Option<i64>) {
        let selected = self.dashboard.read(|dashboard| dashboard.selected()).await;
        let coords = match (row, col) {
            (Some(row), Some(col)) => Some((row, col)),
            _ => selected.map(|coords| {
                (
                    row.unwrap_or(coords.row as i64),
                    col.unwrap_or(coords.col as i64),
                )
            }),
        };
        let Some((row, col)) = coords else {
            self.notify("Select a cell or give the mine row and col")
                .await;
            return;
        };
        let _ = self.actions.create_mine(row, col, serial).await;
    }

    fn spawn_pin_search(&mut self, serial: String) {
        let dashboard = self.dashboard.clone();
        let cancel = Arc::clone(&self.pin_cancel);
        self.pin_searches.retain(|handle| !handle.is_finished());
        self.pin_searches.push(tokio::spawn(async move {
            info!(serial = %serial, "searching disarm pin");
            let search_serial = serial.clone();
            let search = tokio::task::spawn_blocking(move || {
                find_pin(&search_serial, PIN_HASH_PREFIX, &cancel)
            });
            let notice = match search.await {
                Ok(Some(pin)) => format!("PIN for mine {serial}: {pin}"),
                Ok(None) => return,
                Err(err) => format!("PIN search for mine {serial} failed: {err}"),
            };
            dashboard
                .update(ViewChange::Notification, |dashboard| dashboard.notify(notice))
                .await;
        }));
    }

    /// Stops every running PIN search; their blocking threads exit at the next candidate.
    pub fn cancel_pin_searches(&mut self) {
        self.pin_cancel.store(true, Ordering::Relaxed);
        for handle in self.pin_searches.drain(..) {
            handle.abort();
        }
        self.pin_cancel = Arc::new(AtomicBool::new(false));
    }

    async fn apply_phase(&self, phase: SessionPhase) {
        self.dashboard
            .update(ViewChange::Affordances, |dashboard| {
                dashboard.apply_phase(phase)
            })
            .await;
    }

    async fn notify(&self, notice: impl Into<String>) {
        let notice = notice.into();
        info!(notice = %notice, "notification");
        self.dashboard
            .update(ViewChange::Notification, |dashboard| dashboard.notify(notice))
            .await;
    }
}

#[cfg(test)]
#[path = "tests/console_tests.rs"]
mod tests;
