//! User-initiated mutations: each one calls the service, surfaces the outcome as a
//! notification and refreshes the affected views.

use std::sync::Arc;

use shared::{
    domain::{Direction, MineId, RoverId},
    protocol::{
        CreateMineRequest, CreateRoverRequest, CreateRoverResponse, DispatchResponse,
        MessageResponse, ResizeMapRequest, UpdateMineRequest, UpdateRoverRequest,
    },
};
use tracing::{info, warn};

use crate::{
    api::RoverApi,
    dashboard::{SharedDashboard, ViewChange},
    error::ClientError,
    sync::{RefreshSet, StateSyncClient},
};

pub const DISPATCH_IN_FLIGHT: &str = "Dispatching Rover...";

/// Result of the batch `simulate` flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationReport {
    pub rover_id: RoverId,
    /// True when the rover did not exist and was created for this run.
    pub created: bool,
    pub status: Option<String>,
    pub eliminated: bool,
}

#[derive(Clone)]
pub struct ActionDispatcher {
    api: Arc<dyn RoverApi>,
    sync: StateSyncClient,
    dashboard: SharedDashboard,
}

impl ActionDispatcher {
    pub fn new(api: Arc<dyn RoverApi>, sync: StateSyncClient, dashboard: SharedDashboard) -> Self {
        Self {
            api,
            sync,
            dashboard,
        }
    }

    pub async fn create_mine(
        &self,
        row: i64,
        col: i64,
        serial_num: i64,
    ) -> Result<MessageResponse, ClientError> {
        let request = CreateMineRequest {
            row,
            col,
            serial_num,
        };
        let outcome = self.api.create_mine(&request).await;
        self.conclude("create mine", outcome, RefreshSet::MAP_AND_MINES, |body| {
            body.message.clone()
        })
        .await
    }

    /// New rovers start at the origin facing South.
    pub async fn create_rover(&self, commands: &str) -> Result<CreateRoverResponse, ClientError> {
        let request = CreateRoverRequest {
            commands: commands.to_string(),
            x: 0,
            y: 0,
            direction: Direction::South,
        };
        let outcome = self.api.create_rover(&request).await;
        self.conclude("create rover", outcome, RefreshSet::ROVERS, |body| {
            format!("{} ID: {}", body.message, body.id)
        })
        .await
    }

    /// Dispatch is disabled in the view until the service answers.
    pub async fn dispatch_rover(&self, id: RoverId) -> Result<DispatchResponse, ClientError> {
        self.set_dispatch_status(Some(DISPATCH_IN_FLIGHT.to_string()))
            .await;
        let outcome = self.api.dispatch_rover(id).await;
        self.set_dispatch_status(None).await;
        self.conclude("dispatch rover", outcome, RefreshSet::ALL, |body| {
            body.message.clone()
        })
        .await
    }

    pub async fn resize_map(
        &self,
        rows: usize,
        cols: usize,
    ) -> Result<MessageResponse, ClientError> {
        let request = ResizeMapRequest {
            row: rows,
            col: cols,
        };
        let outcome = self.api.resize_map(&request).await;
        self.conclude("resize map", outcome, RefreshSet::MAP_AND_MINES, |body| {
            body.message.clone()
        })
        .await
    }

    pub async fn update_mine(
        &self,
        id: MineId,
        request: UpdateMineRequest,
    ) -> Result<MessageResponse, ClientError> {
        let outcome = self.api.update_mine(id, &request).await;
        self.conclude("update mine", outcome, RefreshSet::MAP_AND_MINES, |body| {
            body.message.clone()
        })
        .await
    }

    pub async fn delete_mine(&self, id: MineId) -> Result<MessageResponse, ClientError> {
        let outcome = self.api.delete_mine(id).await;
        self.conclude("delete mine", outcome, RefreshSet::MAP_AND_MINES, |body| {
            body.message.clone()
        })
        .await
    }

    pub async fn update_rover_commands(
        &self,
        id: RoverId,
        commands: &str,
    ) -> Result<MessageResponse, ClientError> {
        let request = UpdateRoverRequest {
            commands: commands.to_string(),
        };
        let outcome = self.api.update_rover_commands(id, &request).await;
        self.conclude("update rover", outcome, RefreshSet::ROVERS, |body| {
            body.message.clone()
        })
        .await
    }

    pub async fn delete_rover(&self, id: RoverId) -> Result<MessageResponse, ClientError> {
        let outcome = self.api.delete_rover(id).await;
        self.conclude("delete rover", outcome, RefreshSet::ROVERS, |body| {
            body.message.clone()
        })
        .await
    }

    /// Batch flow: look the rover up, create it when the service does not know it,
    /// dispatch it and report whether it survived.
    pub async fn simulate(
        &self,
        id: RoverId,
        commands: Option<&str>,
    ) -> Result<SimulationReport, ClientError> {
        let outcome = self.run_simulation(id, commands).await;
        self.conclude("simulate rover", outcome, RefreshSet::ALL, |report| {
            if report.eliminated {
                format!("Rover {} was eliminated during simulation", report.rover_id)
            } else {
                format!("Rover {} simulation finished successfully", report.rover_id)
            }
        })
        .await
    }

    async fn run_simulation(
        &self,
        id: RoverId,
        commands: Option<&str>,
    ) -> Result<SimulationReport, ClientError> {
        let grid = self.api.fetch_map().await?;
        info!(
            rover_id = id.0,
            rows = grid.rows(),
            cols = grid.cols(),
            "simulating rover"
        );

        let (rover_id, created) = match self.api.fetch_rover(id).await {
            Ok(rover) => (rover.id, false),
            Err(err) if err.is_not_found() => {
                info!(rover_id = id.0, "rover not found; creating it");
                let request = CreateRoverRequest {
                    commands: commands.unwrap_or_default().to_string(),
                    x: 0,
                    y: 0,
                    direction: Direction::South,
                };
                (self.api.create_rover(&request).await?.id, true)
            }
            Err(err) => return Err(err),
        };

        let dispatched = self.api.dispatch_rover(rover_id).await?;
        let rover = dispatched.rover;
        Ok(SimulationReport {
            rover_id,
            created,
            eliminated: rover.as_ref().is_some_and(|rover| rover.is_eliminated()),
            status: rover.map(|rover| rover.status),
        })
    }

    async fn set_dispatch_status(&self, status: Option<String>) {
        self.dashboard
            .update(ViewChange::Dispatch, |dashboard| {
                dashboard.set_dispatch_status(status)
            })
            .await;
    }

    /// Rejections are notified with the server detail and still refresh. Transport
    /// failures leave the views alone.
    async fn conclude<T>(
        &self,
        action: &'static str,
        outcome: Result<T, ClientError>,
        refresh: RefreshSet,
        describe: impl FnOnce(&T) -> String,
    ) -> Result<T, ClientError> {
        let notice = match &outcome {
            Ok(body) => Some(describe(body)),
            Err(err) => {
                warn!(action, %err, "action failed");
                err.server_detail().map(str::to_string)
            }
        };
        let Some(notice) = notice else {
            return outcome;
        };
        info!(action, notice = %notice, "action finished");
        self.dashboard
            .update(ViewChange::Notification, |dashboard| dashboard.notify(notice))
            .await;
        self.sync.refresh(refresh).await;
        outcome
    }
}

#[cfg(test)]
#[path = "tests/actions_tests.rs"]
mod tests;
