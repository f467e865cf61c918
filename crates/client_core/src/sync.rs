//! Full-snapshot refreshes of the map, mine registry and rover roster.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::{
    api::RoverApi,
    dashboard::{SharedDashboard, ViewChange},
    error::ClientError,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshSet {
    pub map: bool,
    pub mines: bool,
    pub rovers: bool,
}

impl RefreshSet {
    pub const NONE: Self = Self {
        map: false,
        mines: false,
        rovers: false,
    };
    pub const MAP: Self = Self {
        map: true,
        mines: false,
        rovers: false,
    };
    pub const MINES: Self = Self {
        map: false,
        mines: true,
        rovers: false,
    };
    pub const MAP_AND_MINES: Self = Self {
        map: true,
        mines: true,
        rovers: false,
    };
    pub const ROVERS: Self = Self {
        map: false,
        mines: false,
        rovers: true,
    };
    pub const ALL: Self = Self {
        map: true,
        mines: true,
        rovers: true,
    };

    pub fn is_empty(self) -> bool {
        self == Self::NONE
    }
}

/// Failures from one `refresh` call, by view.
#[derive(Debug, Default)]
pub struct RefreshReport {
    pub map: Option<ClientError>,
    pub mines: Option<ClientError>,
    pub rovers: Option<ClientError>,
}

impl RefreshReport {
    pub fn is_ok(&self) -> bool {
        self.map.is_none() && self.mines.is_none() && self.rovers.is_none()
    }
}

#[derive(Clone)]
pub struct StateSyncClient {
    api: Arc<dyn RoverApi>,
    dashboard: SharedDashboard,
}

impl StateSyncClient {
    pub fn new(api: Arc<dyn RoverApi>, dashboard: SharedDashboard) -> Self {
        Self { api, dashboard }
    }

    pub async fn refresh_map(&self) -> Result<(), ClientError> {
        let grid = self.api.fetch_map().await.inspect_err(|err| {
            warn!(%err, "map refresh failed");
        })?;
        debug!(rows = grid.rows(), cols = grid.cols(), "rendering map");
        self.dashboard
            .update(ViewChange::Grid, |dashboard| dashboard.render_grid(&grid))
            .await;
        Ok(())
    }

    pub async fn refresh_mines(&self) -> Result<(), ClientError> {
        let mines = self.api.fetch_mines().await.inspect_err(|err| {
            warn!(%err, "mine refresh failed");
        })?;
        debug!(count = mines.len(), "rendering mines");
        self.dashboard
            .update(ViewChange::Mines, |dashboard| dashboard.render_mines(&mines))
            .await;
        Ok(())
    }

    pub async fn refresh_rovers(&self) -> Result<(), ClientError> {
        let rovers = self.api.fetch_rovers().await.inspect_err(|err| {
            warn!(%err, "rover refresh failed");
        })?;
        debug!(count = rovers.len(), "rendering rovers");
        self.dashboard
            .update(ViewChange::Rovers, |dashboard| {
                dashboard.render_rovers(&rovers)
            })
            .await;
        Ok(())
    }

    /// Runs the selected refreshes concurrently. Each one renders as soon as its own
    /// response arrives.
    pub async fn refresh(&self, set: RefreshSet) -> RefreshReport {
        let map = async {
            if set.map {
                self.refresh_map().await.err()
            } else {
                None
            }
        };
        let mines = async {
            if set.mines {
                self.refresh_mines().await.err()
            } else {
                None
            }
        };
        let rovers = async {
            if set.rovers {
                self.refresh_rovers().await.err()
            } else {
                None
            }
        };
        let (map, mines, rovers) = futures::join!(map, mines, rovers);
        RefreshReport { map, mines, rovers }
    }

    /// Starts a refresh that completes independently of the caller.
    pub fn spawn_refresh(&self, set: RefreshSet) -> JoinHandle<()> {
        let sync = self.clone();
        tokio::spawn(async move {
            let _ = sync.refresh(set).await;
        })
    }
}

#[cfg(test)]
#[path = "tests/sync_tests.rs"]
mod tests;
