//! REST client for the simulation service.

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use shared::{
    domain::{Grid, Mine, MineId, Rover, RoverId},
    error::ErrorBody,
    protocol::{
        mine_resource, CreateMineRequest, CreateRoverRequest, CreateRoverResponse,
        DispatchResponse, MapResponse, MessageResponse, MinesResponse, ResizeMapRequest,
        RoverPath, RoversResponse, UpdateMineRequest, UpdateRoverRequest,
    },
};
use tracing::debug;

use crate::{config::normalize_server_url, error::ClientError};

#[async_trait]
pub trait RoverApi: Send + Sync {
    async fn fetch_map(&self) -> Result<Grid, ClientError>;
    async fn fetch_mines(&self) -> Result<Vec<Mine>, ClientError>;
    async fn fetch_rovers(&self) -> Result<Vec<Rover>, ClientError>;
    async fn fetch_rover(&self, id: RoverId) -> Result<Rover, ClientError>;
    async fn resize_map(&self, request: &ResizeMapRequest)
        -> Result<MessageResponse, ClientError>;
    async fn create_mine(&self, request: &CreateMineRequest)
        -> Result<MessageResponse, ClientError>;
    async fn update_mine(
        &self,
        id: MineId,
        request: &UpdateMineRequest,
    ) -> Result<MessageResponse, ClientError>;
    async fn delete_mine(&self, id: MineId) -> Result<MessageResponse, ClientError>;
    async fn create_rover(
        &self,
        request: &CreateRoverRequest,
    ) -> Result<CreateRoverResponse, ClientError>;
    async fn update_rover_commands(
        &self,
        id: RoverId,
        request: &UpdateRoverRequest,
    ) -> Result<MessageResponse, ClientError>;
    async fn delete_rover(&self, id: RoverId) -> Result<MessageResponse, ClientError>;
    async fn dispatch_rover(&self, id: RoverId) -> Result<DispatchResponse, ClientError>;
}

pub struct HttpRoverApi {
    http: Client,
    server_url: String,
}

impl HttpRoverApi {
    pub fn new(server_url: &str) -> Result<Self, ClientError> {
        Ok(Self {
            http: Client::new(),
            server_url: normalize_server_url(server_url)?,
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}{path}", self.server_url))
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        build: impl FnOnce(RequestBuilder) -> RequestBuilder,
    ) -> Result<T, ClientError> {
        let method_name = method_name(&method);
        let request_error = |source| ClientError::Request {
            method: method_name,
            path: path.to_string(),
            source,
        };
        debug!(method = method_name, path, "rover api request");
        let response = build(self.request(method, path))
            .send()
            .await
            .map_err(request_error)?;
        read_json(method_name, path, response).await
    }
}

async fn read_json<T: DeserializeOwned>(
    method: &'static str,
    path: &str,
    response: Response,
) -> Result<T, ClientError> {
    let status = response.status();
    if !status.is_success() {
        let detail = match response.json::<ErrorBody>().await {
            Ok(body) => body.describe(),
            Err(_) => status
                .canonical_reason()
                .unwrap_or("unexpected status")
                .to_string(),
        };
        return Err(ClientError::Rejected {
            method,
            path: path.to_string(),
            status: status.as_u16(),
            detail,
        });
    }
    response.json().await.map_err(|source| ClientError::Request {
        method,
        path: path.to_string(),
        source,
    })
}

fn method_name(method: &Method) -> &'static str {
    match *method {
        Method::GET => "GET",
        Method::POST => "POST",
        Method::PUT => "PUT",
        Method::DELETE => "DELETE",
        _ => "OTHER",
    }
}

#[async_trait]
impl RoverApi for HttpRoverApi {
    async fn fetch_map(&self) -> Result<Grid, ClientError> {
        let body: MapResponse = self.call(Method::GET, "/map", |req| req).await?;
        Ok(body.map)
    }

    async fn fetch_mines(&self) -> Result<Vec<Mine>, ClientError> {
        let body: MinesResponse = self.call(Method::GET, "/mines", |req| req).await?;
        Ok(body.mines)
    }

    async fn fetch_rovers(&self) -> Result<Vec<Rover>, ClientError> {
        let body: RoversResponse = self.call(Method::GET, "/rovers", |req| req).await?;
        Ok(body.rovers)
    }

    async fn fetch_rover(&self, id: RoverId) -> Result<Rover, ClientError> {
        self.call(Method::GET, &RoverPath(id).resource(), |req| req)
            .await
    }

    async fn resize_map(
        &self,
        request: &ResizeMapRequest,
    ) -> Result<MessageResponse, ClientError> {
        self.call(Method::PUT, "/map", |req| req.json(request)).await
    }

    async fn create_mine(
        &self,
        request: &CreateMineRequest,
    ) -> Result<MessageResponse, ClientError> {
        self.call(Method::POST, "/mines", |req| req.json(request))
            .await
    }

    async fn update_mine(
        &self,
        id: MineId,
        request: &UpdateMineRequest,
    ) -> Result<MessageResponse, ClientError> {
        self.call(Method::PUT, &mine_resource(id), |req| req.json(request))
            .await
    }

    async fn delete_mine(&self, id: MineId) -> Result<MessageResponse, ClientError> {
        self.call(Method::DELETE, &mine_resource(id), |req| req)
            .await
    }

    async fn create_rover(
        &self,
        request: &CreateRoverRequest,
    ) -> Result<CreateRoverResponse, ClientError> {
        self.call(Method::POST, "/rovers", |req| req.json(request))
            .await
    }

    async fn update_rover_commands(
        &self,
        id: RoverId,
        request: &UpdateRoverRequest,
    ) -> Result<MessageResponse, ClientError> {
        self.call(Method::PUT, &RoverPath(id).resource(), |req| {
            req.json(request)
        })
        .await
    }

    async fn delete_rover(&self, id: RoverId) -> Result<MessageResponse, ClientError> {
        self.call(Method::DELETE, &RoverPath(id).resource(), |req| req)
            .await
    }

    async fn dispatch_rover(&self, id: RoverId) -> Result<DispatchResponse, ClientError> {
        self.call(Method::POST, &RoverPath(id).dispatch(), |req| req)
            .await
    }
}

#[cfg(test)]
#[path = "tests/api_tests.rs"]
mod tests;
