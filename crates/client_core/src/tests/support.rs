//! In-process stand-in for the simulation service used by the HTTP and WebSocket tests.

use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::Mutex};

type Rejection = (StatusCode, Json<Value>);
type Reply = Result<Json<Value>, Rejection>;

#[derive(Default)]
pub(crate) struct MockState {
    pub grid: Vec<Vec<u8>>,
    /// `(row, col, id)` in creation order.
    pub mines: Vec<(i64, i64, i64)>,
    pub rovers: Vec<Value>,
    pub next_rover_id: i64,
    pub hits: HashMap<&'static str, usize>,
    pub created_rover_bodies: Vec<Value>,
}

impl MockState {
    fn hit(&mut self, route: &'static str) {
        *self.hits.entry(route).or_default() += 1;
    }

    pub fn hits(&self, route: &str) -> usize {
        self.hits.get(route).copied().unwrap_or(0)
    }
}

#[derive(Clone)]
pub(crate) struct MockService {
    pub url: String,
    pub state: Arc<Mutex<MockState>>,
}

impl MockService {
    pub async fn hits(&self, route: &str) -> usize {
        self.state.lock().await.hits(route)
    }
}

fn rejection(status: StatusCode, detail: &str) -> Rejection {
    (status, Json(json!({ "detail": detail })))
}

pub(crate) async fn spawn_mock_service(rows: usize, cols: usize) -> MockService {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let state = Arc::new(Mutex::new(MockState {
        grid: vec![vec![0; cols]; rows],
        next_rover_id: 100,
        ..MockState::default()
    }));
    let app = Router::new()
        .route("/map", get(get_map).put(put_map))
        .route("/mines", get(get_mines).post(post_mine))
        .route("/mines/:id", axum::routing::put(put_mine).delete(delete_mine))
        .route("/rovers", get(get_rovers).post(post_rover))
        .route(
            "/rovers/:id",
            get(get_rover).put(put_rover).delete(delete_rover),
        )
        .route("/rovers/:id/dispatch", post(dispatch_rover))
        .route("/ws/rovers/:id", get(ws_rover))
        .with_state(Arc::clone(&state));
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    MockService {
        url: format!("http://{addr}"),
        state,
    }
}

async fn get_map(State(state): State<Arc<Mutex<MockState>>>) -> Json<Value> {
    let mut guard = state.lock().await;
    guard.hit("get_map");
    let rows = guard.grid.len();
    let cols = guard.grid.first().map(Vec::len).unwrap_or(0);
    Json(json!({ "row": rows, "col": cols, "map": guard.grid }))
}

async fn put_map(
    State(state): State<Arc<Mutex<MockState>>>,
    Json(body): Json<Value>,
) -> Reply {
    let mut guard = state.lock().await;
    guard.hit("put_map");
    let rows = body["row"].as_u64().unwrap_or(0) as usize;
    let cols = body["col"].as_u64().unwrap_or(0) as usize;
    if rows == 0 || cols == 0 {
        return Err(rejection(StatusCode::UNPROCESSABLE_ENTITY, "bad dimensions"));
    }
    guard.grid = vec![vec![0; cols]; rows];
    guard.mines.clear();
    Ok(Json(json!({ "message": "Map updated", "row": rows, "col": cols })))
}

async fn get_mines(State(state): State<Arc<Mutex<MockState>>>) -> Json<Value> {
    let mut guard = state.lock().await;
    guard.hit("get_mines");
    let mines: Vec<Value> = guard
        .mines
        .iter()
        .map(|(row, col, id)| json!({ "row": row, "col": col, "id": id }))
        .collect();
    Json(json!({ "mines": mines }))
}

async fn post_mine(
    State(state): State<Arc<Mutex<MockState>>>,
    Json(body): Json<Value>,
) -> Reply {
    let mut guard = state.lock().await;
    guard.hit("post_mine");
    let row = body["row"].as_i64().unwrap_or(-1);
    let col = body["col"].as_i64().unwrap_or(-1);
    let serial = body["serialNum"].as_i64().unwrap_or(-1);
    let cell = usize::try_from(row)
        .ok()
        .zip(usize::try_from(col).ok())
        .and_then(|(r, c)| guard.grid.get(r).and_then(|cells| cells.get(c)).copied());
    match cell {
        None => Err(rejection(StatusCode::BAD_REQUEST, "Mine out of bounds")),
        Some(0) => {
            guard.grid[row as usize][col as usize] = 1;
            guard.mines.push((row, col, serial));
            Ok(Json(json!({ "message": "Mine created", "id": serial })))
        }
        Some(_) => Err(rejection(
            StatusCode::BAD_REQUEST,
            "Mine already exists at the given location",
        )),
    }
}

async fn put_mine(
    State(state): State<Arc<Mutex<MockState>>>,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Reply {
    let mut guard = state.lock().await;
    guard.hit("put_mine");
    let Some(index) = guard.mines.iter().position(|(_, _, mine_id)| *mine_id == id) else {
        return Err(rejection(StatusCode::NOT_FOUND, "Mine not found"));
    };
    let (row, col, _) = guard.mines[index];
    let new_row = body["row"].as_i64().unwrap_or(row);
    let new_col = body["col"].as_i64().unwrap_or(col);
    let new_id = body["serialNum"].as_i64().unwrap_or(id);
    guard.grid[row as usize][col as usize] = 0;
    guard.grid[new_row as usize][new_col as usize] = 1;
    guard.mines[index] = (new_row, new_col, new_id);
    Ok(Json(json!({ "message": "Mine updated", "row": new_row, "col": new_col, "id": new_id })))
}

async fn delete_mine(State(state): State<Arc<Mutex<MockState>>>, Path(id): Path<i64>) -> Reply {
    let mut guard = state.lock().await;
    guard.hit("delete_mine");
    let Some(index) = guard.mines.iter().position(|(_, _, mine_id)| *mine_id == id) else {
        return Err(rejection(StatusCode::NOT_FOUND, "Mine not found"));
    };
    let (row, col, _) = guard.mines.remove(index);
    guard.grid[row as usize][col as usize] = 0;
    Ok(Json(json!({ "message": "Mine deleted" })))
}

async fn get_rovers(State(state): State<Arc<Mutex<MockState>>>) -> Json<Value> {
    let mut guard = state.lock().await;
    guard.hit("get_rovers");
    Json(json!({ "rovers": guard.rovers }))
}

async fn post_rover(
    State(state): State<Arc<Mutex<MockState>>>,
    Json(body): Json<Value>,
) -> Json<Value> {
    let mut guard = state.lock().await;
    guard.hit("post_rover");
    let id = guard.next_rover_id;
    guard.next_rover_id += 1;
    guard.rovers.push(json!({
        "id": id,
        "commands": body["commands"],
        "status": "ROVER IS IDLE",
        "position": [0, 0],
        "executed_commands": "",
        "direction": 2,
    }));
    guard.created_rover_bodies.push(body);
    Json(json!({ "message": "New Rover created", "id": id }))
}

fn rover_index(state: &MockState, id: i64) -> Option<usize> {
    state.rovers.iter().position(|rover| rover["id"] == id)
}

async fn get_rover(State(state): State<Arc<Mutex<MockState>>>, Path(id): Path<i64>) -> Reply {
    let mut guard = state.lock().await;
    guard.hit("get_rover");
    match rover_index(&guard, id) {
        Some(index) => Ok(Json(guard.rovers[index].clone())),
        None => Err(rejection(StatusCode::NOT_FOUND, "Rover not found")),
    }
}

async fn put_rover(
    State(state): State<Arc<Mutex<MockState>>>,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Reply {
    let mut guard = state.lock().await;
    guard.hit("put_rover");
    let Some(index) = rover_index(&guard, id) else {
        return Err(rejection(StatusCode::NOT_FOUND, "Rover not found"));
    };
    guard.rovers[index]["commands"] = body["commands"].clone();
    Ok(Json(json!({ "message": "Rover commands updated", "rover": guard.rovers[index] })))
}

async fn delete_rover(State(state): State<Arc<Mutex<MockState>>>, Path(id): Path<i64>) -> Reply {
    let mut guard = state.lock().await;
    guard.hit("delete_rover");
    let Some(index) = rover_index(&guard, id) else {
        return Err(rejection(
            StatusCode::BAD_REQUEST,
            &format!("Rover with id {id} not found"),
        ));
    };
    guard.rovers.remove(index);
    Ok(Json(json!({ "message": "Rover deleted" })))
}

/// Simplified dispatch: a mine on the origin cell eliminates the rover.
async fn dispatch_rover(
    State(state): State<Arc<Mutex<MockState>>>,
    Path(id): Path<i64>,
) -> Reply {
    let mut guard = state.lock().await;
    guard.hit("dispatch_rover");
    let Some(index) = rover_index(&guard, id) else {
        return Err(rejection(StatusCode::NOT_FOUND, "Rover not found"));
    };
    let on_mine = guard.grid.first().and_then(|row| row.first()) == Some(&1);
    let (status, message) = if on_mine {
        (
            "ROVER STATUS: ELIMINATED",
            "Rover exploded upon encountering a mine",
        )
    } else {
        ("ROVER OPERATION HAS COMPLETED", "Rover dispatched successfully")
    };
    guard.rovers[index]["status"] = json!(status);
    Ok(Json(json!({ "message": message, "rover": guard.rovers[index] })))
}

async fn ws_rover(
    ws: WebSocketUpgrade,
    State(state): State<Arc<Mutex<MockState>>>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    state.lock().await.hit("ws_rover");
    ws.on_upgrade(move |socket| ws_rover_session(socket, id))
}

/// `M` moves, `X` detonates a mine at (1, 2), `Q` closes, anything else is invalid.
async fn ws_rover_session(mut socket: WebSocket, _id: i64) {
    while let Some(Ok(msg)) = socket.recv().await {
        let Message::Text(text) = msg else {
            continue;
        };
        let reply = match text.trim() {
            "M" => json!({ "command": "M", "result": true, "new_position": [1, 0] }),
            "X" => json!({ "command": "X", "mine": true, "x": 1, "y": 2 }),
            "Q" => {
                let _ = socket.send(Message::Close(None)).await;
                return;
            }
            _ => json!({ "error": "Invalid command" }),
        };
        if socket.send(Message::Text(reply.to_string())).await.is_err() {
            return;
        }
    }
}
