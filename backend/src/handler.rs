use crate::queue::QueueService;
use crate::services::{UserId, UserService};
use crate::ws;
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;
use warp::{
    http::{header, Method, StatusCode},
    reply::{json, with_status},
    Filter, Rejection, Reply,
};

type Result<T> = std::result::Result<T, Rejection>;

pub type Sessions = Arc<RwLock<HashMap<String, UserId>>>;

#[derive(Clone)]
pub struct AppState {
    pub sessions: Sessions,
    pub queue: QueueService,
    pub users: Arc<dyn UserService>,
    pub address: SocketAddr,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    user_id: UserId,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct RegisterResponse {
    url: String,
}

#[derive(Serialize, Debug)]
struct ErrorResponse {
    message: String,
}

pub fn routes(state: AppState) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let health_route = warp::path!("health").and_then(health_handler);

    let register = warp::path("register");
    let register_routes = register
        .and(warp::post())
        .and(warp::body::json())
        .and(with_state(state.clone()))
        .and_then(register_handler)
        .or(register
            .and(warp::delete())
            .and(warp::path::param())
            .and(with_sessions(state.sessions.clone()))
            .and_then(unregister_handler));

    let ws_route = warp::path("ws")
        .and(warp::ws())
        .and(warp::path::param())
        .and(with_state(state))
        .and_then(ws_handler);

    health_route.or(register_routes).or(ws_route).with(
        warp::cors()
            .allow_credentials(true)
            .allow_methods(&[
                Method::OPTIONS,
                Method::GET,
                Method::POST,
                Method::DELETE,
                Method::PUT,
            ])
            .allow_headers(vec![
                header::CONTENT_TYPE,
                header::ACCEPT,
                header::ACCESS_CONTROL_ALLOW_ORIGIN,
            ])
            .expose_headers(vec![header::LINK])
            .max_age(300)
            .allow_any_origin(),
    )
}

fn with_state(state: AppState) -> impl Filter<Extract = (AppState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

fn with_sessions(sessions: Sessions) -> impl Filter<Extract = (Sessions,), Error = Infallible> + Clone {
    warp::any().map(move || sessions.clone())
}

pub async fn register_handler(body: RegisterRequest, state: AppState) -> Result<impl Reply> {
    let user_id = body.user_id;
    if let Err(err) = state.users.get(user_id).await {
        warn!(%user_id, "refused registration: {}", err);
        return Ok(with_status(
            json(&ErrorResponse {
                message: err.to_string(),
            }),
            StatusCode::NOT_FOUND,
        ));
    }

    let token = Uuid::new_v4().as_simple().to_string();
    state.sessions.write().await.insert(token.clone(), user_id);
    info!(%user_id, "registered");

    Ok(with_status(
        json(&RegisterResponse {
            url: format!("ws://{}/ws/{}", state.address, token),
        }),
        StatusCode::OK,
    ))
}

pub async fn unregister_handler(token: String, sessions: Sessions) -> Result<impl Reply> {
    sessions.write().await.remove(&token);
    Ok(StatusCode::OK)
}

pub async fn ws_handler(ws: warp::ws::Ws, token: String, state: AppState) -> Result<impl Reply> {
    let user_id = state.sessions.read().await.get(&token).copied();
    match user_id {
        Some(user_id) => {
            let queue = state.queue;
            Ok(ws.on_upgrade(move |socket| ws::client_connection(socket, user_id, queue)))
        }
        None => Err(warp::reject::not_found()),
    }
}

pub async fn health_handler() -> Result<impl Reply> {
    Ok(StatusCode::OK)
}
