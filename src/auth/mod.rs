use crate::state::AppState;
use axum::Router;

mod claims;
mod cookie;
mod dto;
pub(crate) mod extractors;
pub mod handlers;
pub mod jwt;
mod password;
pub mod repo;
pub mod repo_types;


pub fn router() -> Router<AppState> {
    handlers::auth_routes()
}
