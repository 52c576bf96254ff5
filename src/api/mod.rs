use axum::Router;

pub mod admin;
pub mod chat;
pub mod club;
pub mod schedule;

pub fn app() -> Router {
    Router::new().nest("/club", club::app())
}
