use super::{controllers, middleware, models};
use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post, Router},
};
use tower_http::trace::TraceLayer;

#[rustfmt::skip]
pub fn get_routes() -> Router<models::AppState> {
    Router::new()
        .route("/", get(controllers::root))
        .route("/ping", get(controllers::ping))
        .route("/login", get(controllers::login_form))
        .route("/login", post(controllers::login))
        .route("/signup", get(controllers::signup_form))
        .route("/signup", post(controllers::signup))
        .route("/logout", post(controllers::logout))
        .route("/dashboard", get(controllers::dashboard))
        .route("/notes", get(controllers::list_notes))
        .route("/notes", post(controllers::create_note))
        .route("/notes/:id", post(controllers::update_note))
        .route("/notes/:id/edit", get(controllers::edit_form))
        .route("/notes/:id/delete", post(controllers::delete_note))
        .route("/notes/:id/pin", post(controllers::toggle_pin))
        .route("/notes/:id/archive", post(controllers::toggle_archive))
        .route("/notes/:id/expand", post(controllers::toggle_expanded))
        .route("/notes/:id/export-menu", post(controllers::open_export_menu))
        .route("/notes/:id/export.txt", get(controllers::export_note_text))
        .route("/notes/:id/export.html", get(controllers::export_note_html))
        .route("/export-menu/close", post(controllers::close_export_menu))
        .route("/export/notes.txt", get(controllers::export_all))
        .route("/draft/new", get(controllers::draft_new))
        .route("/draft/tags", post(controllers::draft_tags))
        .route("/draft/stats", post(controllers::draft_stats))
        .fallback(controllers::not_found)
}

pub fn app(state: models::AppState) -> Router {
    get_routes()
        .layer(from_fn_with_state(
            state.clone(),
            middleware::forget_rejected_sessions,
        ))
        .layer(from_fn(middleware::html_headers))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
