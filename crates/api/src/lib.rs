pub mod error;
pub mod extractors;
pub mod routes;
pub mod state;
pub mod ws;

use axum::{
    Router,
    http::HeaderValue,
    routing::{get, post, put},
};
use state::AppState;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.settings.app.cors_origins);

    let auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/me", get(routes::auth::me));

    let user_routes = Router::new()
        .route("/", get(routes::user::list))
        .route("/{user_id}", axum::routing::delete(routes::user::delete));

    // Events and their sub-collections
    let table_routes = Router::new()
        .route("/", get(routes::table::list).post(routes::table::create))
        .route(
            "/{table_id}",
            get(routes::table::get)
                .put(routes::table::update)
                .delete(routes::table::delete),
        )
        .route("/{table_id}/share", put(routes::table::share))
        .route(
            "/{table_id}/schedule",
            get(routes::table::get_schedule).put(routes::table::put_schedule),
        )
        .route(
            "/{table_id}/crew",
            get(routes::table::get_crew).put(routes::table::put_crew),
        )
        .route(
            "/{table_id}/tasks",
            get(routes::table::get_tasks).put(routes::table::put_tasks),
        )
        .route(
            "/{table_id}/travel",
            get(routes::table::get_travel).put(routes::table::put_travel),
        )
        .route(
            "/{table_id}/card-log",
            get(routes::table::get_card_log).put(routes::table::put_card_log),
        )
        .route(
            "/{table_id}/shotlists",
            get(routes::table::get_shotlists).put(routes::table::put_shotlists),
        )
        .route(
            "/{table_id}/gear",
            get(routes::table::get_gear).put(routes::table::put_gear),
        )
        .route(
            "/{table_id}/reserved-gear",
            get(routes::reserved_gear::list).post(routes::reserved_gear::create),
        )
        .route(
            "/{table_id}/reserved-gear/{item_id}",
            put(routes::reserved_gear::update).delete(routes::reserved_gear::delete),
        )
        .route(
            "/{table_id}/gear-packages/{package_id}/apply",
            post(routes::gear_package::apply),
        )
        .route("/{table_id}/chat", post(routes::chat::ask))
        .route("/{table_id}/chat/context", get(routes::chat::context));

    let package_routes = Router::new()
        .route(
            "/",
            get(routes::gear_package::list).post(routes::gear_package::create),
        )
        .route(
            "/{package_id}",
            get(routes::gear_package::get)
                .put(routes::gear_package::update)
                .delete(routes::gear_package::delete),
        );

    let inventory_routes = Router::new()
        .route(
            "/",
            get(routes::inventory::list).post(routes::inventory::create),
        )
        .route("/available", get(routes::inventory::available))
        .route("/reconcile", post(routes::inventory::reconcile))
        .route(
            "/{inventory_id}",
            get(routes::inventory::get)
                .put(routes::inventory::update)
                .delete(routes::inventory::delete),
        )
        .route(
            "/{inventory_id}/availability",
            get(routes::inventory::availability),
        );

    let manual_routes = Router::new()
        .route(
            "/",
            get(routes::manual_reservation::list).post(routes::manual_reservation::create),
        )
        .route(
            "/{id}",
            get(routes::manual_reservation::get)
                .put(routes::manual_reservation::update)
                .delete(routes::manual_reservation::delete),
        );

    let api = Router::new()
        .nest("/auth", auth_routes)
        .nest("/users", user_routes)
        .nest("/tables", table_routes)
        .nest("/gearPackages", package_routes)
        .nest("/gear-inventory", inventory_routes)
        .nest("/manual-reservations", manual_routes)
        .route("/reserved-gear", get(routes::reserved_gear::list_mine));

    let health = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api)
        .merge(health)
        .route("/ws", get(ws::handler::ws_upgrade))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if parsed.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(parsed)
    }
}

async fn health_check(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "ws_connections": state.ws_storage.connection_count(),
    }))
}
