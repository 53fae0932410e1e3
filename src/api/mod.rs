//! HTTP surface: router, middleware stack and server loop.

use anyhow::{Context, Result};
use axum::{
    body::Body,
    http::{header, HeaderName, HeaderValue, Method, Request},
    middleware,
    routing::{get, patch, post},
    Extension, Router,
};
use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{debug_span, info, Span};
use ulid::Ulid;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::media::{HttpMediaStore, SharedMediaStore};

pub mod error;
pub mod handlers;
mod openapi;

use handlers::auth::{auth_gate, AuthConfig, AuthState};

/// Routes that answer without an authenticated identity.
fn public_router() -> Router {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/v1/users/signup", post(handlers::auth::signup::signup))
        .route("/v1/users/login", post(handlers::auth::login::login))
        // Refresh carries its own proof and must work once the access
        // token has already expired.
        .route("/v1/users/refresh", post(handlers::auth::session::refresh))
}

/// Routes behind the authentication gate.
fn protected_router() -> Router {
    use handlers::resources::{comments, playlists, tweets, videos};

    Router::new()
        .route("/v1/users/me", get(handlers::auth::session::me))
        .route("/v1/users/logout", post(handlers::auth::session::logout))
        .route(
            "/v1/users/change-password",
            post(handlers::auth::change_password::change_password),
        )
        .route("/v1/tweets", post(tweets::create_tweet))
        .route(
            "/v1/tweets/:id",
            patch(tweets::update_tweet).delete(tweets::delete_tweet),
        )
        .route(
            "/v1/videos/:video_id/comments",
            post(comments::create_comment),
        )
        .route(
            "/v1/comments/:id",
            patch(comments::update_comment).delete(comments::delete_comment),
        )
        .route("/v1/playlists", post(playlists::create_playlist))
        .route(
            "/v1/playlists/:id",
            patch(playlists::update_playlist).delete(playlists::delete_playlist),
        )
        .route(
            "/v1/playlists/:id/videos/:video_id",
            post(playlists::add_video).delete(playlists::remove_video),
        )
        .route("/v1/videos", post(videos::publish_video))
        .route(
            "/v1/videos/:id",
            patch(videos::update_video).delete(videos::delete_video),
        )
        .route("/v1/videos/:id/publish", patch(videos::toggle_publish))
        .route_layer(middleware::from_fn(auth_gate))
}

/// Start the API server.
///
/// # Errors
/// Returns an error if the database is unreachable, the media client or
/// CORS origin cannot be built, or the listener fails to bind.
pub async fn serve(port: u16, dsn: String, auth_config: AuthConfig, media_url: String) -> Result<()> {
    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(&dsn)
        .await
        .context("Failed to connect to database")?;

    let media: SharedMediaStore = Arc::new(HttpMediaStore::new(&media_url)?);

    let allowed_origin = auth_config.public_origin()?;
    let auth_state = Arc::new(AuthState::new(auth_config));

    // Cookies ride on credentialed requests, so the origin must be exact.
    let cors = CorsLayer::new()
        .allow_origin(allowed_origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    let app = public_router()
        .merge(protected_router())
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", openapi::ApiDoc::openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(cors)
                .layer(Extension(pool))
                .layer(Extension(auth_state))
                .layer(Extension(media)),
        );

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let headers = request.headers();
    let path = request.uri().path();
    let request_id = headers
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");

    debug_span!("http-request", path, request_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routers_compose() {
        let _app: Router = public_router().merge(protected_router());
    }
}
