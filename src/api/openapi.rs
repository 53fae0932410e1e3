//! Generated API documentation, served at `/docs`.

use utoipa::OpenApi;

use crate::api::{error::ErrorBody, handlers};

// Info (title, version, license) comes from the package metadata.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health::health,
        handlers::auth::signup::signup,
        handlers::auth::login::login,
        handlers::auth::session::refresh,
        handlers::auth::session::logout,
        handlers::auth::session::me,
        handlers::auth::change_password::change_password,
        handlers::resources::tweets::create_tweet,
        handlers::resources::tweets::update_tweet,
        handlers::resources::tweets::delete_tweet,
        handlers::resources::comments::create_comment,
        handlers::resources::comments::update_comment,
        handlers::resources::comments::delete_comment,
        handlers::resources::playlists::create_playlist,
        handlers::resources::playlists::update_playlist,
        handlers::resources::playlists::delete_playlist,
        handlers::resources::playlists::add_video,
        handlers::resources::playlists::remove_video,
        handlers::resources::videos::publish_video,
        handlers::resources::videos::update_video,
        handlers::resources::videos::toggle_publish,
        handlers::resources::videos::delete_video,
    ),
    components(schemas(
        ErrorBody,
        handlers::auth::types::SignupRequest,
        handlers::auth::types::LoginRequest,
        handlers::auth::types::RefreshRequest,
        handlers::auth::types::ChangePasswordRequest,
        handlers::auth::types::UserResponse,
        handlers::auth::types::LoginResponse,
        handlers::auth::types::TokenPairResponse,
        handlers::auth::types::MessageResponse,
        handlers::resources::types::TweetBody,
        handlers::resources::types::CommentBody,
        handlers::resources::types::CreatePlaylistRequest,
        handlers::resources::types::UpdatePlaylistRequest,
        handlers::resources::types::PublishVideoRequest,
        handlers::resources::types::UpdateVideoRequest,
        handlers::resources::types::TweetResponse,
        handlers::resources::types::CommentResponse,
        handlers::resources::types::PlaylistResponse,
        handlers::resources::types::VideoResponse,
    )),
    tags(
        (name = "health", description = "Service liveness"),
        (name = "users", description = "Identity and session lifecycle"),
        (name = "tweets", description = "Short text posts"),
        (name = "comments", description = "Video comments"),
        (name = "playlists", description = "Playlists and their videos"),
        (name = "videos", description = "Video publishing")
    )
)]
pub struct ApiDoc;
