use crate::api;
use crate::api::handlers::auth::AuthConfig;
use crate::cli::actions::Action;
use anyhow::Result;

/// Handle the server action
pub async fn handle(action: Action) -> Result<()> {
    match action {
        Action::Server {
            port,
            dsn,
            access_token_secret,
            refresh_token_secret,
            access_token_ttl,
            refresh_token_ttl,
            public_url,
            media_url,
        } => {
            let auth_config =
                AuthConfig::new(access_token_secret.into(), refresh_token_secret.into())
                    .with_access_token_ttl_secs(access_token_ttl)
                    .with_refresh_token_ttl_secs(refresh_token_ttl)
                    .with_public_base_url(public_url);

            api::serve(port, dsn, auth_config, media_url).await?;
        }
    }

    Ok(())
}
