//! Manual-verification binary: drives the request gateway against a
//! running server (`store.backend = "memory"` is enough).
//!
//! $ cargo run --bin client_demo -- --settings=settings/dev.toml

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use storefront::client::*;
use storefront::logger::*;
use storefront::settings::*;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let logger = Logger::new_bootstrap();
    let cli = Cli::parse();
    let project_settings = parse_settings(cli.settings.as_deref())?;
    logger.reload_from_config(&LogConfig {
        filter: project_settings.log.filter.clone(),
    })?;

    // the dev server runs on a self-signed certificate
    let http = reqwest::Client::builder()
        .danger_accept_invalid_certs(true)
        .build()?;
    let transport = Arc::new(ReqwestTransport::with_client(
        http,
        project_settings.client.base_url.clone(),
    ));
    let session = Arc::new(SessionCoordinator::new());
    let gateway = RequestGateway::new(
        transport,
        session,
        GatewayConfig {
            refresh_path: "refresh_token".to_string(),
            refresh_timeout: Duration::from_millis(project_settings.client.refresh_timeout_ms),
            rate_limit_backoff: Duration::from_millis(
                project_settings.client.rate_limit_backoff_ms,
            ),
        },
    );

    let username = format!("demo-user-{}", nanoid::nanoid!(8));
    let password = "demo-secret";

    let signup = gateway
        .execute(ApiRequest::post(
            "signup",
            Some(json!({ "username": username, "password": password })),
        ))
        .await;
    info!(?signup, "signup");

    let user_id = gateway.login(&username, password).await?;
    info!(%user_id, "logged in");

    let set_name = gateway
        .execute(ApiRequest::post(
            "profile_mutate",
            Some(json!({ "op": "set", "key": "display_name", "value": "Demo User" })),
        ))
        .await?;
    info!(status = set_name.status, "profile_mutate");

    let profile = gateway.execute(ApiRequest::get("profile")).await?;
    info!(body = %profile.body, "profile");

    let cart = gateway.execute(ApiRequest::get("cart")).await?;
    info!(body = %cart.body, "cart");

    gateway.logout().await;
    info!("logged out");

    Ok(())
}
