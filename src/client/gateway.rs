use crate::client::session::{CredentialPair, SessionCoordinator};
use crate::client::transport::{ApiRequest, HttpTransport, RawResponse, TransportError};
use crate::domain_model::UserId;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::warn;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// No session established; the authorization failure was not a reason
    /// to refresh.
    #[error("not authenticated")]
    Unauthenticated,
    /// Refresh attempted and failed, or the replayed request failed
    /// authorization again.
    #[error("session expired")]
    SessionExpired,
    /// Still rate limited after the single backoff retry.
    #[error("rate limited")]
    RateLimited,
    #[error("upstream unavailable: {0}")]
    Upstream(String),
}

impl From<TransportError> for GatewayError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Network(e) => GatewayError::Upstream(e),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub refresh_path: String,
    pub refresh_timeout: Duration,
    pub rate_limit_backoff: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        GatewayConfig {
            refresh_path: "refresh_token".to_string(),
            refresh_timeout: Duration::from_secs(10),
            rate_limit_backoff: Duration::from_millis(500),
        }
    }
}

// Client-side mirrors of the API response envelope and token payloads.

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: bool,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct TokensPayload {
    access_token: String,
    refresh_token: String,
    access_token_expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct SessionPayload {
    #[serde(default)]
    user_id: Option<UserId>,
    tokens: TokensPayload,
}

fn decode_session(body: &serde_json::Value) -> Result<(Option<UserId>, CredentialPair), GatewayError> {
    let envelope: Envelope<SessionPayload> = serde_json::from_value(body.clone())
        .map_err(|e| GatewayError::Upstream(format!("malformed session payload: {e}")))?;
    let payload = match envelope {
        Envelope {
            success: true,
            data: Some(payload),
        } => payload,
        _ => return Err(GatewayError::Upstream("session payload missing".to_string())),
    };
    let pair = CredentialPair {
        access_token: payload.tokens.access_token,
        refresh_token: payload.tokens.refresh_token,
        expires_at: payload.tokens.access_token_expires_at,
    };
    Ok((payload.user_id, pair))
}

/// Client-side interceptor every outbound call goes through. Applies the
/// decision table: pass-through, refresh-then-replay, wait-then-replay,
/// or surface-failure. The original request is replayed at most once.
pub struct RequestGateway {
    transport: Arc<dyn HttpTransport>,
    session: Arc<SessionCoordinator>,
    config: GatewayConfig,
}

impl RequestGateway {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        session: Arc<SessionCoordinator>,
        config: GatewayConfig,
    ) -> Self {
        RequestGateway {
            transport,
            session,
            config,
        }
    }

    pub fn session(&self) -> &Arc<SessionCoordinator> {
        &self.session
    }

    /// Establish a session. Login failures never trigger a refresh.
    pub async fn login(&self, username: &str, password: &str) -> Result<UserId, GatewayError> {
        let request = ApiRequest::post(
            "login",
            Some(json!({ "username": username, "password": password })),
        );
        let response = self.transport.execute(&request, None).await?;
        if response.is_authorization_failure() {
            return Err(GatewayError::Unauthenticated);
        }
        if !response.is_success() {
            return Err(GatewayError::Upstream(format!(
                "login rejected with status {}",
                response.status
            )));
        }

        let (user_id, pair) = decode_session(&response.body)?;
        self.session.replace(pair).await;
        user_id.ok_or_else(|| GatewayError::Upstream("login payload missing user id".to_string()))
    }

    /// Best-effort server-side revocation, then drop the local session.
    pub async fn logout(&self) {
        if let Some(creds) = self.session.current().await {
            let request = ApiRequest::post("logout", None);
            if let Err(e) = self
                .transport
                .execute(&request, Some(creds.refresh_token.as_str()))
                .await
            {
                warn!("logout revocation failed: {e}");
            }
        }
        self.session.clear().await;
    }

    pub async fn execute(&self, request: ApiRequest) -> Result<RawResponse, GatewayError> {
        let creds = self.session.current().await;
        let observed_gen = self.session.generation();
        let bearer = creds.as_ref().map(|c| c.access_token.as_str());

        let mut response = self.transport.execute(&request, bearer).await?;

        // Rate limiting is retried once after a fixed backoff; it is not
        // part of the refresh protocol.
        if response.is_rate_limited() {
            sleep(self.config.rate_limit_backoff).await;
            response = self.transport.execute(&request, bearer).await?;
            if response.is_rate_limited() {
                return Err(GatewayError::RateLimited);
            }
        }

        if !response.is_authorization_failure() {
            return Ok(response);
        }

        if creds.is_none() {
            // anonymous traffic: surface, never refresh
            return Err(GatewayError::Unauthenticated);
        }

        self.resolve_refresh(observed_gen).await?;

        // Replay exactly once with whatever credential is now current. A
        // second authorization failure is surfaced, never re-refreshed.
        let replay_creds = self
            .session
            .current()
            .await
            .ok_or(GatewayError::SessionExpired)?;
        let response = self
            .transport
            .execute(&request, Some(replay_creds.access_token.as_str()))
            .await?;
        if response.is_authorization_failure() {
            return Err(GatewayError::SessionExpired);
        }
        Ok(response)
    }

    /// Funnel all concurrent authorization failures into at most one
    /// refresh call. The winner runs the refresh in a detached task (an
    /// abandoned caller must not cancel a refresh others wait on); losers
    /// block on the gate and proceed once it settles.
    async fn resolve_refresh(&self, observed_gen: u64) -> Result<(), GatewayError> {
        let Some(guard) = self.session.try_acquire_refresh() else {
            self.session.wait_for_refresh().await;
            return Ok(());
        };

        if self.session.generation() != observed_gen {
            // credentials already rotated since this request attached its
            // token; nothing left to do
            return Ok(());
        }

        let session = self.session.clone();
        let transport = self.transport.clone();
        let refresh_path = self.config.refresh_path.clone();
        let refresh_timeout = self.config.refresh_timeout;

        let task = tokio::spawn(async move {
            // gate releases when the shared refresh settles, not when the
            // winning caller goes away
            let _guard = guard;
            let outcome = timeout(
                refresh_timeout,
                refresh_once(transport.as_ref(), &session, &refresh_path),
            )
            .await;
            match outcome {
                Ok(Ok(pair)) => {
                    session.replace(pair).await;
                    true
                }
                Ok(Err(e)) => {
                    warn!("credential refresh failed, logging out: {e}");
                    session.clear().await;
                    false
                }
                Err(_) => {
                    warn!("credential refresh timed out, logging out");
                    session.clear().await;
                    false
                }
            }
        });

        match task.await {
            Ok(true) => Ok(()),
            Ok(false) => Err(GatewayError::SessionExpired),
            Err(e) => Err(GatewayError::Upstream(format!("refresh task failed: {e}"))),
        }
    }
}

/// The refresh call itself. The refresh credential rides the transport
/// credential channel, never the request body. Network errors and
/// rejections are treated identically by the caller: log out.
async fn refresh_once(
    transport: &dyn HttpTransport,
    session: &SessionCoordinator,
    refresh_path: &str,
) -> Result<CredentialPair, GatewayError> {
    let creds = session.current().await.ok_or(GatewayError::SessionExpired)?;
    let request = ApiRequest::post(refresh_path, None);
    let response = transport
        .execute(&request, Some(creds.refresh_token.as_str()))
        .await?;
    if !response.is_success() {
        return Err(GatewayError::SessionExpired);
    }
    let (_, pair) = decode_session(&response.body)?;
    Ok(pair)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::future::join_all;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    const REFRESH_PATH: &str = "refresh_token";

    #[derive(Clone, Copy, PartialEq)]
    enum RefreshMode {
        Rotate,
        Reject,
        Hang,
    }

    struct ScriptedTransport {
        accepted: Mutex<String>,
        refresh_mode: RefreshMode,
        refresh_delay: Duration,
        refresh_calls: AtomicUsize,
        data_calls: AtomicUsize,
        reject_all_data: AtomicBool,
        rate_limit_next: AtomicBool,
    }

    impl ScriptedTransport {
        fn new(accepted: &str, refresh_mode: RefreshMode) -> Self {
            ScriptedTransport {
                accepted: Mutex::new(accepted.to_string()),
                refresh_mode,
                refresh_delay: Duration::from_millis(50),
                refresh_calls: AtomicUsize::new(0),
                data_calls: AtomicUsize::new(0),
                reject_all_data: AtomicBool::new(false),
                rate_limit_next: AtomicBool::new(false),
            }
        }

        fn tokens_body(access: &str) -> serde_json::Value {
            let now = Utc::now();
            json!({
                "success": true,
                "data": {
                    "tokens": {
                        "access_token": access,
                        "refresh_token": format!("{access}-refresh"),
                        "access_token_expires_at": now + chrono::Duration::minutes(15),
                        "refresh_token_expires_at": now + chrono::Duration::days(7),
                    }
                }
            })
        }
    }

    #[async_trait::async_trait]
    impl HttpTransport for ScriptedTransport {
        async fn execute(
            &self,
            request: &ApiRequest,
            bearer: Option<&str>,
        ) -> Result<RawResponse, TransportError> {
            if request.path == REFRESH_PATH {
                let n = self.refresh_calls.fetch_add(1, Ordering::SeqCst) + 1;
                return match self.refresh_mode {
                    RefreshMode::Hang => {
                        sleep(Duration::from_secs(30)).await;
                        Err(TransportError::Network("refresh never returned".into()))
                    }
                    RefreshMode::Reject => {
                        sleep(self.refresh_delay).await;
                        Ok(RawResponse {
                            status: 401,
                            body: serde_json::Value::Null,
                        })
                    }
                    RefreshMode::Rotate => {
                        sleep(self.refresh_delay).await;
                        let fresh = format!("fresh-{n}");
                        *self.accepted.lock().unwrap() = fresh.clone();
                        Ok(RawResponse {
                            status: 200,
                            body: Self::tokens_body(&fresh),
                        })
                    }
                };
            }

            self.data_calls.fetch_add(1, Ordering::SeqCst);
            if self.rate_limit_next.swap(false, Ordering::SeqCst) {
                return Ok(RawResponse {
                    status: 429,
                    body: serde_json::Value::Null,
                });
            }
            let authorized = !self.reject_all_data.load(Ordering::SeqCst)
                && bearer == Some(self.accepted.lock().unwrap().as_str());
            if authorized {
                Ok(RawResponse {
                    status: 200,
                    body: json!({ "success": true, "data": [] }),
                })
            } else {
                Ok(RawResponse {
                    status: 401,
                    body: serde_json::Value::Null,
                })
            }
        }
    }

    fn stale_pair() -> CredentialPair {
        CredentialPair {
            access_token: "stale".to_string(),
            refresh_token: "stale-refresh".to_string(),
            expires_at: Utc::now() - chrono::Duration::minutes(1),
        }
    }

    fn gateway_with(
        transport: Arc<ScriptedTransport>,
        refresh_timeout: Duration,
    ) -> (Arc<RequestGateway>, Arc<SessionCoordinator>) {
        let session = Arc::new(SessionCoordinator::new());
        let config = GatewayConfig {
            refresh_path: REFRESH_PATH.to_string(),
            refresh_timeout,
            rate_limit_backoff: Duration::from_millis(10),
        };
        let gateway = Arc::new(RequestGateway::new(transport, session.clone(), config));
        (gateway, session)
    }

    #[tokio::test]
    async fn concurrent_expiry_triggers_exactly_one_refresh() {
        let transport = Arc::new(ScriptedTransport::new("valid", RefreshMode::Rotate));
        let (gateway, session) = gateway_with(transport.clone(), Duration::from_secs(5));
        session.replace(stale_pair()).await;

        let callers: Vec<_> = (0..50)
            .map(|_| {
                let gateway = gateway.clone();
                tokio::spawn(async move { gateway.execute(ApiRequest::get("cart")).await })
            })
            .collect();

        for result in join_all(callers).await {
            let response = result.unwrap().unwrap();
            assert_eq!(response.status, 200);
        }

        assert_eq!(transport.refresh_calls.load(Ordering::SeqCst), 1);
        let current = session.current().await.unwrap();
        assert_eq!(current.access_token, "fresh-1");
    }

    #[tokio::test]
    async fn second_authorization_failure_is_surfaced_without_another_refresh() {
        let transport = Arc::new(ScriptedTransport::new("valid", RefreshMode::Rotate));
        transport.reject_all_data.store(true, Ordering::SeqCst);
        let (gateway, session) = gateway_with(transport.clone(), Duration::from_secs(5));
        session.replace(stale_pair()).await;

        let result = gateway.execute(ApiRequest::get("cart")).await;

        assert!(matches!(result, Err(GatewayError::SessionExpired)));
        assert_eq!(transport.refresh_calls.load(Ordering::SeqCst), 1);
        // original call plus exactly one replay
        assert_eq!(transport.data_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn anonymous_failures_never_attempt_a_refresh() {
        let transport = Arc::new(ScriptedTransport::new("valid", RefreshMode::Rotate));
        let (gateway, _session) = gateway_with(transport.clone(), Duration::from_secs(5));

        let result = gateway.execute(ApiRequest::get("cart")).await;

        assert!(matches!(result, Err(GatewayError::Unauthenticated)));
        assert_eq!(transport.refresh_calls.load(Ordering::SeqCst), 0);
        assert_eq!(transport.data_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_refresh_logs_out_every_waiter_uniformly() {
        let transport = Arc::new(ScriptedTransport::new("valid", RefreshMode::Reject));
        let (gateway, session) = gateway_with(transport.clone(), Duration::from_secs(5));
        session.replace(stale_pair()).await;

        let callers: Vec<_> = (0..8)
            .map(|_| {
                let gateway = gateway.clone();
                tokio::spawn(async move { gateway.execute(ApiRequest::get("favorites")).await })
            })
            .collect();

        for result in join_all(callers).await {
            assert!(matches!(result.unwrap(), Err(GatewayError::SessionExpired)));
        }

        assert_eq!(transport.refresh_calls.load(Ordering::SeqCst), 1);
        assert!(session.current().await.is_none());
    }

    #[tokio::test]
    async fn refresh_timeout_releases_the_gate_and_logs_out() {
        let transport = Arc::new(ScriptedTransport::new("valid", RefreshMode::Hang));
        let (gateway, session) = gateway_with(transport.clone(), Duration::from_millis(50));
        session.replace(stale_pair()).await;

        let started = tokio::time::Instant::now();
        let result = gateway.execute(ApiRequest::get("cart")).await;
        assert!(matches!(result, Err(GatewayError::SessionExpired)));
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(session.current().await.is_none());

        // the gate is free again: the next call fails fast as anonymous
        // instead of deadlocking behind a stuck refresh
        let next = gateway.execute(ApiRequest::get("cart")).await;
        assert!(matches!(next, Err(GatewayError::Unauthenticated)));
    }

    #[tokio::test]
    async fn rate_limited_requests_retry_once_after_backoff() {
        let transport = Arc::new(ScriptedTransport::new("valid", RefreshMode::Rotate));
        let (gateway, session) = gateway_with(transport.clone(), Duration::from_secs(5));
        session
            .replace(CredentialPair {
                access_token: "valid".to_string(),
                refresh_token: "valid-refresh".to_string(),
                expires_at: Utc::now() + chrono::Duration::minutes(15),
            })
            .await;

        transport.rate_limit_next.store(true, Ordering::SeqCst);
        let response = gateway.execute(ApiRequest::get("cart")).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(transport.data_calls.load(Ordering::SeqCst), 2);
        // the retry is not part of the refresh protocol
        assert_eq!(transport.refresh_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn login_establishes_the_session() {
        struct LoginTransport;

        #[async_trait::async_trait]
        impl HttpTransport for LoginTransport {
            async fn execute(
                &self,
                request: &ApiRequest,
                _bearer: Option<&str>,
            ) -> Result<RawResponse, TransportError> {
                assert_eq!(request.path, "login");
                let mut body = ScriptedTransport::tokens_body("first");
                body["data"]["user_id"] = json!(uuid::Uuid::new_v4());
                Ok(RawResponse { status: 200, body })
            }
        }

        let session = Arc::new(SessionCoordinator::new());
        let gateway = RequestGateway::new(
            Arc::new(LoginTransport),
            session.clone(),
            GatewayConfig::default(),
        );

        gateway.login("storefront-user", "secret123").await.unwrap();

        let current = session.current().await.unwrap();
        assert_eq!(current.access_token, "first");
        assert_eq!(current.refresh_token, "first-refresh");
        assert!(session.is_authenticated().await);
    }
}
