//! HTTP transport to the Murmur administrative bridge.
//!
//! Talks JSON to the admin bridge exposed next to the Ice endpoint. The
//! shared secret travels as a header on every request and is verified by
//! the bridge before any call reaches the server.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::error::{GatewayError, GatewayResult};
use super::transport::MetaTransport;
use super::types::{
    ChannelAcl, ChannelInfo, NewChannel, NewRegistration, OnlineUser, ServerSummary, UserRecord,
};

const SECRET_HEADER: &str = "x-murmur-secret";

/// Production [`MetaTransport`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    base_url: String,
    secret: Option<String>,
    timeout: Duration,
    client: reqwest::Client,
}

impl HttpTransport {
    /// Build a transport for `host:port`.
    ///
    /// Fails fast on missing host or a zero port; nothing touches the
    /// network until the first call.
    pub fn new(
        host: &str,
        port: u16,
        secret: Option<String>,
        timeout: Duration,
    ) -> GatewayResult<Self> {
        if host.trim().is_empty() {
            return Err(GatewayError::Config("control host not configured".into()));
        }
        if port == 0 {
            return Err(GatewayError::Config("invalid control port".into()));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Config(e.to_string()))?;

        Ok(Self {
            base_url: format!("http://{host}:{port}"),
            secret,
            timeout,
            client,
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let mut req = self.client.request(method, format!("{}{path}", self.base_url));
        if let Some(secret) = &self.secret {
            req = req.header(SECRET_HEADER, secret);
        }
        req
    }

    fn map_send_error(&self, err: reqwest::Error) -> GatewayError {
        if err.is_timeout() {
            GatewayError::Timeout(self.timeout)
        } else if err.is_connect() {
            GatewayError::Transport(format!("cannot reach {}: {err}", self.base_url))
        } else {
            GatewayError::Transport(err.to_string())
        }
    }

    async fn check_status(response: reqwest::Response) -> GatewayResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let detail = response.text().await.unwrap_or_default();
        match status {
            StatusCode::NOT_FOUND => Err(GatewayError::NotFound(if detail.is_empty() {
                "remote object".to_string()
            } else {
                detail
            })),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(
                GatewayError::ConnectionFailed(format!("authentication rejected: {detail}")),
            ),
            _ => Err(GatewayError::Remote(format!("{status}: {detail}"))),
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> GatewayResult<T> {
        let response = self
            .request(reqwest::Method::GET, path)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;
        Self::check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| GatewayError::Remote(format!("malformed response: {e}")))
    }

    async fn send_json<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        method: reqwest::Method,
        path: &str,
        body: &B,
    ) -> GatewayResult<T> {
        let response = self
            .request(method, path)
            .json(body)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;
        Self::check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| GatewayError::Remote(format!("malformed response: {e}")))
    }

    async fn send_no_content<B: Serialize + Sync>(
        &self,
        method: reqwest::Method,
        path: &str,
        body: &B,
    ) -> GatewayResult<()> {
        let response = self
            .request(method, path)
            .json(body)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;
        Self::check_status(response).await.map(|_| ())
    }
}

/// Response wrapper for calls that return a freshly assigned id.
#[derive(Debug, serde::Deserialize)]
struct CreatedId {
    id: i32,
}

#[async_trait]
impl MetaTransport for HttpTransport {
    async fn ping_meta(&self) -> GatewayResult<()> {
        let response = self
            .request(reqwest::Method::GET, "/ping")
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;
        Self::check_status(response).await.map(|_| ())
    }

    async fn list_servers(&self) -> GatewayResult<Vec<i32>> {
        self.get_json("/servers").await
    }

    async fn ping_server(&self, server_id: i32) -> GatewayResult<()> {
        let response = self
            .request(reqwest::Method::GET, &format!("/servers/{server_id}/ping"))
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;
        Self::check_status(response).await.map(|_| ())
    }

    async fn server_summary(&self, server_id: i32) -> GatewayResult<ServerSummary> {
        self.get_json(&format!("/servers/{server_id}")).await
    }

    async fn registered_users(
        &self,
        server_id: i32,
        filter: &str,
    ) -> GatewayResult<Vec<UserRecord>> {
        let path = format!(
            "/servers/{server_id}/registrations?filter={}",
            urlencode(filter)
        );
        self.get_json(&path).await
    }

    async fn get_registration(
        &self,
        server_id: i32,
        user_id: i32,
    ) -> GatewayResult<Option<UserRecord>> {
        match self
            .get_json(&format!("/servers/{server_id}/registrations/{user_id}"))
            .await
        {
            Ok(record) => Ok(Some(record)),
            Err(GatewayError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn register_user(&self, server_id: i32, reg: &NewRegistration) -> GatewayResult<i32> {
        let created: CreatedId = self
            .send_json(
                reqwest::Method::POST,
                &format!("/servers/{server_id}/registrations"),
                reg,
            )
            .await?;
        Ok(created.id)
    }

    async fn update_registration(
        &self,
        server_id: i32,
        user_id: i32,
        reg: &NewRegistration,
    ) -> GatewayResult<()> {
        self.send_no_content(
            reqwest::Method::PUT,
            &format!("/servers/{server_id}/registrations/{user_id}"),
            reg,
        )
        .await
    }

    async fn unregister_user(&self, server_id: i32, user_id: i32) -> GatewayResult<()> {
        let response = self
            .request(
                reqwest::Method::DELETE,
                &format!("/servers/{server_id}/registrations/{user_id}"),
            )
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;
        Self::check_status(response).await.map(|_| ())
    }

    async fn online_users(&self, server_id: i32) -> GatewayResult<Vec<OnlineUser>> {
        self.get_json(&format!("/servers/{server_id}/users")).await
    }

    async fn channels(&self, server_id: i32) -> GatewayResult<Vec<ChannelInfo>> {
        self.get_json(&format!("/servers/{server_id}/channels")).await
    }

    async fn add_channel(&self, server_id: i32, channel: &NewChannel) -> GatewayResult<i32> {
        let created: CreatedId = self
            .send_json(
                reqwest::Method::POST,
                &format!("/servers/{server_id}/channels"),
                channel,
            )
            .await?;
        Ok(created.id)
    }

    async fn move_session(
        &self,
        server_id: i32,
        session: i32,
        channel_id: i32,
    ) -> GatewayResult<()> {
        self.send_no_content(
            reqwest::Method::POST,
            &format!("/servers/{server_id}/sessions/{session}/move"),
            &serde_json::json!({ "channel": channel_id }),
        )
        .await
    }

    async fn kick_session(&self, server_id: i32, session: i32, reason: &str) -> GatewayResult<()> {
        self.send_no_content(
            reqwest::Method::POST,
            &format!("/servers/{server_id}/sessions/{session}/kick"),
            &serde_json::json!({ "reason": reason }),
        )
        .await
    }

    async fn get_acl(&self, server_id: i32, channel_id: i32) -> GatewayResult<ChannelAcl> {
        self.get_json(&format!("/servers/{server_id}/channels/{channel_id}/acl"))
            .await
    }

    async fn set_acl(&self, server_id: i32, acl: &ChannelAcl) -> GatewayResult<()> {
        self.send_no_content(
            reqwest::Method::PUT,
            &format!("/servers/{server_id}/channels/{}/acl", acl.channel_id),
            acl,
        )
        .await
    }

    async fn set_authenticated(
        &self,
        server_id: i32,
        username: &str,
        authenticated: bool,
    ) -> GatewayResult<()> {
        self.send_no_content(
            reqwest::Method::POST,
            &format!("/servers/{server_id}/authenticated"),
            &serde_json::json!({ "name": username, "authenticated": authenticated }),
        )
        .await
    }
}

/// Minimal percent-encoding for query values; usernames are already
/// restricted to a safe alphabet plus spaces.
fn urlencode(value: &str) -> String {
    value.replace(' ', "%20")
}
