//! HTTP gateway to the host CMS's subscriber collection-auth endpoints.
//!
//! The flows never mint their own sessions; login, session resolution, and
//! logout are delegated to the host so its cookies and token lifetimes stay
//! authoritative.

use async_trait::async_trait;
use serde_json::Value;

use linkletter_application::{AuthSession, HostAuthGateway, SessionHeaders};
use linkletter_core::{AppError, AppResult};
use linkletter_domain::EmailAddress;

/// HTTP implementation of the host auth gateway port.
#[derive(Clone)]
pub struct HttpHostAuthGateway {
    http_client: reqwest::Client,
    server_url: String,
}

impl HttpHostAuthGateway {
    /// Creates a gateway against the host server base URL.
    #[must_use]
    pub fn new(http_client: reqwest::Client, server_url: impl Into<String>) -> Self {
        let server_url = server_url.into();
        Self {
            http_client,
            server_url: server_url.trim_end_matches('/').to_owned(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/api/subscribers{path}", self.server_url)
    }
}

#[async_trait]
impl HostAuthGateway for HttpHostAuthGateway {
    async fn login(
        &self,
        email: &EmailAddress,
        credential_secret: &str,
    ) -> AppResult<SessionHeaders> {
        let response = self
            .http_client
            .post(self.endpoint("/login"))
            .json(&serde_json::json!({
                "email": email.as_str(),
                "password": credential_secret,
            }))
            .send()
            .await
            .map_err(|error| AppError::Internal(format!("host login request failed: {error}")))?;

        if !response.status().is_success() {
            return Err(AppError::Internal(format!(
                "host login returned status {}",
                response.status()
            )));
        }

        // Forward every session-establishing header verbatim; the host's
        // cookies must reach the client untouched.
        let headers = response
            .headers()
            .get_all(reqwest::header::SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .map(|value| ("set-cookie".to_owned(), value.to_owned()))
            .collect();

        Ok(headers)
    }

    async fn authenticate(&self, cookie: Option<&str>) -> AppResult<Option<AuthSession>> {
        let mut request = self.http_client.get(self.endpoint("/me"));
        if let Some(cookie) = cookie {
            request = request.header(reqwest::header::COOKIE, cookie);
        }

        let response = request.send().await.map_err(|error| {
            AppError::Internal(format!("host session lookup failed: {error}"))
        })?;

        if !response.status().is_success() {
            return Ok(None);
        }

        let body: Value = response.json().await.map_err(|error| {
            AppError::Internal(format!("host session response was not JSON: {error}"))
        })?;

        let user = body.get("user").cloned().unwrap_or(Value::Null);
        if user.is_null() {
            return Ok(None);
        }

        let Some(address) = user.get("email").and_then(Value::as_str) else {
            return Ok(None);
        };
        let email = EmailAddress::new(address)?;

        Ok(Some(AuthSession {
            email,
            subscriber: user,
            permissions: body.get("permissions").cloned().unwrap_or(Value::Null),
        }))
    }

    async fn logout(&self, cookie: Option<&str>) -> AppResult<String> {
        let mut request = self.http_client.post(self.endpoint("/logout"));
        if let Some(cookie) = cookie {
            request = request.header(reqwest::header::COOKIE, cookie);
        }

        let response = request
            .send()
            .await
            .map_err(|error| AppError::Internal(format!("host logout failed: {error}")))?;

        if !response.status().is_success() {
            return Err(AppError::Internal(format!(
                "host logout returned status {}",
                response.status()
            )));
        }

        let body: Value = response.json().await.unwrap_or(Value::Null);
        let message = body
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("Logged out successfully.")
            .to_owned();

        Ok(message)
    }
}
