// Session negotiation against `/llu/auth/login`.
//
// Login can bounce in two known ways before it succeeds:
//
// ```text
//   login ──► Success ──────────────────────────► SessionContext
//     │
//     ├──► RedirectRequired(region) ─► switch host, login again   (once)
//     ├──► VersionRejected(min)     ─► bump version, login again  (once)
//     └──► Rejected                 ─► LluError::Auth
// ```
//
// Each adaptive path may be taken once per negotiation, in either order, so
// at most three login requests are issued. A repeated signal means the
// upstream contract moved and is reported as `LluError::Protocol`.

use crate::api::{ApiRequest, RawResponse, Transport};
use crate::error::{LluError, LluResult};
use crate::headers::{authed_headers, base_headers, build_account_header};
use crate::resolver::{ClientConfig, EndpointState};
use serde_json::{json, Value};
use std::fmt;
use tracing::{debug, info, warn};

pub const LOGIN_PATH: &str = "/llu/auth/login";

/// Upstream body status for "client version too old".
const MINIMUM_VERSION_STATUS: i64 = 920;

/// Follower account credentials. Never logged.
#[derive(Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &"<redacted>")
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Authenticated request context produced by [`negotiate`]. Immutable; data
/// calls that need a different version header derive a new value.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionContext {
    base_url: String,
    version_header: String,
    product: String,
    auth_token: String,
    account_id_header: String,
}

impl SessionContext {
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn version_header(&self) -> &str {
        &self.version_header
    }

    pub fn product(&self) -> &str {
        &self.product
    }

    pub fn auth_token(&self) -> &str {
        &self.auth_token
    }

    pub fn account_id_header(&self) -> &str {
        &self.account_id_header
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn with_version(&self, version: &str) -> Self {
        Self {
            version_header: version.to_string(),
            ..self.clone()
        }
    }
}

impl fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionContext")
            .field("base_url", &self.base_url)
            .field("version_header", &self.version_header)
            .field("product", &self.product)
            .field("auth_token", &"<redacted>")
            .field("account_id_header", &self.account_id_header)
            .finish()
    }
}

/// What a single login response means for the negotiation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    Success { auth_token: String, user_id: String },
    RedirectRequired { region: String },
    VersionRejected { minimum_version: String },
    Rejected { status: u16, message: String },
}

/// Classify a login response. Only a redirect without a region is an error
/// here; everything else becomes an outcome.
pub fn classify_login(res: &RawResponse) -> LluResult<LoginOutcome> {
    let payload = match res.json() {
        Some(payload) => payload,
        None => {
            return Ok(LoginOutcome::Rejected {
                status: res.status,
                message: format!("non-JSON login response: {}", res.snippet()),
            })
        }
    };

    if let Some(minimum_version) = minimum_version(res.status, &payload) {
        return Ok(LoginOutcome::VersionRejected { minimum_version });
    }

    if !res.is_success() || body_status(&payload).unwrap_or(0) != 0 {
        return Ok(LoginOutcome::Rejected {
            status: res.status,
            message: rejection_message(&payload),
        });
    }

    let data = payload.get("data");
    if data.and_then(|d| d.get("redirect")).and_then(Value::as_bool) == Some(true) {
        let region = data
            .and_then(|d| d.get("region"))
            .or_else(|| payload.get("region"))
            .and_then(Value::as_str)
            .filter(|r| !r.is_empty())
            .ok_or_else(|| LluError::Protocol("login redirect without a region".into()))?;
        return Ok(LoginOutcome::RedirectRequired {
            region: region.to_string(),
        });
    }

    let auth_token = match extract_token(&payload) {
        Some(token) => token,
        None => {
            return Ok(LoginOutcome::Rejected {
                status: res.status,
                message: "login response missing auth token".into(),
            })
        }
    };
    let user_id = match data
        .and_then(|d| d.get("user"))
        .and_then(|u| u.get("id"))
        .and_then(value_as_string)
    {
        Some(id) => id,
        None => {
            return Ok(LoginOutcome::Rejected {
                status: res.status,
                message: "login response missing user id".into(),
            })
        }
    };

    Ok(LoginOutcome::Success {
        auth_token,
        user_id,
    })
}

/// Log in, following at most one region redirect and one version bump.
pub fn negotiate<T: Transport>(
    transport: &T,
    config: &ClientConfig,
    credentials: &Credentials,
) -> LluResult<SessionContext> {
    let mut endpoint = EndpointState::new(config);
    let body = json!({
        "email": credentials.email,
        "password": credentials.password,
    });

    loop {
        let url = endpoint.url(LOGIN_PATH);
        debug!(url = %url, version = %endpoint.version, "Sending login request");
        let headers = base_headers(&config.product, &endpoint.version)?;
        let res = transport.send(&ApiRequest::post(url, headers, body.clone()))?;

        match classify_login(&res)? {
            LoginOutcome::Success {
                auth_token,
                user_id,
            } => {
                info!(base_url = %endpoint.base_url, version = %endpoint.version, "Logged in");
                return Ok(SessionContext {
                    base_url: endpoint.base_url,
                    version_header: endpoint.version,
                    product: config.product.clone(),
                    auth_token,
                    account_id_header: build_account_header(&user_id),
                });
            }
            LoginOutcome::RedirectRequired { region } => {
                if !endpoint.redirect(&config.regions, &region)? {
                    return Err(LluError::Protocol(format!(
                        "repeated login redirect (region {})",
                        region
                    )));
                }
                info!(region = %region, base_url = %endpoint.base_url, "Login redirected to region host");
            }
            LoginOutcome::VersionRejected { minimum_version } => {
                if !endpoint.bump_version(&minimum_version) {
                    return Err(LluError::Protocol(format!(
                        "minimum version {} still rejected after version bump",
                        minimum_version
                    )));
                }
                warn!(version = %minimum_version, "Upstream requires newer client version, retrying login");
            }
            LoginOutcome::Rejected { status, message } => {
                return Err(LluError::Auth { status, message });
            }
        }
    }
}

/// GET an authenticated endpoint and return the full JSON payload. A 920
/// rejection is retried once with the minimum version the upstream names.
pub fn authed_get<T: Transport>(
    transport: &T,
    session: &SessionContext,
    path: &str,
) -> LluResult<Value> {
    let mut bumped: Option<SessionContext> = None;

    loop {
        let ctx = bumped.as_ref().unwrap_or(session);
        let url = ctx.url(path);
        debug!(url = %url, version = %ctx.version_header(), "Sending authenticated request");
        let res = transport.send(&ApiRequest::get(url, authed_headers(ctx)?))?;

        if let Some(minimum_version) = res.json().and_then(|p| minimum_version(res.status, &p)) {
            if bumped.is_some() {
                return Err(LluError::Protocol(format!(
                    "minimum version {} still rejected on {}",
                    minimum_version, path
                )));
            }
            warn!(version = %minimum_version, path = %path, "Upstream requires newer client version, retrying");
            let next = ctx.with_version(&minimum_version);
            bumped = Some(next);
            continue;
        }

        return data_payload(&res, path);
    }
}

fn data_payload(res: &RawResponse, path: &str) -> LluResult<Value> {
    match res.status {
        401 | 403 => {
            let message = res
                .json()
                .map(|p| rejection_message(&p))
                .unwrap_or_else(|| res.snippet());
            return Err(LluError::Auth {
                status: res.status,
                message,
            });
        }
        500..=599 => {
            return Err(LluError::Network(format!(
                "{} returned {}: {}",
                path,
                res.status,
                res.snippet()
            )))
        }
        _ if !res.is_success() => {
            return Err(LluError::Protocol(format!(
                "{} returned {}: {}",
                path,
                res.status,
                res.snippet()
            )))
        }
        _ => {}
    }

    let payload = res.json().ok_or_else(|| {
        LluError::Extraction(format!("non-JSON response from {}: {}", path, res.snippet()))
    })?;
    match body_status(&payload) {
        Some(0) | None => Ok(payload),
        Some(status) => Err(LluError::Protocol(format!(
            "{} answered with status {}: {}",
            path,
            status,
            rejection_message(&payload)
        ))),
    }
}

fn minimum_version(http_status: u16, payload: &Value) -> Option<String> {
    if http_status != 403 || body_status(payload) != Some(MINIMUM_VERSION_STATUS) {
        return None;
    }
    payload
        .get("data")
        .and_then(|d| d.get("minimumVersion"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn body_status(payload: &Value) -> Option<i64> {
    payload.get("status").and_then(Value::as_i64)
}

// data.authTicket.token on login; ticket.token and bare token show up on
// other endpoints.
fn extract_token(payload: &Value) -> Option<String> {
    let data = payload.get("data");
    [
        data.and_then(|d| d.get("authTicket")).and_then(|t| t.get("token")),
        data.and_then(|d| d.get("token")),
        payload.get("ticket").and_then(|t| t.get("token")),
        payload.get("token"),
    ]
    .into_iter()
    .flatten()
    .filter_map(Value::as_str)
    .find(|t| !t.is_empty())
    .map(str::to_string)
}

fn rejection_message(payload: &Value) -> String {
    if let Some(message) = payload
        .get("error")
        .and_then(|e| e.get("message"))
        .and_then(Value::as_str)
    {
        return message.to_string();
    }
    if let Some(step) = payload
        .get("data")
        .and_then(|d| d.get("step"))
        .and_then(|s| s.get("componentName"))
        .and_then(Value::as_str)
    {
        return format!("account requires action in the LibreLinkUp app ({})", step);
    }
    if let Some(message) = payload.get("message").and_then(Value::as_str) {
        return message.to_string();
    }
    format!("status {}", body_status(payload).unwrap_or(-1))
}

fn value_as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn res(status: u16, body: Value) -> RawResponse {
        RawResponse::new(status, body.to_string())
    }

    #[test]
    fn success_payload_is_classified() {
        let outcome = classify_login(&res(
            200,
            json!({"status": 0, "data": {"user": {"id": "u-1"}, "authTicket": {"token": "tok", "expires": 1}}}),
        ))
        .unwrap();
        assert_eq!(
            outcome,
            LoginOutcome::Success {
                auth_token: "tok".into(),
                user_id: "u-1".into()
            }
        );
    }

    #[test]
    fn redirect_payload_is_classified() {
        let outcome = classify_login(&res(200, json!({"status": 0, "data": {"redirect": true, "region": "eu"}}))).unwrap();
        assert_eq!(outcome, LoginOutcome::RedirectRequired { region: "eu".into() });
    }

    #[test]
    fn redirect_without_region_is_protocol_error() {
        let err = classify_login(&res(200, json!({"status": 0, "data": {"redirect": true}}))).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Protocol);
    }

    #[test]
    fn version_rejection_needs_http_403() {
        let body = json!({"status": 920, "data": {"minimumVersion": "4.16.0"}});
        assert_eq!(
            classify_login(&res(403, body.clone())).unwrap(),
            LoginOutcome::VersionRejected {
                minimum_version: "4.16.0".into()
            }
        );
        assert!(matches!(
            classify_login(&res(200, body)).unwrap(),
            LoginOutcome::Rejected { .. }
        ));
    }

    #[test]
    fn bad_credentials_are_rejected_with_upstream_message() {
        let outcome = classify_login(&res(200, json!({"status": 2, "error": {"message": "notAuthenticated"}}))).unwrap();
        assert_eq!(
            outcome,
            LoginOutcome::Rejected {
                status: 200,
                message: "notAuthenticated".into()
            }
        );
    }

    #[test]
    fn terms_step_is_reported() {
        let outcome = classify_login(&res(
            200,
            json!({"status": 4, "data": {"step": {"type": "tou", "componentName": "AcceptDocument"}}}),
        ))
        .unwrap();
        match outcome {
            LoginOutcome::Rejected { message, .. } => assert!(message.contains("AcceptDocument")),
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn missing_token_or_user_is_rejected() {
        let no_token = classify_login(&res(200, json!({"status": 0, "data": {"user": {"id": "u"}}}))).unwrap();
        assert!(matches!(no_token, LoginOutcome::Rejected { .. }));
        let no_user = classify_login(&res(200, json!({"status": 0, "data": {"authTicket": {"token": "t"}}}))).unwrap();
        assert!(matches!(no_user, LoginOutcome::Rejected { .. }));
    }

    #[test]
    fn token_fallback_locations() {
        assert_eq!(extract_token(&json!({"ticket": {"token": "a"}})), Some("a".into()));
        assert_eq!(extract_token(&json!({"data": {"token": "b"}})), Some("b".into()));
        assert_eq!(extract_token(&json!({"token": "c"})), Some("c".into()));
        assert_eq!(extract_token(&json!({"data": {"authTicket": {"token": ""}}})), None);
    }

    #[test]
    fn non_json_login_is_rejected() {
        let outcome = classify_login(&RawResponse::new(502, "Bad Gateway")).unwrap();
        assert!(matches!(outcome, LoginOutcome::Rejected { status: 502, .. }));
    }

    #[test]
    fn credentials_debug_hides_secrets() {
        let creds = Credentials::new("me@example.com", "hunter2");
        let shown = format!("{:?}", creds);
        assert!(!shown.contains("hunter2"));
        assert!(!shown.contains("me@example.com"));
    }
}
