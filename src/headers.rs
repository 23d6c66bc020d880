// Request headers expected by the LibreLinkUp endpoints.

use crate::error::{LluError, LluResult};
use crate::session::SessionContext;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CACHE_CONTROL, CONTENT_TYPE};
use sha2::{Digest, Sha256};

/// Header carrying the declared client version. Upstream rejects stale values
/// with status 920.
pub const VERSION_HEADER: &str = "version";
pub const PRODUCT_HEADER: &str = "product";
pub const ACCOUNT_ID_HEADER: &str = "account-id";

/// Lowercase hex SHA-256 of the login user id, sent as `account-id`.
pub fn build_account_header(user_id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(user_id.as_bytes());
    hex::encode(hasher.finalize())
}

/// Headers sent on every request, authenticated or not.
pub fn base_headers(product: &str, version: &str) -> LluResult<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(HeaderName::from_static(PRODUCT_HEADER), header_value(product)?);
    headers.insert(HeaderName::from_static(VERSION_HEADER), header_value(version)?);
    Ok(headers)
}

/// Base headers plus bearer token and account id.
pub fn authed_headers(ctx: &SessionContext) -> LluResult<HeaderMap> {
    let mut headers = base_headers(ctx.product(), ctx.version_header())?;
    headers.insert(
        AUTHORIZATION,
        header_value(&format!("Bearer {}", ctx.auth_token()))?,
    );
    headers.insert(
        HeaderName::from_static(ACCOUNT_ID_HEADER),
        header_value(ctx.account_id_header())?,
    );
    Ok(headers)
}

fn header_value(raw: &str) -> LluResult<HeaderValue> {
    // Values come from config or upstream payloads, so a bad one means the
    // upstream sent something we cannot replay.
    HeaderValue::from_str(raw)
        .map_err(|_| LluError::Protocol(format!("value not usable as an HTTP header: {:?}", raw)))
}
