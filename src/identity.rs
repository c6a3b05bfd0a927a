use async_trait::async_trait;
use hyper::header::COOKIE;
use hyper::HeaderMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cookie::CookieCodec;
use crate::error::Result;

pub const SESSION_COOKIE_NAME: &str = "remix-recipes__session";

/// 会话 cookie 的内容
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user_id: String,
}

/// 根据请求头解析当前访问者
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// 已登录返回访问者 id，否则 `None`
    async fn resolve(&self, headers: &HeaderMap) -> Result<Option<String>>;
}

#[derive(Debug, Clone)]
pub struct SessionCookieResolver {
    codec: CookieCodec,
}

impl SessionCookieResolver {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            codec: session_cookie(vec![secret.into()]),
        }
    }

    pub fn codec(&self) -> &CookieCodec {
        &self.codec
    }
}

/// 签名、HttpOnly、Secure 的会话 cookie
pub fn session_cookie(secrets: Vec<String>) -> CookieCodec {
    CookieCodec::new(SESSION_COOKIE_NAME)
        .with_secrets(secrets)
        .http_only()
        .secure()
}

#[async_trait]
impl IdentityResolver for SessionCookieResolver {
    async fn resolve(&self, headers: &HeaderMap) -> Result<Option<String>> {
        let cookie_header = headers.get(COOKIE).and_then(|v| v.to_str().ok());
        let session: Option<Session> = self.codec.parse(cookie_header);
        debug!("Resolved viewer: {:?}", session.as_ref().map(|s| s.user_id.as_str()));
        Ok(session.map(|s| s.user_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::header::HeaderValue;

    fn headers_with_cookie(cookie: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_str(cookie).unwrap());
        headers
    }

    #[tokio::test]
    async fn test_resolves_signed_session() {
        let resolver = SessionCookieResolver::new("secret");
        let set_cookie = resolver
            .codec()
            .serialize(&Session { user_id: "u42".into() })
            .unwrap();
        let pair = set_cookie.split(';').next().unwrap();

        let viewer = resolver.resolve(&headers_with_cookie(pair)).await.unwrap();
        assert_eq!(viewer.as_deref(), Some("u42"));
    }

    #[tokio::test]
    async fn test_anonymous_without_cookie() {
        let resolver = SessionCookieResolver::new("secret");
        assert!(resolver.resolve(&HeaderMap::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_forged_session_is_anonymous() {
        let resolver = SessionCookieResolver::new("secret");
        let forged = session_cookie(vec!["guess".into()])
            .serialize(&Session { user_id: "admin".into() })
            .unwrap();
        let pair = forged.split(';').next().unwrap();

        assert!(resolver.resolve(&headers_with_cookie(pair)).await.unwrap().is_none());
    }
}
