//! 菜谱 loader 的条件重新验证。
//!
//! 每个请求独立执行：读取快照 -> 计算资源 etag -> 比较 `If-None-Match`
//! -> (仅在需要完整响应时) 解析访问者并计算页面 etag。
//! 服务端不缓存任何快照，也没有跨请求共享的可变状态。

use std::sync::Arc;

use hyper::header::{HeaderValue, CACHE_CONTROL, ETAG};
use hyper::{Body, HeaderMap, Response, StatusCode};
use serde_json::json;
use tracing::{debug, info};

use crate::cache_control::{CacheDirective, X_PAGE_ETAG};
use crate::digest::digest;
use crate::error::{AppError, Result};
use crate::identity::IdentityResolver;
use crate::recipe::Recipe;
use crate::store::RecipeStore;
use crate::utils::json_response;

/// 未登录访问者的身份标记
pub const ANONYMOUS: &str = "anonymous";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// 客户端已持有当前数据：304，无响应体
    NotModified { etag: String },
    /// 完整响应
    Fresh(FreshPayload),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FreshPayload {
    pub recipe: Recipe,
    pub etag: String,
    pub page_etag: String,
    pub directive: CacheDirective,
}

/// 页面 etag = digest(访问者标记 + "." + 资源 etag)
///
/// 已登录访问者的标记带 `user:` 前缀，与 [`ANONYMOUS`] 不会冲突。
pub fn page_etag(viewer: Option<&str>, resource_etag: &str) -> String {
    let token = match viewer {
        Some(id) => format!("user:{}", id),
        None => ANONYMOUS.to_string(),
    };
    digest(format!("{}.{}", token, resource_etag).as_bytes())
}

pub struct RevalidationGateway {
    store: Arc<dyn RecipeStore>,
    identity: Arc<dyn IdentityResolver>,
    directive: CacheDirective,
}

impl RevalidationGateway {
    pub fn new(
        store: Arc<dyn RecipeStore>,
        identity: Arc<dyn IdentityResolver>,
        directive: CacheDirective,
    ) -> Self {
        Self {
            store,
            identity,
            directive,
        }
    }

    /// 处理一次 loader 请求
    ///
    /// 访问者身份只在 `Fresh` 路径上通过 `request_headers` 解析。
    #[tracing::instrument(skip(self, request_headers))]
    pub async fn handle(
        &self,
        id: &str,
        if_none_match: Option<&str>,
        request_headers: &HeaderMap,
    ) -> Result<Outcome> {
        let recipe = self
            .store
            .find_recipe(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("A recipe with id {} does not exist", id)))?;
        debug!("Snapshot fetched for recipe {}", id);

        let etag = recipe.etag()?;
        debug!("Resource etag computed: {}", etag);

        if if_none_match.is_some_and(|tag| !tag.is_empty() && tag == etag) {
            info!("Recipe {} not modified", id);
            return Ok(Outcome::NotModified { etag });
        }

        let viewer = self.identity.resolve(request_headers).await?;
        let page_etag = page_etag(viewer.as_deref(), &etag);
        info!("Recipe {} served fresh, page etag {}", id, page_etag);

        Ok(Outcome::Fresh(FreshPayload {
            recipe,
            etag,
            page_etag,
            directive: self.directive,
        }))
    }
}

impl Outcome {
    pub fn status(&self) -> StatusCode {
        match self {
            Outcome::NotModified { .. } => StatusCode::NOT_MODIFIED,
            Outcome::Fresh(_) => StatusCode::OK,
        }
    }

    pub fn into_response(self) -> Result<Response<Body>> {
        let status = self.status();
        match self {
            Outcome::NotModified { etag } => {
                let mut response = Response::new(Body::empty());
                *response.status_mut() = status;
                response.headers_mut().insert(ETAG, HeaderValue::from_str(&etag)?);
                Ok(response)
            }
            Outcome::Fresh(payload) => {
                let mut response = json_response(status, &json!({ "recipe": payload.recipe }))?;
                let headers = response.headers_mut();
                headers.insert(ETAG, HeaderValue::from_str(&payload.etag)?);
                headers.insert(X_PAGE_ETAG, HeaderValue::from_str(&payload.page_etag)?);
                headers.insert(CACHE_CONTROL, payload.directive.header_value());
                Ok(response)
            }
        }
    }
}
