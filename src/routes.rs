use std::collections::HashMap;

use bytes::Bytes;
use hyper::header::{HeaderValue, CACHE_CONTROL, CONTENT_TYPE, IF_NONE_MATCH, SET_COOKIE};
use hyper::{Body, HeaderMap, Method, Request, Response, StatusCode};
use percent_encoding::percent_decode_str;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::cache_control::apply_page_headers;
use crate::error::{AppError, FieldErrors, Result};
use crate::recipe::Recipe;
use crate::server::AppState;
use crate::theme::{theme_cookie, theme_from_headers, Theme};
use crate::utils::{has_query_param, header_str, json_response};

/// loader 数据请求的查询参数
pub const DATA_PARAM: &str = "_data";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// `/discover/{id}`；`document` 为 false 表示 `?_data` 数据请求
    DiscoverRecipe { id: String, document: bool },
    /// `/app/recipes/{id}`
    RecipeDetail { id: String },
    /// `/theme.css`
    ThemeCss,
    /// `/settings/app`
    AppSettings,
}

impl Route {
    /// 路径段先做百分号解码；解码后不是合法 UTF-8 的路径不匹配任何路由
    pub fn resolve(uri: &hyper::Uri) -> Option<Route> {
        let segments = uri
            .path()
            .trim_matches('/')
            .split('/')
            .map(|segment| percent_decode_str(segment).decode_utf8().ok())
            .collect::<Option<Vec<_>>>()?;
        let segments: Vec<&str> = segments.iter().map(|segment| segment.as_ref()).collect();

        match segments.as_slice() {
            ["discover", id] if !id.is_empty() => Some(Route::DiscoverRecipe {
                id: id.to_string(),
                document: !has_query_param(uri, DATA_PARAM),
            }),
            ["app", "recipes", id] if !id.is_empty() => Some(Route::RecipeDetail { id: id.to_string() }),
            ["theme.css"] => Some(Route::ThemeCss),
            ["settings", "app"] => Some(Route::AppSettings),
            _ => None,
        }
    }
}

/// 分发到具体的处理函数
pub async fn dispatch(state: &AppState, req: Request<Body>) -> Result<Response<Body>> {
    let route = Route::resolve(req.uri())
        .ok_or_else(|| AppError::NotFound(format!("No route matches {}", req.uri().path())))?;
    debug!("Resolved route: {:?}", route);

    let method = req.method().clone();
    // HEAD 走 GET 的处理函数，响应体由 hyper 丢弃
    let read = method == Method::GET || method == Method::HEAD;
    match (&method, route) {
        (_, Route::DiscoverRecipe { id, document }) if read => {
            discover_recipe(state, req.headers(), &id, document).await
        }
        (_, Route::RecipeDetail { id }) if read => recipe_detail(state, req.headers(), &id).await,
        (_, Route::ThemeCss) if read => theme_css(req.headers()),
        (_, Route::AppSettings) if read => settings_loader(req.headers()),
        (&Method::POST, Route::AppSettings) => {
            let body: Bytes = hyper::body::to_bytes(req.into_body())
                .await
                .map_err(|e| AppError::BadRequest(e.to_string()))?;
            settings_action(&body)
        }
        (_, _) => Err(AppError::MethodNotAllowed(method.to_string())),
    }
}

/// 菜谱发现页：loader 数据走资源级缓存，整页文档再套一层页面级缓存头
async fn discover_recipe(
    state: &AppState,
    headers: &HeaderMap,
    id: &str,
    document: bool,
) -> Result<Response<Body>> {
    let if_none_match = header_str(headers, IF_NONE_MATCH);
    let outcome = state.gateway.handle(id, if_none_match, headers).await?;

    let mut response = outcome.into_response()?;
    if document && apply_page_headers(response.headers_mut(), &state.profiles.page) {
        debug!("Applied page-level cache headers for recipe {}", id);
    }
    Ok(response)
}

/// 只有菜谱作者可以读取编辑视图
pub async fn require_recipe_owner(state: &AppState, headers: &HeaderMap, id: &str) -> Result<Recipe> {
    let viewer = state
        .identity
        .resolve(headers)
        .await?
        .ok_or_else(|| AppError::Unauthorized("You must be logged in".into()))?;

    let recipe = state
        .store
        .find_recipe(id)
        .await?
        .ok_or_else(|| AppError::NotFound("A recipe with that id does not exist".into()))?;

    if recipe.user_id != viewer {
        warn!("User {} denied access to recipe {}", viewer, id);
        return Err(AppError::Unauthorized("You are not authorized to view this recipe".into()));
    }
    Ok(recipe)
}

async fn recipe_detail(state: &AppState, headers: &HeaderMap, id: &str) -> Result<Response<Body>> {
    let recipe = require_recipe_owner(state, headers, id).await?;

    let mut response = json_response(StatusCode::OK, &json!({ "recipe": recipe }))?;
    response
        .headers_mut()
        .insert(CACHE_CONTROL, state.profiles.detail.header_value());
    Ok(response)
}

fn theme_css(headers: &HeaderMap) -> Result<Response<Body>> {
    let theme = theme_from_headers(headers);

    let mut response = Response::new(Body::from(theme.stylesheet()));
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("text/css"));
    Ok(response)
}

fn settings_loader(headers: &HeaderMap) -> Result<Response<Body>> {
    let theme = theme_from_headers(headers);
    json_response(StatusCode::OK, &json!({ "theme": theme }))
}

fn settings_action(body: &[u8]) -> Result<Response<Body>> {
    let form: HashMap<String, String> = url::form_urlencoded::parse(body).into_owned().collect();

    let theme = match form.get("theme") {
        Some(value) => value.parse::<Theme>().map_err(|e| field_error("theme", e))?,
        None => return Err(field_error("theme", "Required".into())),
    };
    info!("Theme changed to {}", theme);

    let mut response = json_response(StatusCode::OK, &json!({ "theme": theme }))?;
    let cookie = theme_cookie().serialize(&theme)?;
    response
        .headers_mut()
        .insert(SET_COOKIE, HeaderValue::from_str(&cookie)?);
    Ok(response)
}

fn field_error(field: &str, message: String) -> AppError {
    let mut errors = FieldErrors::new();
    errors.insert(field.to_string(), message);
    AppError::Validation(errors)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(uri: &str) -> Option<Route> {
        Route::resolve(&uri.parse().unwrap())
    }

    #[test]
    fn test_resolve_routes() {
        assert_eq!(
            resolve("/discover/r1"),
            Some(Route::DiscoverRecipe { id: "r1".into(), document: true })
        );
        assert_eq!(
            resolve("/discover/r1?_data=routes%2Fdiscover.%24recipeId"),
            Some(Route::DiscoverRecipe { id: "r1".into(), document: false })
        );
        assert_eq!(resolve("/app/recipes/r2/"), Some(Route::RecipeDetail { id: "r2".into() }));
        assert_eq!(resolve("/theme.css"), Some(Route::ThemeCss));
        assert_eq!(resolve("/settings/app"), Some(Route::AppSettings));
    }

    #[test]
    fn test_resolve_decodes_segments() {
        assert_eq!(
            resolve("/discover/r%201"),
            Some(Route::DiscoverRecipe { id: "r 1".into(), document: true })
        );
        assert_eq!(
            resolve("/app/recipes/caf%C3%A9"),
            Some(Route::RecipeDetail { id: "café".into() })
        );
        assert_eq!(resolve("/discover/%FF"), None);
    }

    #[test]
    fn test_unknown_routes() {
        assert_eq!(resolve("/"), None);
        assert_eq!(resolve("/discover"), None);
        assert_eq!(resolve("/discover/r1/extra"), None);
        assert_eq!(resolve("/pantry"), None);
    }

    #[tokio::test]
    async fn test_settings_action_sets_cookie() {
        let response = settings_action(b"theme=purple").unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let cookie = response.headers().get(SET_COOKIE).unwrap().to_str().unwrap();
        assert!(cookie.starts_with("remix-recipes__theme="));

        let body = hyper::body::to_bytes(response.into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["theme"], "purple");
    }

    #[test]
    fn test_settings_action_validation() {
        match settings_action(b"other=1") {
            Err(AppError::Validation(errors)) => assert_eq!(errors["theme"], "Required"),
            other => panic!("unexpected result: {:?}", other.map(|r| r.status())),
        }
        match settings_action(b"theme=magenta") {
            Err(AppError::Validation(errors)) => assert_eq!(errors["theme"], "Unknown theme: magenta"),
            other => panic!("unexpected result: {:?}", other.map(|r| r.status())),
        }
    }
}
