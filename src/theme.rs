use std::fmt;
use std::str::FromStr;

use hyper::header::COOKIE;
use hyper::HeaderMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cookie::CookieCodec;

pub const THEME_COOKIE_NAME: &str = "remix-recipes__theme";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Red,
    Orange,
    Yellow,
    #[default]
    Green,
    Blue,
    Purple,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    pub primary: &'static str,
    pub primary_light: &'static str,
}

impl Theme {
    pub const ALL: [Theme; 6] = [
        Theme::Red,
        Theme::Orange,
        Theme::Yellow,
        Theme::Green,
        Theme::Blue,
        Theme::Purple,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Red => "red",
            Theme::Orange => "orange",
            Theme::Yellow => "yellow",
            Theme::Green => "green",
            Theme::Blue => "blue",
            Theme::Purple => "purple",
        }
    }

    pub fn palette(&self) -> Palette {
        let (primary, primary_light) = match self {
            Theme::Red => ("#f22524", "#f56665"),
            Theme::Orange => ("#ff4b00", "#ff814d"),
            Theme::Yellow => ("#cc9800", "#ffbf00"),
            Theme::Blue => ("#01a3e1", "#30c5fe"),
            Theme::Purple => ("#5325c0", "#8666d2"),
            Theme::Green => ("#00743e", "#4c9d77"),
        };
        Palette {
            primary,
            primary_light,
        }
    }

    /// `theme.css` 的内容
    pub fn stylesheet(&self) -> String {
        let palette = self.palette();
        format!(
            ":root {{\n  --color-primary: {};\n  --color-primary-light: {};\n}}\n",
            palette.primary, palette.primary_light
        )
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Theme::ALL
            .into_iter()
            .find(|theme| theme.as_str() == s)
            .ok_or_else(|| format!("Unknown theme: {}", s))
    }
}

/// 主题 cookie 不含敏感数据，不签名
pub fn theme_cookie() -> CookieCodec {
    CookieCodec::new(THEME_COOKIE_NAME)
}

/// 从请求 cookie 读取主题，缺失或无法识别时使用默认主题
pub fn theme_from_headers(headers: &HeaderMap) -> Theme {
    let cookie_header = headers.get(COOKIE).and_then(|v| v.to_str().ok());
    let stored: Option<String> = theme_cookie().parse(cookie_header);
    let theme = stored
        .and_then(|name| name.parse().ok())
        .unwrap_or_default();
    debug!("Theme from cookie: {}", theme);
    theme
}
