use std::env;
use std::num::NonZeroU32;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use common_auth::TokenConfig;
use common_security::RoutePolicy;

pub const COOKIE_SECURE_VAR: &str = "AUTH_COOKIE_SECURE";
pub const COOKIE_SAME_SITE_VAR: &str = "AUTH_COOKIE_SAMESITE";
pub const ROUTE_POLICY_VAR: &str = "AUTH_ROUTE_POLICY";
pub const DIRECTORY_PATH_VAR: &str = "AUTH_DIRECTORY_PATH";

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8085;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CookieSameSite {
    Lax,
    Strict,
    None,
}

impl CookieSameSite {
    pub fn as_str(&self) -> &'static str {
        match self {
            CookieSameSite::Lax => "Lax",
            CookieSameSite::Strict => "Strict",
            CookieSameSite::None => "None",
        }
    }
}

/// Attributes of the session cookie that carries the token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieSettings {
    pub name: String,
    pub secure: bool,
    pub same_site: CookieSameSite,
    /// Matches the token lifetime so the browser drops the cookie when the
    /// token stops verifying.
    pub max_age: NonZeroU32,
}

impl CookieSettings {
    pub fn for_token(config: &TokenConfig) -> Self {
        Self {
            name: config.cookie_name.clone(),
            secure: false,
            same_site: CookieSameSite::Lax,
            max_age: config.lifetime,
        }
    }

    /// `Set-Cookie` value that stores `token`.
    pub fn session_header(&self, token: &str) -> String {
        self.render(token, self.max_age.get())
    }

    /// `Set-Cookie` value that makes the browser drop the cookie.
    pub fn clear_header(&self) -> String {
        self.render("", 0)
    }

    fn render(&self, value: &str, max_age: u32) -> String {
        let mut cookie = format!(
            "{}={value}; HttpOnly; Path=/; Max-Age={max_age}; SameSite={}",
            self.name,
            self.same_site.as_str()
        );
        // Browsers reject SameSite=None without Secure.
        if self.secure || self.same_site == CookieSameSite::None {
            cookie.push_str("; Secure");
        }
        cookie
    }
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub token: TokenConfig,
    pub cookie: CookieSettings,
    pub route_policy: RoutePolicy,
    pub directory_path: Option<PathBuf>,
    pub host: String,
    pub port: u16,
}

pub fn load_service_config() -> Result<ServiceConfig> {
    load_from(|key| env::var(key).ok())
}

pub fn load_from<F>(lookup: F) -> Result<ServiceConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let token = TokenConfig::from_lookup(&lookup).context("Failed to load token settings")?;

    let mut cookie = CookieSettings::for_token(&token);
    if let Some(secure) = lookup(COOKIE_SECURE_VAR).map(|value| parse_bool(&value)) {
        cookie.secure = secure;
    }
    if let Some(value) = lookup(COOKIE_SAME_SITE_VAR).and_then(|v| normalize_optional(&v)) {
        cookie.same_site = parse_same_site(&value)
            .with_context(|| format!("Failed to parse {COOKIE_SAME_SITE_VAR}"))?;
    }

    let route_policy = match lookup(ROUTE_POLICY_VAR).and_then(|v| normalize_optional(&v)) {
        Some(value) => RoutePolicy::parse(&value)
            .with_context(|| format!("Failed to parse {ROUTE_POLICY_VAR}"))?,
        None => RoutePolicy::tutoring_default(),
    };

    let directory_path = lookup(DIRECTORY_PATH_VAR)
        .and_then(|value| normalize_optional(&value))
        .map(PathBuf::from);

    let host = lookup("HOST")
        .and_then(|value| normalize_optional(&value))
        .unwrap_or_else(|| DEFAULT_HOST.to_string());
    let port = match lookup("PORT").and_then(|value| normalize_optional(&value)) {
        Some(value) => value
            .parse::<u16>()
            .map_err(|err| anyhow!("Invalid PORT '{value}': {err}"))?,
        None => DEFAULT_PORT,
    };

    Ok(ServiceConfig {
        token,
        cookie,
        route_policy,
        directory_path,
        host,
        port,
    })
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn normalize_optional(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn parse_same_site(value: &str) -> Result<CookieSameSite> {
    match value.trim().to_ascii_lowercase().as_str() {
        "lax" => Ok(CookieSameSite::Lax),
        "strict" => Ok(CookieSameSite::Strict),
        "none" => Ok(CookieSameSite::None),
        other => Err(anyhow!(
            "Unsupported cookie same-site policy '{other}'. Use Lax, Strict, or None."
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common_auth::{Role, TokenEngine};
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<ServiceConfig> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        load_from(|key| vars.get(key).cloned())
    }

    #[test]
    fn missing_secret_is_fatal() {
        let err = load(&[("PORT", "9000")]).expect_err("secret required");
        assert!(format!("{err:#}").contains("AUTH_TOKEN_SECRET"));
    }

    #[test]
    fn defaults() {
        let config = load(&[("AUTH_TOKEN_SECRET", "s3cret")]).expect("config");
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8085);
        assert_eq!(config.token.engine, TokenEngine::Standard);
        assert_eq!(config.cookie.name, "token");
        assert_eq!(config.cookie.same_site, CookieSameSite::Lax);
        assert!(!config.cookie.secure);
        assert_eq!(config.cookie.max_age.get(), 604_800);
        assert_eq!(config.route_policy, RoutePolicy::tutoring_default());
        assert!(config.directory_path.is_none());
    }

    #[test]
    fn overrides() {
        let config = load(&[
            ("AUTH_TOKEN_SECRET", "s3cret"),
            ("AUTH_TOKEN_LIFETIME_SECONDS", "900"),
            ("AUTH_TOKEN_ENGINE", "edge"),
            ("AUTH_COOKIE_NAME", "session"),
            (COOKIE_SECURE_VAR, "yes"),
            (COOKIE_SAME_SITE_VAR, "strict"),
            (ROUTE_POLICY_VAR, "/ops=ADMIN"),
            (DIRECTORY_PATH_VAR, "/etc/auth/users.json"),
            ("HOST", "127.0.0.1"),
            ("PORT", "9001"),
        ])
        .expect("config");
        assert_eq!(config.token.engine, TokenEngine::Edge);
        assert_eq!(config.cookie.name, "session");
        assert_eq!(config.cookie.max_age.get(), 900);
        assert!(config.cookie.secure);
        assert_eq!(config.cookie.same_site, CookieSameSite::Strict);
        assert_eq!(config.route_policy.allowed_roles("/ops/x"), Some(&[Role::Admin][..]));
        assert_eq!(config.route_policy.allowed_roles("/admin"), None);
        assert_eq!(
            config.directory_path,
            Some(PathBuf::from("/etc/auth/users.json"))
        );
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 9001);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(load(&[("AUTH_TOKEN_SECRET", "s"), (COOKIE_SAME_SITE_VAR, "sometimes")]).is_err());
        assert!(load(&[("AUTH_TOKEN_SECRET", "s"), (ROUTE_POLICY_VAR, "/x=ROOT")]).is_err());
        assert!(load(&[("AUTH_TOKEN_SECRET", "s"), ("PORT", "http")]).is_err());
    }

    #[test]
    fn cookie_headers() {
        let config = load(&[("AUTH_TOKEN_SECRET", "s3cret")]).expect("config");
        assert_eq!(
            config.cookie.session_header("abc"),
            "token=abc; HttpOnly; Path=/; Max-Age=604800; SameSite=Lax"
        );
        assert_eq!(
            config.cookie.clear_header(),
            "token=; HttpOnly; Path=/; Max-Age=0; SameSite=Lax"
        );

        let none = CookieSettings {
            same_site: CookieSameSite::None,
            ..config.cookie
        };
        assert!(none.session_header("abc").ends_with("SameSite=None; Secure"));
    }

    #[test]
    fn parse_bool_accepts_common_spellings() {
        for value in ["1", "true", "YES", " on "] {
            assert!(parse_bool(value), "{value}");
        }
        for value in ["0", "false", "no", ""] {
            assert!(!parse_bool(value), "{value}");
        }
    }
}
