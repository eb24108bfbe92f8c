//! Resolves the shape of the application from its directory, the platform environment and the
//! buildpack descriptor metadata.

use libcnb::data::layer::LayerName;
use libcnb::data::layer_name;
use libcnb::Env;
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub(crate) const DEFAULT_WEB_DIR: &str = "htdocs";
pub(crate) const DEFAULT_SCRIPT: &str = "app.php";
pub(crate) const DEFAULT_LIB_DIR: &str = "lib";
pub(crate) const DEFAULT_SERVER_ADMIN: &str = "admin@localhost";

const SERVER_ENV_VAR: &str = "BP_PHP_SERVER";
const WEB_DIR_ENV_VAR: &str = "BP_PHP_WEB_DIR";
const SCRIPT_ENV_VAR: &str = "BP_PHP_SCRIPT";
const LIB_DIR_ENV_VAR: &str = "BP_PHP_LIB_DIR";
const SERVER_ADMIN_ENV_VAR: &str = "BP_PHP_SERVER_ADMIN";
const HTTPS_REDIRECT_ENV_VAR: &str = "BP_PHP_ENABLE_HTTPS_REDIRECT";

/// The webserver used to serve a web application.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub(crate) enum Webserver {
    /// The web server built into the `php` binary (`php -S`).
    PhpBuiltIn,
    /// PHP-FPM behind Apache HTTPD.
    #[default]
    ApacheHttpd,
    /// PHP-FPM behind Nginx.
    Nginx,
}

impl Webserver {
    /// The build plan requirement that makes a sibling buildpack install this webserver.
    pub(crate) fn build_plan_requirement(self) -> Option<&'static str> {
        match self {
            Webserver::PhpBuiltIn => None,
            Webserver::ApacheHttpd => Some("httpd"),
            Webserver::Nginx => Some("nginx"),
        }
    }
}

impl FromStr for Webserver {
    type Err = UnknownWebserver;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "php-server" => Ok(Webserver::PhpBuiltIn),
            "httpd" => Ok(Webserver::ApacheHttpd),
            "nginx" => Ok(Webserver::Nginx),
            _ => Err(UnknownWebserver(String::from(value))),
        }
    }
}

impl fmt::Display for Webserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Webserver::PhpBuiltIn => write!(f, "PHP built-in web server"),
            Webserver::ApacheHttpd => write!(f, "PHP-FPM with Apache HTTPD"),
            Webserver::Nginx => write!(f, "PHP-FPM with Nginx"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown webserver `{0}`, expected one of `php-server`, `httpd` or `nginx`")]
pub(crate) struct UnknownWebserver(String);

/// How the application is started.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) enum AppKind {
    /// A web application served from `web_dir`, relative to the application root.
    WebApp { server: Webserver, web_dir: String },
    /// A PHP script at `path`, relative to the application root.
    Script { path: String },
}

impl AppKind {
    /// The layer the contributor owns for this kind of application.
    pub(crate) fn layer_name(&self) -> LayerName {
        match self {
            AppKind::WebApp { .. } => layer_name!("php-web"),
            AppKind::Script { .. } => layer_name!("php-script"),
        }
    }
}

impl fmt::Display for AppKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppKind::WebApp { server, web_dir } => {
                write!(f, "web app in `{web_dir}` using the {server}")
            }
            AppKind::Script { path } => write!(f, "script `{path}`"),
        }
    }
}

/// Everything the contributor needs to know about the application.
#[derive(Clone, Debug)]
pub(crate) struct AppDescriptor {
    pub(crate) root: PathBuf,
    pub(crate) kind: AppKind,
    pub(crate) lib_dir: String,
    pub(crate) server_admin: String,
    pub(crate) enable_https_redirect: bool,
}

impl AppDescriptor {
    pub(crate) fn new(root: impl Into<PathBuf>, kind: AppKind, config: &PhpWebConfig) -> Self {
        Self {
            root: root.into(),
            kind,
            lib_dir: config.lib_dir.clone(),
            server_admin: config.server_admin.clone(),
            enable_https_redirect: config.enable_https_redirect,
        }
    }
}

/// Defaults from the `[metadata]` table of `buildpack.toml`.
#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub(crate) struct PhpWebBuildpackMetadata {
    pub(crate) webserver: Option<String>,
    pub(crate) web_dir: Option<String>,
    pub(crate) script: Option<String>,
    pub(crate) lib_dir: Option<String>,
    pub(crate) server_admin: Option<String>,
    pub(crate) enable_https_redirect: Option<bool>,
}

/// Buildpack configuration after merging platform environment variables over the descriptor
/// metadata and the built-in defaults.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct PhpWebConfig {
    pub(crate) webserver: Webserver,
    pub(crate) web_dir: String,
    pub(crate) script: String,
    /// Whether the script was explicitly requested by the user.
    pub(crate) script_requested: bool,
    pub(crate) lib_dir: String,
    pub(crate) server_admin: String,
    pub(crate) enable_https_redirect: bool,
}

impl PhpWebConfig {
    pub(crate) fn resolve(
        metadata: &PhpWebBuildpackMetadata,
        platform_env: &Env,
    ) -> Result<Self, ConfigError> {
        let var = |key: &str| {
            platform_env
                .get(key)
                .map(|value| value.to_string_lossy().trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let webserver = var(SERVER_ENV_VAR)
            .or_else(|| metadata.webserver.clone())
            .map(|value| value.parse::<Webserver>())
            .transpose()?
            .unwrap_or_default();

        let enable_https_redirect = match var(HTTPS_REDIRECT_ENV_VAR) {
            Some(value) => parse_bool(HTTPS_REDIRECT_ENV_VAR, &value)?,
            None => metadata.enable_https_redirect.unwrap_or(false),
        };

        let requested_script = var(SCRIPT_ENV_VAR);
        let script_requested = requested_script.is_some();
        let script = requested_script
            .or_else(|| metadata.script.clone())
            .unwrap_or_else(|| String::from(DEFAULT_SCRIPT));

        // Scripts are started relative to the application root.
        if Path::new(&script).is_absolute() {
            return Err(ConfigError::AbsoluteScriptPath(script));
        }

        Ok(Self {
            webserver,
            web_dir: var(WEB_DIR_ENV_VAR)
                .or_else(|| metadata.web_dir.clone())
                .unwrap_or_else(|| String::from(DEFAULT_WEB_DIR)),
            script_requested,
            script,
            lib_dir: var(LIB_DIR_ENV_VAR)
                .or_else(|| metadata.lib_dir.clone())
                .unwrap_or_else(|| String::from(DEFAULT_LIB_DIR)),
            server_admin: var(SERVER_ADMIN_ENV_VAR)
                .or_else(|| metadata.server_admin.clone())
                .unwrap_or_else(|| String::from(DEFAULT_SERVER_ADMIN)),
            enable_https_redirect,
        })
    }
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidBoolean(key, String::from(value))),
    }
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum ConfigError {
    #[error(transparent)]
    UnknownWebserver(#[from] UnknownWebserver),
    #[error("Invalid value `{1}` for {0}, expected `true` or `false`")]
    InvalidBoolean(&'static str, String),
    #[error("Script path `{0}` must be relative to the application root")]
    AbsoluteScriptPath(String),
}

/// Determines how the application should be started.
///
/// An application with PHP files in its web directory is a web app. Otherwise, it's a script if
/// the user requested one or the application root contains PHP files. Returns `None` if the
/// application has no PHP sources at all.
pub(crate) fn detect_app_kind(
    app_dir: &Path,
    config: &PhpWebConfig,
) -> Result<Option<AppKind>, io::Error> {
    if contains_php_files(&app_dir.join(&config.web_dir))? {
        Ok(Some(AppKind::WebApp {
            server: config.webserver,
            web_dir: config.web_dir.clone(),
        }))
    } else if config.script_requested || contains_php_files(app_dir)? {
        Ok(Some(AppKind::Script {
            path: config.script.clone(),
        }))
    } else {
        Ok(None)
    }
}

fn contains_php_files(dir: &Path) -> Result<bool, io::Error> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(io_error) if io_error.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(io_error) => return Err(io_error),
    };

    for entry in entries {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|extension| extension == "php") {
            return Ok(true);
        }
    }

    Ok(false)
}
