mod app;
mod config;
mod contributor;
mod errors;
mod log;

use crate::app::{detect_app_kind, AppDescriptor, AppKind, PhpWebBuildpackMetadata, PhpWebConfig};
use crate::contributor::Contributor;
use crate::errors::{on_php_web_buildpack_error, PhpWebBuildpackError};
use crate::log::BuildLog;
use libcnb::build::{BuildContext, BuildResult, BuildResultBuilder};
use libcnb::data::build_plan::{BuildPlan, BuildPlanBuilder, Require};
use libcnb::detect::{DetectContext, DetectResult, DetectResultBuilder};
use libcnb::generic::GenericPlatform;
use libcnb::layer::UncachedLayerDefinition;
use libcnb::{buildpack_main, Buildpack, Env, Platform};
use libherokubuildpack::log::log_header;
use std::path::PathBuf;

// Suppress warnings due to the `unused_crate_dependencies` lint not handling integration tests well.
#[cfg(test)]
use libcnb_test as _;
#[cfg(test)]
use test_support as _;

const PHP_EXTENSION_DIR_ENV_VAR: &str = "PHP_EXTENSION_DIR";

pub(crate) struct PhpWebBuildpack;

impl Buildpack for PhpWebBuildpack {
    type Platform = GenericPlatform;
    type Metadata = PhpWebBuildpackMetadata;
    type Error = PhpWebBuildpackError;

    fn detect(&self, context: DetectContext<Self>) -> libcnb::Result<DetectResult, Self::Error> {
        let config = PhpWebConfig::resolve(
            &context.buildpack_descriptor.metadata,
            context.platform.env(),
        )
        .map_err(PhpWebBuildpackError::Config)?;

        match detect_app_kind(&context.app_dir, &config)
            .map_err(PhpWebBuildpackError::DetectAppKind)?
        {
            Some(kind) => DetectResultBuilder::pass()
                .build_plan(php_web_build_plan(&kind))
                .build(),
            None => DetectResultBuilder::fail().build(),
        }
    }

    fn build(&self, context: BuildContext<Self>) -> libcnb::Result<BuildResult, Self::Error> {
        log_header("PHP Web");

        let config = PhpWebConfig::resolve(
            &context.buildpack_descriptor.metadata,
            context.platform.env(),
        )
        .map_err(PhpWebBuildpackError::Config)?;

        let kind = detect_app_kind(&context.app_dir, &config)
            .map_err(PhpWebBuildpackError::DetectAppKind)?
            .ok_or(PhpWebBuildpackError::NoPhpSources)?;

        let layer_ref = context.uncached_layer(
            kind.layer_name(),
            UncachedLayerDefinition {
                build: false,
                launch: true,
            },
        )?;

        let extension_dir = Env::from_current()
            .get(PHP_EXTENSION_DIR_ENV_VAR)
            .map(PathBuf::from);

        let contribution = Contributor::new(
            AppDescriptor::new(&context.app_dir, kind, &config),
            layer_ref.path(),
            BuildLog::stdout(),
        )
        .extension_dir(extension_dir)
        .contribute()
        .map_err(PhpWebBuildpackError::Contribute)?;

        layer_ref.write_env(contribution.layer_env)?;

        BuildResultBuilder::new()
            .launch(contribution.launch)
            .build()
    }

    fn on_error(&self, error: libcnb::Error<Self::Error>) {
        libherokubuildpack::error::on_error(on_php_web_buildpack_error, error);
    }
}

/// The build plan for the detected application.
///
/// Runtime dependencies are required with `launch = true` so the providing buildpacks make
/// them available when the application starts. Scripts don't need a webserver.
fn php_web_build_plan(kind: &AppKind) -> BuildPlan {
    let mut build_plan = BuildPlanBuilder::new()
        .provides("php-web")
        .requires("php-web")
        .build();

    build_plan.requires.push(launch_require("php"));

    if let AppKind::WebApp { server, .. } = kind {
        if let Some(requirement) = server.build_plan_requirement() {
            build_plan.requires.push(launch_require(requirement));
        }
    }

    build_plan
}

fn launch_require(name: &str) -> Require {
    let mut require = Require::new(name);
    require
        .metadata
        .insert(String::from("launch"), toml::Value::Boolean(true));
    require
}

buildpack_main!(PhpWebBuildpack);

#[cfg(test)]
mod tests {
    use super::php_web_build_plan;
    use crate::app::{
        detect_app_kind, AppKind, PhpWebBuildpackMetadata, PhpWebConfig, Webserver,
        DEFAULT_SCRIPT, DEFAULT_WEB_DIR,
    };
    use libcnb::data::build_plan::BuildPlan;
    use libcnb::generic::GenericPlatform;
    use libcnb::{Env, Platform};
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn config_is_read_from_platform_env() {
        let mut env = Env::new();
        env.insert("BP_PHP_SERVER", "php-server");
        let platform = GenericPlatform::new(env);

        let config =
            PhpWebConfig::resolve(&PhpWebBuildpackMetadata::default(), platform.env()).unwrap();

        assert_eq!(config.webserver, Webserver::PhpBuiltIn);
        assert_eq!(config.webserver.build_plan_requirement(), None);
    }

    #[test]
    fn descriptor_metadata_selects_webserver() {
        let app_dir = tempdir().unwrap();
        fs::create_dir_all(app_dir.path().join("htdocs")).unwrap();
        fs::write(app_dir.path().join("htdocs").join("index.php"), "<?php").unwrap();

        let metadata = PhpWebBuildpackMetadata {
            webserver: Some(String::from("nginx")),
            ..PhpWebBuildpackMetadata::default()
        };
        let config = PhpWebConfig::resolve(&metadata, &Env::new()).unwrap();

        assert!(detect_app_kind(app_dir.path(), &config).unwrap().is_some());
        assert_eq!(config.webserver.build_plan_requirement(), Some("nginx"));
    }

    fn required(build_plan: &BuildPlan) -> Vec<(String, Option<bool>)> {
        build_plan
            .requires
            .iter()
            .map(|require| {
                (
                    require.name.clone(),
                    require.metadata.get("launch").and_then(toml::Value::as_bool),
                )
            })
            .collect()
    }

    fn web_app(server: Webserver) -> AppKind {
        AppKind::WebApp {
            server,
            web_dir: String::from(DEFAULT_WEB_DIR),
        }
    }

    #[test]
    fn build_plan_for_script_has_no_webserver() {
        let app_dir = tempdir().unwrap();
        fs::write(app_dir.path().join("app.php"), "<?php").unwrap();

        let config =
            PhpWebConfig::resolve(&PhpWebBuildpackMetadata::default(), &Env::new()).unwrap();
        let kind = detect_app_kind(app_dir.path(), &config).unwrap().unwrap();

        assert_eq!(
            kind,
            AppKind::Script {
                path: String::from(DEFAULT_SCRIPT)
            }
        );
        assert_eq!(
            required(&php_web_build_plan(&kind)),
            vec![
                (String::from("php-web"), None),
                (String::from("php"), Some(true)),
            ]
        );
    }

    #[test]
    fn build_plan_for_php_built_in_server() {
        assert_eq!(
            required(&php_web_build_plan(&web_app(Webserver::PhpBuiltIn))),
            vec![
                (String::from("php-web"), None),
                (String::from("php"), Some(true)),
            ]
        );
    }

    #[test]
    fn build_plan_for_apache_httpd() {
        assert_eq!(
            required(&php_web_build_plan(&web_app(Webserver::ApacheHttpd))),
            vec![
                (String::from("php-web"), None),
                (String::from("php"), Some(true)),
                (String::from("httpd"), Some(true)),
            ]
        );
    }

    #[test]
    fn build_plan_for_nginx() {
        assert_eq!(
            required(&php_web_build_plan(&web_app(Webserver::Nginx))),
            vec![
                (String::from("php-web"), None),
                (String::from("php"), Some(true)),
                (String::from("nginx"), Some(true)),
            ]
        );
    }
}
