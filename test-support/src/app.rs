use crate::HarnessError;
use libcnb_test::{BuildConfig, BuildpackReference, ContainerConfig, ContainerContext, TestRunner};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

/// Builder image used unless `CNB_BUILDER` is set.
pub const DEFAULT_BUILDER: &str = "paketobuildpacks/builder-jammy-full";

/// Port the application is started on, passed to it as `PORT`.
pub const PORT: u16 = 8080;

const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(3);
const HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(1);
const HEALTH_CHECK_DEADLINE: Duration = Duration::from_secs(30);

/// A test application ready to be built.
pub struct PhpApp {
    pub name: String,
    pub builder: String,
    pub buildpacks: Vec<BuildpackReference>,
    /// Environment of the started container. Always contains `PORT`.
    pub env: BTreeMap<String, String>,
    pub config: BuildConfig,
}

/// How to tell that a started application is healthy.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum StartupCheck {
    /// The application answers HTTP requests on [`PORT`].
    Web,
    /// The application is a script and counts as healthy once started.
    Script,
}

/// Prepares the build of the fixture `tests/fixtures/<app_name>` of the buildpack crate.
///
/// `env` is passed to both the build and the started container.
#[must_use]
pub fn prepare_php_app(
    app_name: &str,
    buildpacks: Vec<BuildpackReference>,
    env: impl IntoIterator<Item = (impl Into<String>, impl Into<String>)>,
) -> PhpApp {
    let builder = std::env::var("CNB_BUILDER").unwrap_or_else(|_| String::from(DEFAULT_BUILDER));
    let env = env
        .into_iter()
        .map(|(key, value)| (key.into(), value.into()))
        .collect::<BTreeMap<String, String>>();

    let mut config = BuildConfig::new(
        builder.clone(),
        PathBuf::from("tests/fixtures").join(app_name),
    );
    config.buildpacks(buildpacks.clone()).envs(env.clone());

    let mut container_env = env;
    container_env.insert(String::from("PORT"), PORT.to_string());

    PhpApp {
        name: String::from(app_name),
        builder,
        buildpacks,
        env: container_env,
        config,
    }
}

/// Builds and starts the application, then hands the running container to `f`.
///
/// Panics with diagnostics if the application doesn't become healthy.
pub fn push_simple_app(app: &PhpApp, check: StartupCheck, f: impl FnOnce(&ContainerContext)) {
    TestRunner::default().build(&app.config, |context| {
        context.start_container(
            ContainerConfig::new()
                .envs(app.env.clone())
                .expose_port(PORT),
            |container| {
                if let Err(error) = wait_until_healthy(&container, check) {
                    print_diagnostics(app, &context.pack_stdout, &container, &error);
                    panic!("App `{}` failed to start: {error}", app.name);
                }

                f(&container);
            },
        );
    });
}

/// Sends a `GET` request for `path` to the application and returns the response body.
pub fn http_get(container: &ContainerContext, path: &str) -> Result<String, HarnessError> {
    let url = format!("http://{}{path}", container.address_for_port(PORT));

    ureq::AgentBuilder::new()
        .timeout(HEALTH_CHECK_TIMEOUT)
        .build()
        .get(&url)
        .call()
        .map_err(|error| HarnessError::Http(url.clone(), Box::new(error)))?
        .into_string()
        .map_err(|io_error| HarnessError::ReadResponse(url, io_error))
}

fn wait_until_healthy(container: &ContainerContext, check: StartupCheck) -> Result<(), HarnessError> {
    match check {
        StartupCheck::Script => Ok(()),
        StartupCheck::Web => {
            let started = Instant::now();

            loop {
                match http_get(container, "/") {
                    Ok(_) => return Ok(()),
                    Err(error) if started.elapsed() >= HEALTH_CHECK_DEADLINE => return Err(error),
                    Err(_) => thread::sleep(HEALTH_CHECK_INTERVAL),
                }
            }
        }
    }
}

fn print_diagnostics(
    app: &PhpApp,
    pack_stdout: &str,
    container: &ContainerContext,
    error: &HarnessError,
) {
    let logs = container.logs_now();

    eprintln!("App failed to start: {error}");
    eprintln!("Container name: {}", container.container_name);
    eprintln!("App: {}", app.name);
    eprintln!("Builder: {}", app.builder);
    eprintln!("Buildpacks: {:?}", app.buildpacks);
    eprintln!("Pack output:\n{pack_stdout}");
    eprintln!("Container logs:\n{}\n{}", logs.stdout, logs.stderr);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prepare_php_app_sets_port() {
        let app = prepare_php_app(
            "php_server_app",
            vec![BuildpackReference::Other(String::from("paketo/php-dist"))],
            [("BP_PHP_SERVER", "php-server")],
        );

        assert_eq!(app.name, "php_server_app");
        assert_eq!(app.env.get("PORT").map(String::as_str), Some("8080"));
        assert_eq!(
            app.env.get("BP_PHP_SERVER").map(String::as_str),
            Some("php-server")
        );
        assert_eq!(app.buildpacks.len(), 1);
    }

    #[test]
    fn prepare_php_app_without_env() {
        let app = prepare_php_app("script_app", Vec::new(), Vec::<(String, String)>::new());

        assert_eq!(app.env.len(), 1);
        assert!(!app.builder.is_empty());
    }
}
