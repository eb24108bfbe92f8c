use crate::app::{AppDescriptor, AppKind, Webserver};
use crate::config;
use crate::log::BuildLog;
use libcnb::data::launch::{Launch, LaunchBuilder, Process, ProcessBuilder};
use libcnb::data::process_type;
use libcnb::layer_env::{LayerEnv, ModificationBehavior, Scope};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use termcolor::WriteColor;

const PHP_SERVER_ADDRESS: &str = "0.0.0.0:8080";

/// Decides how a PHP application is started and writes the configuration it needs.
///
/// The contributor owns the layer at `layer_dir` for the duration of the build. It writes
/// `etc/php.ini` (and `etc/php-fpm.conf` for PHP-FPM based webservers) into it, writes webserver
/// configuration into the application root and returns the launch processes and layer
/// environment to register with the platform.
pub(crate) struct Contributor<W> {
    app: AppDescriptor,
    layer_dir: PathBuf,
    extension_dir: Option<PathBuf>,
    log: BuildLog<W>,
}

/// Launch processes and layer environment produced by [`Contributor::contribute`].
#[derive(Debug)]
pub(crate) struct Contribution {
    pub(crate) launch: Launch,
    pub(crate) layer_env: LayerEnv,
}

impl<W: WriteColor> Contributor<W> {
    pub(crate) fn new(app: AppDescriptor, layer_dir: impl Into<PathBuf>, log: BuildLog<W>) -> Self {
        Self {
            app,
            layer_dir: layer_dir.into(),
            extension_dir: None,
            log,
        }
    }

    /// Sets the PHP extension directory written to `php.ini`.
    #[must_use]
    pub(crate) fn extension_dir(mut self, extension_dir: Option<PathBuf>) -> Self {
        self.extension_dir = extension_dir;
        self
    }

    pub(crate) fn contribute(&mut self) -> Result<Contribution, ContributeError> {
        self.write_php_ini()?;

        let processes = match self.app.kind.clone() {
            AppKind::WebApp {
                server: Webserver::PhpBuiltIn,
                web_dir,
            } => web_and_task_processes(&format!(
                "php -S {PHP_SERVER_ADDRESS} -t {}",
                self.app.root.join(web_dir).display()
            )),
            AppKind::WebApp {
                server: Webserver::ApacheHttpd,
                web_dir,
            } => {
                self.write_app_config_file(
                    "httpd.conf",
                    &config::httpd_conf(
                        &self.app.root.join(web_dir),
                        &self.app.server_admin,
                        self.app.enable_https_redirect,
                    ),
                )?;
                self.write_php_fpm_conf(&self.layer_dir)?;
                vec![web_process(&self.php_fpm_command())]
            }
            AppKind::WebApp {
                server: Webserver::Nginx,
                web_dir,
            } => {
                self.write_app_config_file(
                    "nginx.conf",
                    &config::nginx_conf(
                        &self.app.root.join(web_dir),
                        self.app.enable_https_redirect,
                    ),
                )?;
                self.write_php_fpm_conf(&self.layer_dir)?;
                vec![web_process(&self.php_fpm_command())]
            }
            AppKind::Script { path } => {
                let script = self.app.root.join(&path);

                if !script.exists() {
                    self.log
                        .warning(format!("WARNING: `{path}` start script not found. App will not start unless you specify a custom start command."))
                        .map_err(ContributeError::WriteBuildLog)?;
                }

                web_and_task_processes(&format!("php {}", script.display()))
            }
        };

        Ok(Contribution {
            launch: LaunchBuilder::new().processes(processes).build(),
            layer_env: self.layer_env(),
        })
    }

    /// Writes `etc/php-fpm.conf` into the given layer.
    ///
    /// Includes the user's PHP-FPM configuration fragments from `.php.fpm.d` in the application
    /// root if that directory exists.
    pub(crate) fn write_php_fpm_conf(&self, layer_dir: &Path) -> Result<(), ContributeError> {
        let user_conf_dir = self.app.root.join(".php.fpm.d");
        let user_include = user_conf_dir.is_dir().then(|| user_conf_dir.join("*.conf"));

        write_file(
            &layer_dir.join("etc").join("php-fpm.conf"),
            &config::php_fpm_conf(layer_dir, user_include.as_deref()),
        )
    }

    fn write_php_ini(&mut self) -> Result<(), ContributeError> {
        self.log
            .info(format!("Configuring {}", self.app.kind))
            .map_err(ContributeError::WriteBuildLog)?;

        write_file(
            &self.etc_dir().join("php.ini"),
            &config::php_ini(
                &self.app.root,
                &self.app.lib_dir,
                self.extension_dir.as_deref(),
            ),
        )
    }

    fn write_app_config_file(&self, name: &str, contents: &str) -> Result<(), ContributeError> {
        write_file(&self.app.root.join(name), contents)
    }

    fn php_fpm_command(&self) -> String {
        format!(
            r#"php-fpm -p "{}" -y "{}" -c "{}""#,
            self.layer_dir.display(),
            self.etc_dir().join("php-fpm.conf").display(),
            self.etc_dir().display()
        )
    }

    fn layer_env(&self) -> LayerEnv {
        LayerEnv::new()
            .chainable_insert(
                Scope::All,
                ModificationBehavior::Override,
                "PHPRC",
                self.etc_dir(),
            )
            .chainable_insert(
                Scope::All,
                ModificationBehavior::Override,
                "PHP_INI_SCAN_DIR",
                self.app.root.join(".php.ini.d"),
            )
    }

    fn etc_dir(&self) -> PathBuf {
        self.layer_dir.join("etc")
    }
}

fn web_process(command: &str) -> Process {
    ProcessBuilder::new(process_type!("web"), ["bash", "-c", command])
        .default(true)
        .build()
}

fn web_and_task_processes(command: &str) -> Vec<Process> {
    vec![
        web_process(command),
        ProcessBuilder::new(process_type!("task"), ["bash", "-c", command]).build(),
    ]
}

fn write_file(path: &Path, contents: &str) -> Result<(), ContributeError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|io_error| ContributeError::CreateDirectory(parent.to_path_buf(), io_error))?;
    }

    fs::write(path, contents)
        .map_err(|io_error| ContributeError::WriteFile(path.to_path_buf(), io_error))
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum ContributeError {
    #[error("Couldn't create directory {0}: {1}")]
    CreateDirectory(PathBuf, #[source] io::Error),
    #[error("Couldn't write {0}: {1}")]
    WriteFile(PathBuf, #[source] io::Error),
    #[error("Couldn't write build output: {0}")]
    WriteBuildLog(#[source] io::Error),
}
