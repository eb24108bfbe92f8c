//! Build preparation for the PHP buildpack integration tests.
//!
//! Packages the sibling buildpacks (`php-dist`, `httpd`, `nginx`) and the buildpack in this
//! workspace, builds test applications with [`libcnb_test`] and checks that they start.
//!
//! ```no_run
//! use test_support::{
//!     clean_up_buildpacks, prepare_php_app, prepare_php_buildpacks, push_simple_app,
//!     StartupCheck, Webserver,
//! };
//!
//! let buildpacks = prepare_php_buildpacks().unwrap();
//! let app = prepare_php_app(
//!     "php_server_app",
//!     buildpacks.online(Webserver::PhpBuiltIn),
//!     [("BP_PHP_SERVER", "php-server")],
//! );
//!
//! push_simple_app(&app, StartupCheck::Web, |container| {
//!     println!("{} is up", container.container_name);
//! });
//!
//! clean_up_buildpacks(&buildpacks).unwrap();
//! ```

mod app;
mod buildpacks;
mod pack;
mod util;

pub use crate::app::*;
pub use crate::buildpacks::*;

use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;

#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("Couldn't spawn `{0}`: {1}")]
    Spawn(String, #[source] io::Error),
    #[error("`{program}` exited with {status}\n\n## stdout:\n\n{stdout}\n## stderr:\n\n{stderr}")]
    UnexpectedExitStatus {
        program: String,
        status: ExitStatus,
        stdout: String,
        stderr: String,
    },
    #[error("Couldn't create temporary directory: {0}")]
    CreateTempDir(#[source] io::Error),
    #[error("I/O error at {0}: {1}")]
    Io(PathBuf, #[source] io::Error),
    #[error("Couldn't serialize package.toml: {0}")]
    SerializePackageConfig(#[source] toml::ser::Error),
    #[error("CARGO_MANIFEST_DIR is not set, the harness must be used from a cargo test")]
    MissingCargoManifestDir,
    #[error("Invalid buildpack URI for package.toml: {0}")]
    InvalidPackageUri(String),
    #[error("Couldn't find cross-compile toolchain for the buildpack:\n\n{0}")]
    CrossCompileToolchainNotFound(String),
    #[error("Couldn't package the buildpack: {0}")]
    PackageWorkspaceBuildpack(#[source] libcnb_package::package::PackageBuildpackError),
    #[error("Request to {0} failed: {1}")]
    Http(String, #[source] Box<ureq::Error>),
    #[error("Couldn't read response from {0}: {1}")]
    ReadResponse(String, #[source] io::Error),
}
