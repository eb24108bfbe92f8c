use crate::pack::PackBuildpackPackageCommand;
use crate::util::run_command;
use crate::HarnessError;
use libcnb_data::buildpack::BuildpackId;
use libcnb_data::buildpack_id;
use libcnb_data::package_descriptor::{PackageDescriptor, PackageDescriptorBuildpackReference};
use libcnb_package::cross_compile::{cross_compile_assistance, CrossCompileAssistance};
use libcnb_package::output::create_packaged_buildpack_dir_resolver;
use libcnb_package::CargoProfile;
use libcnb_test::BuildpackReference;
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const PHP_DIST_BUILDPACK_ENV_VAR: &str = "PHP_DIST_BUILDPACK";
const HTTPD_BUILDPACK_ENV_VAR: &str = "HTTPD_BUILDPACK";
const NGINX_BUILDPACK_ENV_VAR: &str = "NGINX_BUILDPACK";

const DEFAULT_PHP_DIST_BUILDPACK: &str = "docker://docker.io/paketobuildpacks/php-dist";
const DEFAULT_HTTPD_BUILDPACK: &str = "docker://docker.io/paketobuildpacks/httpd";
const DEFAULT_NGINX_BUILDPACK: &str = "docker://docker.io/paketobuildpacks/nginx";

// Same target as the libcnb-test builds of the buildpack.
const TARGET_TRIPLE: &str = "x86_64-unknown-linux-musl";

/// The webserver an application is built for, selecting which sibling buildpacks it needs.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Webserver {
    PhpBuiltIn,
    Httpd,
    Nginx,
}

/// Locations of the PHP buildpacks, both as published and as packaged `.cnb` files.
///
/// Created by [`prepare_php_buildpacks`]. Packaged files live in a temporary directory that is
/// removed by [`clean_up_buildpacks`]. Prepare them once per test suite and share them, they are
/// only read afterwards.
#[derive(Debug)]
pub struct PhpBuildpacks {
    pub php_dist: BuildpackLocations,
    pub httpd: BuildpackLocations,
    pub nginx: BuildpackLocations,
    /// The packaged `.cnb` file of the buildpack in this workspace.
    pub php_web_offline: PathBuf,
    package_dir: TempDir,
}

/// Where a sibling buildpack can be found.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BuildpackLocations {
    /// URI `pack` resolves itself, e.g. `docker://docker.io/paketobuildpacks/php-dist`.
    pub online: String,
    /// Path of the `.cnb` file packaged from the online URI.
    pub offline: PathBuf,
}

impl PhpBuildpacks {
    /// The buildpacks to build an application with, referencing the published sibling buildpacks.
    #[must_use]
    pub fn online(&self, webserver: Webserver) -> Vec<BuildpackReference> {
        self.references(webserver, |locations| locations.online.clone())
            .into_iter()
            .chain([BuildpackReference::WorkspaceBuildpack(php_web_buildpack_id())])
            .collect()
    }

    /// The buildpacks to build an application with, referencing only packaged `.cnb` files.
    #[must_use]
    pub fn offline(&self, webserver: Webserver) -> Vec<BuildpackReference> {
        self.references(webserver, |locations| {
            locations.offline.to_string_lossy().to_string()
        })
        .into_iter()
        .chain([BuildpackReference::Other(
            self.php_web_offline.to_string_lossy().to_string(),
        )])
        .collect()
    }

    fn references(
        &self,
        webserver: Webserver,
        location: impl Fn(&BuildpackLocations) -> String,
    ) -> Vec<BuildpackReference> {
        let mut siblings = vec![&self.php_dist];

        match webserver {
            Webserver::PhpBuiltIn => {}
            Webserver::Httpd => siblings.push(&self.httpd),
            Webserver::Nginx => siblings.push(&self.nginx),
        }

        siblings
            .into_iter()
            .map(|locations| BuildpackReference::Other(location(locations)))
            .collect()
    }

    /// Directory holding the packaged `.cnb` files.
    #[must_use]
    pub fn package_dir(&self) -> &Path {
        self.package_dir.path()
    }
}

/// Resolves and packages every buildpack the PHP integration tests need.
///
/// Sibling buildpack URIs can be overridden with `PHP_DIST_BUILDPACK`, `HTTPD_BUILDPACK` and
/// `NGINX_BUILDPACK`. The buildpack in this workspace is compiled and assembled with
/// `libcnb-package`.
/// Must be called from a test of the buildpack crate, so that `CARGO_MANIFEST_DIR` points at it.
pub fn prepare_php_buildpacks() -> Result<PhpBuildpacks, HarnessError> {
    let package_dir = tempfile::Builder::new()
        .prefix("php-buildpacks")
        .tempdir()
        .map_err(HarnessError::CreateTempDir)?;

    let php_dist = package_sibling(
        package_dir.path(),
        "php-dist",
        buildpack_uri(PHP_DIST_BUILDPACK_ENV_VAR, DEFAULT_PHP_DIST_BUILDPACK),
    )?;
    let httpd = package_sibling(
        package_dir.path(),
        "httpd",
        buildpack_uri(HTTPD_BUILDPACK_ENV_VAR, DEFAULT_HTTPD_BUILDPACK),
    )?;
    let nginx = package_sibling(
        package_dir.path(),
        "nginx",
        buildpack_uri(NGINX_BUILDPACK_ENV_VAR, DEFAULT_NGINX_BUILDPACK),
    )?;
    let php_web_offline = package_workspace_buildpack(package_dir.path())?;

    Ok(PhpBuildpacks {
        php_dist,
        httpd,
        nginx,
        php_web_offline,
        package_dir,
    })
}

/// Deletes all packaged buildpacks.
pub fn clean_up_buildpacks(buildpacks: &PhpBuildpacks) -> Result<(), HarnessError> {
    let path = buildpacks.package_dir();

    fs::remove_dir_all(path).map_err(|io_error| HarnessError::Io(path.to_path_buf(), io_error))
}

fn php_web_buildpack_id() -> BuildpackId {
    buildpack_id!("org.cloudfoundry.php-web")
}

fn buildpack_uri(env_var: &str, default: &str) -> String {
    env::var(env_var)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| String::from(default))
}

fn package_sibling(
    package_dir: &Path,
    name: &str,
    uri: String,
) -> Result<BuildpackLocations, HarnessError> {
    let offline = package_buildpack(package_dir, name, &uri)?;

    Ok(BuildpackLocations {
        online: uri,
        offline,
    })
}

fn package_workspace_buildpack(package_dir: &Path) -> Result<PathBuf, HarnessError> {
    let cargo_manifest_dir = env::var("CARGO_MANIFEST_DIR")
        .map(PathBuf::from)
        .map_err(|_| HarnessError::MissingCargoManifestDir)?;

    let cargo_build_env = match cross_compile_assistance(TARGET_TRIPLE) {
        CrossCompileAssistance::HelpText(help_text) => {
            return Err(HarnessError::CrossCompileToolchainNotFound(help_text));
        }
        CrossCompileAssistance::NoAssistance => Vec::new(),
        CrossCompileAssistance::Configuration { cargo_env } => cargo_env,
    };

    let buildpack_dir_resolver = create_packaged_buildpack_dir_resolver(
        &package_dir.join("php-web"),
        CargoProfile::Dev,
        TARGET_TRIPLE,
    );
    let buildpack_dir = buildpack_dir_resolver(&php_web_buildpack_id());

    fs::create_dir_all(&buildpack_dir)
        .map_err(|io_error| HarnessError::Io(buildpack_dir.clone(), io_error))?;

    // The buildpack has no buildpack dependencies of its own.
    libcnb_package::package::package_buildpack(
        &cargo_manifest_dir,
        CargoProfile::Dev,
        TARGET_TRIPLE,
        &cargo_build_env,
        &buildpack_dir,
        &BTreeMap::new(),
    )
    .map_err(HarnessError::PackageWorkspaceBuildpack)?;

    package_buildpack(package_dir, "php-web", &buildpack_dir.to_string_lossy())
}

fn package_descriptor(uri: &str) -> Result<PackageDescriptor, HarnessError> {
    Ok(PackageDescriptor {
        buildpack: PackageDescriptorBuildpackReference::try_from(uri)
            .map_err(|_| HarnessError::InvalidPackageUri(String::from(uri)))?,
        ..PackageDescriptor::default()
    })
}

fn package_buildpack(package_dir: &Path, name: &str, uri: &str) -> Result<PathBuf, HarnessError> {
    let config_path = package_dir.join(format!("{name}.toml"));
    let output_path = package_dir.join(format!("{name}.cnb"));

    let package_toml =
        toml::to_string(&package_descriptor(uri)?).map_err(HarnessError::SerializePackageConfig)?;

    fs::write(&config_path, package_toml)
        .map_err(|io_error| HarnessError::Io(config_path.clone(), io_error))?;

    run_command(PackBuildpackPackageCommand::new(&output_path, &config_path).into())?;

    Ok(output_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_buildpacks(package_dir: TempDir) -> PhpBuildpacks {
        let locations = |name: &str| BuildpackLocations {
            online: format!("docker://docker.io/paketobuildpacks/{name}"),
            offline: package_dir.path().join(format!("{name}.cnb")),
        };

        PhpBuildpacks {
            php_dist: locations("php-dist"),
            httpd: locations("httpd"),
            nginx: locations("nginx"),
            php_web_offline: package_dir.path().join("php-web.cnb"),
            package_dir,
        }
    }

    fn as_strings(references: &[BuildpackReference]) -> Vec<String> {
        references
            .iter()
            .map(|reference| match reference {
                BuildpackReference::Other(uri) => uri.clone(),
                other => format!("{other:?}"),
            })
            .collect()
    }

    #[test]
    fn package_descriptor_toml() {
        let package_toml =
            toml::to_string(&package_descriptor("/tmp/php-web/buildpack").unwrap()).unwrap();
        let parsed = toml::from_str::<PackageDescriptor>(&package_toml).unwrap();

        assert_eq!(parsed.buildpack.uri.to_string(), "/tmp/php-web/buildpack");
        assert!(parsed.dependencies.is_empty());
    }

    #[test]
    fn package_descriptor_for_docker_uri() {
        let descriptor =
            package_descriptor("docker://docker.io/paketobuildpacks/php-dist").unwrap();

        assert_eq!(
            descriptor.buildpack.uri.to_string(),
            "docker://docker.io/paketobuildpacks/php-dist"
        );
    }

    #[test]
    fn online_references_per_webserver() {
        let buildpacks = test_buildpacks(tempfile::tempdir().unwrap());

        let httpd = as_strings(&buildpacks.online(Webserver::Httpd));
        assert_eq!(httpd.len(), 3);
        assert_eq!(httpd[0], "docker://docker.io/paketobuildpacks/php-dist");
        assert_eq!(httpd[1], "docker://docker.io/paketobuildpacks/httpd");
        assert!(httpd[2].contains("org.cloudfoundry.php-web"));

        let nginx = as_strings(&buildpacks.online(Webserver::Nginx));
        assert_eq!(nginx[1], "docker://docker.io/paketobuildpacks/nginx");

        assert_eq!(buildpacks.online(Webserver::PhpBuiltIn).len(), 2);
    }

    #[test]
    fn offline_references_are_packaged_files() {
        let buildpacks = test_buildpacks(tempfile::tempdir().unwrap());
        let package_dir = buildpacks.package_dir().to_path_buf();

        assert_eq!(
            as_strings(&buildpacks.offline(Webserver::Nginx)),
            vec![
                package_dir.join("php-dist.cnb").to_string_lossy().to_string(),
                package_dir.join("nginx.cnb").to_string_lossy().to_string(),
                package_dir.join("php-web.cnb").to_string_lossy().to_string(),
            ]
        );
    }

    #[test]
    fn clean_up_removes_package_dir() {
        let buildpacks = test_buildpacks(tempfile::tempdir().unwrap());
        let package_dir = buildpacks.package_dir().to_path_buf();
        fs::write(package_dir.join("php-dist.cnb"), "").unwrap();

        clean_up_buildpacks(&buildpacks).unwrap();

        assert!(!package_dir.exists());
    }
}
