use crate::app::ConfigError;
use crate::contributor::ContributeError;
use indoc::formatdoc;
use libherokubuildpack::log::log_error;
use std::io;

#[derive(Debug)]
pub(crate) enum PhpWebBuildpackError {
    Config(ConfigError),
    DetectAppKind(io::Error),
    NoPhpSources,
    Contribute(ContributeError),
}

impl From<PhpWebBuildpackError> for libcnb::Error<PhpWebBuildpackError> {
    fn from(error: PhpWebBuildpackError) -> Self {
        Self::BuildpackError(error)
    }
}

pub(crate) fn on_php_web_buildpack_error(error: PhpWebBuildpackError) {
    match error {
        PhpWebBuildpackError::Config(error) => log_error(
            "Invalid buildpack configuration",
            formatdoc! {"
                {error}

                Check the `BP_PHP_*` environment variables set for this build.
            "},
        ),
        PhpWebBuildpackError::DetectAppKind(error) => log_error(
            "Couldn't inspect application sources",
            format!("Cause: {error}"),
        ),
        PhpWebBuildpackError::NoPhpSources => log_error(
            "No PHP sources found",
            formatdoc! {"
                The application contains neither a web directory with PHP files nor a PHP
                script to run. Set `BP_PHP_WEB_DIR` or `BP_PHP_SCRIPT` to point the buildpack
                at your application.
            "},
        ),
        PhpWebBuildpackError::Contribute(error) => log_error(
            "Couldn't configure how the application starts",
            format!("Cause: {error}"),
        ),
    }
}
