use std::path::PathBuf;
use std::process::Command;

/// Represents a `pack buildpack package` command writing a `.cnb` file.
#[derive(Clone, Debug)]
pub(crate) struct PackBuildpackPackageCommand {
    output: PathBuf,
    config: PathBuf,
}

impl PackBuildpackPackageCommand {
    pub(crate) fn new(output: impl Into<PathBuf>, config: impl Into<PathBuf>) -> Self {
        Self {
            output: output.into(),
            config: config.into(),
        }
    }
}

impl From<PackBuildpackPackageCommand> for Command {
    fn from(package_command: PackBuildpackPackageCommand) -> Self {
        let mut command = Command::new("pack");

        command.args([
            String::from("buildpack"),
            String::from("package"),
            package_command.output.to_string_lossy().to_string(),
            String::from("--config"),
            package_command.config.to_string_lossy().to_string(),
            String::from("--format"),
            String::from("file"),
            String::from("--pull-policy"),
            String::from("if-not-present"),
        ]);

        command
    }
}
