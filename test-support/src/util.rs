use crate::HarnessError;
use std::process::Command;

/// Runs the command to completion, capturing its output.
pub(crate) fn run_command(mut command: Command) -> Result<String, HarnessError> {
    let program = command.get_program().to_string_lossy().to_string();

    let output = command
        .output()
        .map_err(|io_error| HarnessError::Spawn(program.clone(), io_error))?;

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();

    if output.status.success() {
        Ok(stdout)
    } else {
        Err(HarnessError::UnexpectedExitStatus {
            program,
            status: output.status,
            stdout,
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}
