//! Command-output probe.
//!
//! [`CommandProbe`] asks a service for its own status by running a side
//! command (e.g. the client's `status` subcommand) and scanning stdout
//! for a success token. The token is configured per service — one mesh
//! client may report `authenticated`, another `Logged in` — nothing is
//! hard-coded here.

use async_trait::async_trait;
use tokio::process::Command;

use super::probe::Probe;

/// Probe that runs a status command and matches a token in its stdout.
///
/// The check succeeds only when the command itself exits successfully
/// **and** its stdout contains [`CommandProbe::token`].
#[derive(Clone, Debug)]
pub struct CommandProbe {
    program: String,
    args: Vec<String>,
    token: String,
}

impl CommandProbe {
    /// Creates a probe running `program` with `args`, expecting `token`
    /// in stdout.
    pub fn new(
        program: impl Into<String>,
        args: Vec<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            program: program.into(),
            args,
            token: token.into(),
        }
    }

    /// The status command's program.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// The status command's arguments.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// The success token this probe scans for.
    pub fn token(&self) -> &str {
        &self.token
    }
}

#[async_trait]
impl Probe for CommandProbe {
    async fn check(&self) -> bool {
        let output = Command::new(&self.program)
            .args(&self.args)
            .kill_on_drop(true)
            .output()
            .await;

        match output {
            Ok(out) if out.status.success() => {
                String::from_utf8_lossy(&out.stdout).contains(&self.token)
            }
            _ => false,
        }
    }
}
