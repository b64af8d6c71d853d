use crate::{InjectionRequest, ReplicaInjector};
use async_trait::async_trait;
use common::Result;
use tokio::process::Command;
use tracing::debug;

/// Runs the external injector program, one process per request.
pub struct CommandInjector {
    program: String,
}

impl CommandInjector {
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
        }
    }

    pub fn command_line(&self, request: &InjectionRequest) -> String {
        format!("{} {}", self.program, request.args().join(" "))
    }
}

#[async_trait]
impl ReplicaInjector for CommandInjector {
    async fn inject_replicas(&self, request: &InjectionRequest) -> Result<i32> {
        println!("{}", self.command_line(request));
        let status = Command::new(&self.program)
            .args(request.args())
            .status()
            .await?;
        debug!(program = %self.program, ?status, "Injector finished");
        // killed by a signal
        Ok(status.code().unwrap_or(-1))
    }
}
