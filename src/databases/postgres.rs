use super::{DatabaseSettings, Endpoint, EngineTool};
use crate::utils::CommandSpec;
use std::path::Path;

pub const DEFAULT_PORT: u16 = 5432;

/// PostgreSQL through `psql` and `pg_dump`
#[derive(Debug, Clone)]
pub struct PostgresTool {
    endpoint: Endpoint,
    settings: DatabaseSettings,
}

impl PostgresTool {
    pub fn new(settings: DatabaseSettings) -> Result<Self, String> {
        let endpoint = Endpoint::parse(&settings.host, DEFAULT_PORT)?;
        Ok(Self { endpoint, settings })
    }

    fn client(&self, program: &str) -> CommandSpec {
        CommandSpec::new(program)
            .arg(format!("--host={}", self.endpoint.host))
            .arg(format!("--port={}", self.endpoint.port))
            .arg(format!("--username={}", self.settings.username))
            .arg(format!("--dbname={}", self.settings.database_name))
            .arg("--no-password")
            .env("PGPASSWORD", self.settings.password.clone())
            .timeout(self.settings.timeout)
    }
}

impl EngineTool for PostgresTool {
    fn name(&self) -> &'static str {
        "PostgreSql"
    }

    fn target(&self) -> String {
        format!(
            "{}:{}/{}",
            self.endpoint.host, self.endpoint.port, self.settings.database_name
        )
    }

    fn required_programs(&self) -> &'static [&'static str] {
        &["psql", "pg_dump"]
    }

    fn probe_command(&self) -> CommandSpec {
        self.client("psql")
            .arg("--no-psqlrc")
            .arg("--tuples-only")
            .arg("--command=SELECT 1")
    }

    fn dump_command(&self, destination: &Path) -> CommandSpec {
        self.client("pg_dump")
            .arg("--clean")
            .arg("--if-exists")
            .arg("--no-owner")
            .arg(format!("--file={}", destination.display()))
    }

    fn restore_command(&self, source: &Path) -> CommandSpec {
        // One transaction with ON_ERROR_STOP: a failed restore rolls back
        self.client("psql")
            .arg("--no-psqlrc")
            .arg("--single-transaction")
            .arg("--set=ON_ERROR_STOP=1")
            .arg(format!("--file={}", source.display()))
    }
}
