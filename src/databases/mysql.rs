use super::{DatabaseSettings, Endpoint, EngineTool};
use crate::utils::CommandSpec;
use std::path::Path;

pub const DEFAULT_PORT: u16 = 3306;

/// MySQL through `mysql` and `mysqldump`
///
/// The password is passed in `MYSQL_PWD` so it never shows up in the
/// process list.
#[derive(Debug, Clone)]
pub struct MySqlTool {
    endpoint: Endpoint,
    settings: DatabaseSettings,
}

impl MySqlTool {
    pub fn new(settings: DatabaseSettings) -> Result<Self, String> {
        let endpoint = Endpoint::parse(&settings.host, DEFAULT_PORT)?;
        Ok(Self { endpoint, settings })
    }

    fn client(&self, program: &str) -> CommandSpec {
        CommandSpec::new(program)
            .arg(format!("--host={}", self.endpoint.host))
            .arg(format!("--port={}", self.endpoint.port))
            .arg(format!("--user={}", self.settings.username))
            .env("MYSQL_PWD", self.settings.password.clone())
            .timeout(self.settings.timeout)
    }
}

impl EngineTool for MySqlTool {
    fn name(&self) -> &'static str {
        "MySql"
    }

    fn target(&self) -> String {
        format!(
            "{}:{}/{}",
            self.endpoint.host, self.endpoint.port, self.settings.database_name
        )
    }

    fn required_programs(&self) -> &'static [&'static str] {
        &["mysql", "mysqldump"]
    }

    fn probe_command(&self) -> CommandSpec {
        self.client("mysql")
            .arg("--batch")
            .arg("--skip-column-names")
            .arg("--execute=SELECT 1")
            .arg(self.settings.database_name.clone())
    }

    fn dump_command(&self, destination: &Path) -> CommandSpec {
        self.client("mysqldump")
            .arg("--single-transaction")
            .arg("--routines")
            .arg("--triggers")
            .arg("--add-drop-table")
            .arg(format!("--result-file={}", destination.display()))
            .arg(self.settings.database_name.clone())
    }

    fn restore_command(&self, source: &Path) -> CommandSpec {
        self.client("mysql")
            .arg(self.settings.database_name.clone())
            .arg(format!("--execute=source {}", source.display()))
    }
}
