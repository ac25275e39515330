use assert_cmd::Command;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

pub const CONFIG: &str = r#"
regions:
  default:
    region_name: us-east-1
    access_key_id: AKIATESTKEY
    secret_access_key: testsecret
    capacity:
      m1.small: 2
instance_types:
  m1.small: { cpu: 1, memory: 1.7 }
"#;

/// Scratch directory holding a driver config and descriptors
pub struct TestProject {
    pub root: TempDir,
}

impl TestProject {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        Self { root }
    }

    pub fn with_config(content: &str) -> Self {
        let project = Self::new();
        fs::write(project.config_path(), content).unwrap();
        project
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.path().join("ec2_driver.conf")
    }

    pub fn defaults_path(&self) -> PathBuf {
        self.root.path().join("ec2_driver.default")
    }

    pub fn write_defaults(&self, content: &str) {
        fs::write(self.defaults_path(), content).unwrap();
    }

    pub fn write_descriptor(&self, name: &str, content: &str) -> PathBuf {
        let path = self.root.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    /// `vmflow` with no config flags, isolated from the caller's environment.
    /// The user config directory points into the project.
    pub fn bare_command(&self) -> Command {
        let mut cmd = Command::cargo_bin("vmflow").unwrap();
        cmd.env_remove("VMFLOW_CONFIG_PATH")
            .env_remove("VMFLOW_DEFAULTS_PATH")
            .env_remove("RUST_LOG")
            .env("HOME", self.root.path())
            .env("XDG_CONFIG_HOME", self.root.path().join("xdg"));
        cmd
    }

    /// `vmflow` pointed at this project's files
    pub fn command(&self) -> Command {
        let mut cmd = self.bare_command();
        cmd.arg("--config")
            .arg(self.config_path())
            .arg("--defaults")
            .arg(self.defaults_path());
        cmd
    }

    /// Like `command`, with EC2 requests sent to a closed local port
    pub fn offline_command(&self) -> Command {
        let mut cmd = self.command();
        cmd.env("AWS_ENDPOINT_URL", "http://127.0.0.1:9")
            .env("AWS_MAX_ATTEMPTS", "1")
            .env("AWS_EC2_METADATA_DISABLED", "true");
        cmd
    }
}
