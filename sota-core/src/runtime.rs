//! Container runtime capability
//!
//! The importers only ever need two things from the container runtime: copy a
//! host file into a running container, and run a command inside it.
//! [`DockerCli`] shells out to the runtime binary and blocks until it exits.

use crate::error::{DeployError, Result};
use std::ffi::OsString;
use std::path::Path;
use std::process::Command;

/// Exit status and captured stderr of one runtime invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub stderr: String,
}

impl CommandOutput {
    pub fn ok() -> Self {
        Self {
            success: true,
            stderr: String::new(),
        }
    }

    pub fn failed(stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            stderr: stderr.into(),
        }
    }
}

pub trait ContainerRuntime {
    /// Copy `local` to `dest` inside `container`.
    fn copy_into(&self, local: &Path, container: &str, dest: &str) -> Result<CommandOutput>;

    /// Run `args` inside `container`.
    fn exec(&self, container: &str, args: &[&str]) -> Result<CommandOutput>;
}

/// `docker cp` / `docker exec` (or any CLI-compatible runtime binary)
#[derive(Debug, Clone)]
pub struct DockerCli {
    binary: String,
}

impl DockerCli {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// `cp <local> <container>:<dest>`, with `local` passed through unconverted
    fn copy_args(local: &Path, container: &str, dest: &str) -> Vec<OsString> {
        vec![
            OsString::from("cp"),
            local.as_os_str().to_os_string(),
            OsString::from(format!("{}:{}", container, dest)),
        ]
    }

    fn run(&self, args: &[OsString]) -> Result<CommandOutput> {
        let shown: Vec<_> = args.iter().map(|a| a.to_string_lossy()).collect();
        tracing::debug!("Running {} {}", self.binary, shown.join(" "));
        let output = Command::new(&self.binary)
            .args(args)
            .output()
            .map_err(|source| DeployError::Spawn {
                program: self.binary.clone(),
                source,
            })?;

        Ok(CommandOutput {
            success: output.status.success(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

impl Default for DockerCli {
    fn default() -> Self {
        Self::new("docker")
    }
}

impl ContainerRuntime for DockerCli {
    fn copy_into(&self, local: &Path, container: &str, dest: &str) -> Result<CommandOutput> {
        self.run(&Self::copy_args(local, container, dest))
    }

    fn exec(&self, container: &str, args: &[&str]) -> Result<CommandOutput> {
        let mut full = vec![OsString::from("exec"), OsString::from(container)];
        full.extend(args.iter().map(OsString::from));
        self.run(&full)
    }
}

#[cfg(any(test, feature = "test-util"))]
pub mod fake {
    //! In-memory runtime that records calls and replays canned results.

    use super::{CommandOutput, ContainerRuntime};
    use crate::error::Result;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::path::{Path, PathBuf};

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum RuntimeCall {
        Copy {
            local: PathBuf,
            container: String,
            dest: String,
            /// File contents at the time of the copy
            contents: String,
        },
        Exec {
            container: String,
            args: Vec<String>,
        },
    }

    /// Every call succeeds unless a result was queued with [`FakeRuntime::push_result`].
    #[derive(Debug, Default)]
    pub struct FakeRuntime {
        calls: RefCell<Vec<RuntimeCall>>,
        results: RefCell<VecDeque<CommandOutput>>,
    }

    impl FakeRuntime {
        pub fn new() -> Self {
            Self::default()
        }

        /// Queue the result of the next call, copy or exec alike.
        pub fn push_result(&self, output: CommandOutput) {
            self.results.borrow_mut().push_back(output);
        }

        pub fn calls(&self) -> Vec<RuntimeCall> {
            self.calls.borrow().clone()
        }

        fn next_result(&self) -> CommandOutput {
            self.results
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(CommandOutput::ok)
        }
    }

    impl ContainerRuntime for FakeRuntime {
        fn copy_into(&self, local: &Path, container: &str, dest: &str) -> Result<CommandOutput> {
            let contents = std::fs::read_to_string(local).unwrap_or_default();
            self.calls.borrow_mut().push(RuntimeCall::Copy {
                local: local.to_path_buf(),
                container: container.to_string(),
                dest: dest.to_string(),
                contents,
            });
            Ok(self.next_result())
        }

        fn exec(&self, container: &str, args: &[&str]) -> Result<CommandOutput> {
            self.calls.borrow_mut().push(RuntimeCall::Exec {
                container: container.to_string(),
                args: args.iter().map(|a| a.to_string()).collect(),
            });
            Ok(self.next_result())
        }
    }
}
