//! External process execution
//!
//! Runs an encoder or decoder to completion. stdout is discarded; stderr is
//! drained on its own thread so a chatty tool can never block on a full pipe,
//! and the captured text is kept for the log only.
//!
//! On unix every child gets its own process group, so a Ctrl-C at the
//! terminal reaches only this program and a running tool is left to finish.

use crate::logging::log_external_tool;
use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;
use std::time::Instant;

/// What one finished invocation reported.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProcessOutcome {
    pub exit_code: Option<i32>,
    pub stderr: String,
}

impl ProcessOutcome {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

pub trait ProcessRunner: Send + Sync {
    /// Blocks until `program` exits. `Err` only when it could not be started.
    fn run(&self, program: &Path, args: &[String]) -> std::io::Result<ProcessOutcome>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProcessRunner;

impl ProcessRunner for SystemProcessRunner {
    fn run(&self, program: &Path, args: &[String]) -> std::io::Result<ProcessOutcome> {
        let tool_name = program
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| program.display().to_string());

        let start = Instant::now();
        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }
        let mut child = command.spawn()?;

        let stderr_thread = child.stderr.take().map(|mut pipe| {
            thread::spawn(move || {
                let mut buf = Vec::new();
                let _ = pipe.read_to_end(&mut buf);
                String::from_utf8_lossy(&buf).into_owned()
            })
        });

        let status = child.wait()?;
        let stderr = stderr_thread
            .map(|t| t.join().unwrap_or_default())
            .unwrap_or_default();

        log_external_tool(&tool_name, args, &stderr, status.code(), start.elapsed());

        Ok(ProcessOutcome {
            exit_code: status.code(),
            stderr,
        })
    }
}
