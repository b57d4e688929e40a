use std::ffi::OsStr;
use std::process::{Command as StdCommand, Output, Stdio};

use crate::error::{Error, Result};

/// A thin wrapper over `std::process::Command` that every external-tool
/// invocation in the Executor and TrustChain goes through, so call sites read
/// as data (program, args, env) rather than scattered `Command::new` calls.
#[derive(Debug)]
pub struct Command {
    inner: StdCommand,
    program: String,
}

impl Command {
    pub fn new(program: impl Into<String>) -> Self {
        let program = program.into();
        Self { inner: StdCommand::new(&program), program }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.inner.arg(arg);
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.inner.args(args);
        self
    }

    pub fn env(mut self, key: impl AsRef<OsStr>, val: impl AsRef<OsStr>) -> Self {
        self.inner.env(key, val);
        self
    }

    pub fn envs<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<OsStr>,
        V: AsRef<OsStr>,
    {
        self.inner.envs(vars);
        self
    }

    pub fn stdout_to(mut self, stdio: Stdio) -> Self {
        self.inner.stdout(stdio);
        self
    }

    /// Run the command to completion and return its raw `Output`, failing
    /// only if the process could not be spawned at all.
    pub fn output(mut self) -> Result<Output> {
        self.inner.output().map_err(|e| Error::CommandFailed { cmd: self.program.clone(), source: e })
    }

    /// Run the command and require a zero exit status, surfacing stderr on
    /// failure. This is the entry point the Executor uses for `cp`, `mv`,
    /// `qemu-img`, and `virt-resize` invocations.
    pub fn run(self) -> Result<Output> {
        let program = self.program.clone();
        let output = self.output()?;
        if !output.status.success() {
            return Err(Error::NonZeroExit {
                cmd: program,
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        Ok(output)
    }

    pub fn program(&self) -> &str { &self.program }

    /// Run the command, feeding `input` to its stdin, and require a zero
    /// exit status. Used to pipe one gpg invocation's output into another
    /// (export into a scoped keyring) without a shell.
    pub fn run_with_stdin(mut self, input: &[u8]) -> Result<Output> {
        use std::io::Write;
        self.inner.stdin(Stdio::piped());
        self.inner.stdout(Stdio::piped());
        self.inner.stderr(Stdio::piped());
        let program = self.program.clone();
        let mut child = self.inner.spawn().map_err(|e| Error::CommandFailed { cmd: program.clone(), source: e })?;
        child
            .stdin
            .take()
            .expect("stdin was piped")
            .write_all(input)
            .map_err(|e| Error::CommandFailed { cmd: program.clone(), source: e })?;
        let output = child.wait_with_output().map_err(|e| Error::CommandFailed { cmd: program.clone(), source: e })?;
        if !output.status.success() {
            return Err(Error::NonZeroExit {
                cmd: program,
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_succeeds_for_zero_exit() {
        let out = Command::new("true").run();
        assert!(out.is_ok());
    }

    #[test]
    fn run_fails_for_nonzero_exit() {
        let err = Command::new("false").run().unwrap_err();
        assert!(matches!(err, Error::NonZeroExit { .. }));
    }

    #[test]
    fn env_is_forwarded_to_child() {
        let out = Command::new("sh")
            .arg("-c")
            .arg("printf %s \"$FOO\"")
            .env("FOO", "bar")
            .run()
            .unwrap();
        assert_eq!(String::from_utf8_lossy(&out.stdout), "bar");
    }
}
