// process.rs

use std::ffi::CString;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::PermissionsExt;
use std::os::unix::io::{AsRawFd, FromRawFd, OwnedFd, RawFd};
use std::path::{Path, PathBuf};

use bytes::BytesMut;
use nix::errno::Errno;
use nix::poll::{poll, PollFd, PollFlags};
use nix::sys::wait::{waitpid, WaitStatus};
use nix::fcntl::OFlag;
use nix::unistd::{dup2, execv, fork, pipe2, read, ForkResult};
use tracing::debug;

use crate::error::CommandError;

/// What a finished program left behind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.status == 0
    }

    /// Turns a non-zero exit into [`CommandError::ProcessFailed`].
    pub fn check(self, program: &str) -> Result<Self, CommandError> {
        if self.success() {
            Ok(self)
        } else {
            Err(CommandError::ProcessFailed {
                program: program.to_string(),
                status: self.status,
                stderr: self.stderr,
            })
        }
    }
}

/// Runs external programs and waits for them.
pub trait ProcessRunner {
    fn invoke(&mut self, program: &str, args: &[String]) -> Result<ProcessOutput, CommandError>;
}

/// Resolves `program` the way a shell would: paths containing `/` are used
/// as-is, bare names are looked up on `PATH`.
pub fn find_in_path(program: &str) -> Option<PathBuf> {
    if program.contains('/') {
        let path = Path::new(program);
        return is_executable(path).then(|| path.to_path_buf());
    }
    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var)
        .map(|dir| dir.join(program))
        .find(|candidate| is_executable(candidate))
}

pub(crate) fn is_executable(path: &Path) -> bool {
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

/// Forks and execs, capturing stdout and stderr through pipes. Stdin is
/// inherited so interactive tools keep working.
#[derive(Debug, Default)]
pub struct ForkExecRunner;

impl ProcessRunner for ForkExecRunner {
    fn invoke(&mut self, program: &str, args: &[String]) -> Result<ProcessOutput, CommandError> {
        let exec_path =
            find_in_path(program).ok_or_else(|| CommandError::ProgramNotFound(program.to_string()))?;
        // everything the child needs is allocated before forking
        let path = to_cstring(exec_path.as_os_str().as_bytes())?;
        let mut argv = Vec::with_capacity(args.len() + 1);
        argv.push(to_cstring(program.as_bytes())?);
        for arg in args {
            argv.push(to_cstring(arg.as_bytes())?);
        }

        // close-on-exec so other children never hold our write ends open;
        // dup2 clears the flag on the copies the child keeps
        let (out_r, out_w) = owned_pipe()?;
        let (err_r, err_w) = owned_pipe()?;
        debug!(program, path = %exec_path.display(), ?args, "spawning");

        match unsafe { fork() }.map_err(errno_to_io)? {
            ForkResult::Child => {
                dup2(out_w.as_raw_fd(), 1).ok();
                dup2(err_w.as_raw_fd(), 2).ok();
                execv(&path, &argv).ok();
                unsafe { libc::_exit(127) }
            }
            ForkResult::Parent { child } => {
                drop(out_w);
                drop(err_w);
                let drained = drain(out_r.as_raw_fd(), err_r.as_raw_fd());
                drop(out_r);
                drop(err_r);
                let status = match waitpid(child, None).map_err(errno_to_io)? {
                    WaitStatus::Exited(_, code) => code,
                    WaitStatus::Signaled(_, signal, _) => 128 + signal as i32,
                    _ => -1,
                };
                let [stdout, stderr] = drained.map_err(errno_to_io)?;
                debug!(program, status, "finished");
                Ok(ProcessOutput {
                    status,
                    stdout: String::from_utf8_lossy(&stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&stderr).into_owned(),
                })
            }
        }
    }
}

/// Reads both pipes until EOF, whichever has data first, so a chatty stderr
/// can't stall the child while stdout is being read.
fn drain(out_fd: RawFd, err_fd: RawFd) -> nix::Result<[BytesMut; 2]> {
    let mut bufs = [BytesMut::new(), BytesMut::new()];
    let mut open = [true, true];
    let fds = [out_fd, err_fd];
    let mut chunk = [0u8; 4096];
    while open.iter().any(|o| *o) {
        let live: Vec<usize> = (0..2).filter(|i| open[*i]).collect();
        let mut polled: Vec<PollFd> =
            live.iter().map(|i| PollFd::new(fds[*i], PollFlags::POLLIN)).collect();
        match poll(&mut polled, -1) {
            Err(Errno::EINTR) => continue,
            Err(e) => return Err(e),
            Ok(_) => {}
        }
        for (slot, pfd) in live.iter().zip(polled.iter()) {
            let ready = pfd.revents().map(|r| !r.is_empty()).unwrap_or(false);
            if !ready {
                continue;
            }
            match read(fds[*slot], &mut chunk) {
                Ok(0) => open[*slot] = false,
                Ok(n) => bufs[*slot].extend_from_slice(&chunk[..n]),
                Err(Errno::EINTR) => {}
                Err(e) => return Err(e),
            }
        }
    }
    Ok(bufs)
}

/// A close-on-exec pipe whose ends close themselves when dropped.
fn owned_pipe() -> Result<(OwnedFd, OwnedFd), CommandError> {
    let (r, w) = pipe2(OFlag::O_CLOEXEC).map_err(errno_to_io)?;
    // pipe2 just handed us both fds and nothing else owns them
    Ok(unsafe { (OwnedFd::from_raw_fd(r), OwnedFd::from_raw_fd(w)) })
}

fn to_cstring(bytes: &[u8]) -> Result<CString, CommandError> {
    CString::new(bytes).map_err(|_| CommandError::InvalidArgument {
        command: "exec",
        value: String::from_utf8_lossy(bytes).into_owned(),
        reason: "contains a NUL byte".into(),
    })
}

fn errno_to_io(e: Errno) -> CommandError {
    CommandError::Io(std::io::Error::from(e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str) -> Result<ProcessOutput, CommandError> {
        ForkExecRunner.invoke("sh", &["-c".to_string(), script.to_string()])
    }

    #[test]
    fn captures_both_streams_and_status() {
        let out = sh("echo out; echo err >&2; exit 3").unwrap();
        assert_eq!(out.status, 3);
        assert_eq!(out.stdout, "out\n");
        assert_eq!(out.stderr, "err\n");
        assert!(!out.success());
    }

    #[test]
    fn large_stderr_does_not_block() {
        let line = "x".repeat(40);
        let script = format!(
            "i=0; while [ $i -lt 2000 ]; do echo '{}' >&2; i=$((i+1)); done; echo done",
            line
        );
        let out = sh(&script).unwrap();
        assert!(out.success());
        assert_eq!(out.stdout, "done\n");
        assert!(out.stderr.len() > 64 * 1024);
    }

    #[test]
    fn signal_death_is_reported_as_128_plus_signo() {
        let out = sh("kill -TERM $$").unwrap();
        assert_eq!(out.status, 143);
    }

    #[test]
    fn dropping_the_write_end_closes_the_pipe() {
        let (r, w) = owned_pipe().unwrap();
        drop(w);
        let mut buf = [0u8; 8];
        assert_eq!(read(r.as_raw_fd(), &mut buf).unwrap(), 0);
    }

    #[test]
    fn missing_program_is_not_found() {
        let err = ForkExecRunner.invoke("no-such-program-xyz", &[]).unwrap_err();
        assert!(matches!(err, CommandError::ProgramNotFound(p) if p == "no-such-program-xyz"));
    }

    #[test]
    fn check_turns_failure_into_error() {
        let failed = ProcessOutput { status: 1, stdout: String::new(), stderr: "boom".into() };
        assert!(matches!(failed.check("x"), Err(CommandError::ProcessFailed { status: 1, .. })));
        let ok = ProcessOutput::default();
        assert!(ok.check("x").is_ok());
    }

    #[test]
    fn find_in_path_requires_executable_bit() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("tool");
        std::fs::write(&script, "#!/bin/sh\n").unwrap();
        let as_str = script.to_string_lossy().to_string();
        assert!(find_in_path(&as_str).is_none());
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        assert_eq!(find_in_path(&as_str), Some(script));
    }
}
