//! Start the office process in the background, listening on the endpoint.
//!
//! The child is detached (new session on Unix, `DETACHED_PROCESS` on
//! Windows) and never waited for; readiness is discovered by the connector
//! resolving again.
//!
//! The `-accept=...;urp;` argument opens the office's own remote-object port.
//! [`Session`](crate::protocol::Session) speaks the JSON bridge, so a bridge
//! server (see [`serve_connection`](crate::protocol::serve_connection)) has
//! to be listening on that endpoint, e.g. started by an office extension.
//! A bare office process accepts the TCP connection but never answers `bind`,
//! so the session gives up after [`READ_TIMEOUT`](crate::protocol::READ_TIMEOUT).

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use basync_core::Endpoint;

use crate::endpoint::accept_argument;
use crate::error::OfficeError;

/// Something that can bring a listener up on an endpoint.
pub trait Launcher {
    fn launch(&self, endpoint: &Endpoint) -> Result<(), OfficeError>;
}

/// Launches the office executable with an `-accept=` argument.
#[derive(Debug, Clone)]
pub struct OfficeLauncher {
    program: PathBuf,
}

impl OfficeLauncher {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// The command that [`Launcher::launch`] spawns, before detaching.
    pub fn command(&self, endpoint: &Endpoint) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg(accept_argument(endpoint))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        cmd
    }
}

impl Launcher for OfficeLauncher {
    fn launch(&self, endpoint: &Endpoint) -> Result<(), OfficeError> {
        let mut cmd = self.command(endpoint);
        detach(&mut cmd);
        match cmd.spawn() {
            Ok(child) => {
                tracing::info!(
                    pid = child.id(),
                    "started {} listening on {endpoint}",
                    self.program.display()
                );
                Ok(())
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(OfficeError::ExecutableNotFound {
                    program: self.program.clone(),
                })
            }
            Err(source) => Err(OfficeError::Launch {
                program: self.program.clone(),
                source,
            }),
        }
    }
}

#[cfg(unix)]
fn detach(cmd: &mut Command) {
    use std::os::unix::process::CommandExt;
    // SAFETY: setsid is async-signal-safe and touches no parent state.
    unsafe {
        cmd.pre_exec(|| {
            nix::unistd::setsid()
                .map(|_| ())
                .map_err(std::io::Error::from)
        });
    }
}

#[cfg(windows)]
fn detach(cmd: &mut Command) {
    use std::os::windows::process::CommandExt;
    const DETACHED_PROCESS: u32 = 0x0000_0008;
    cmd.creation_flags(DETACHED_PROCESS);
}

#[cfg(not(any(unix, windows)))]
fn detach(_cmd: &mut Command) {}
