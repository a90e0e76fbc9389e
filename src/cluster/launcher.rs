//! Worker processes launched by re-executing the current binary.

use std::ffi::{OsStr, OsString};
use std::io;
use std::path::PathBuf;
use std::process::Stdio;

use futures_util::future::BoxFuture;
use tokio::process::{Child, Command};

use crate::cluster::supervisor::{WorkerExit, WorkerLauncher, WorkerProcess};

const WORKER_FLAG: &str = "--worker";

/// Launches `<current exe> <own args> --worker <slot>`.
#[derive(Debug, Clone)]
pub struct ProcessLauncher {
    program: PathBuf,
    args: Vec<OsString>,
}

impl ProcessLauncher {
    pub fn new(program: PathBuf, args: impl IntoIterator<Item = OsString>) -> Self {
        Self {
            program,
            args: strip_worker_flag(args),
        }
    }

    /// Re-run this process with its own arguments.
    pub fn current() -> io::Result<Self> {
        Ok(Self::new(std::env::current_exe()?, std::env::args_os().skip(1)))
    }

    pub fn command(&self, slot: usize) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .arg(WORKER_FLAG)
            .arg(slot.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        command
    }
}

impl WorkerLauncher for ProcessLauncher {
    type Process = ChildWorker;

    fn launch(&self, slot: usize) -> io::Result<ChildWorker> {
        self.command(slot).spawn().map(ChildWorker)
    }
}

/// A worker child process; killed when dropped.
pub struct ChildWorker(Child);

impl WorkerProcess for ChildWorker {
    fn id(&self) -> Option<u32> {
        self.0.id()
    }

    fn wait(&mut self) -> BoxFuture<'_, WorkerExit> {
        Box::pin(async move {
            match self.0.wait().await {
                Ok(status) => WorkerExit::Status(status.code()),
                Err(e) => WorkerExit::WaitFailed(e.to_string()),
            }
        })
    }
}

fn strip_worker_flag(args: impl IntoIterator<Item = OsString>) -> Vec<OsString> {
    let mut kept = Vec::new();
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        if arg == OsStr::new(WORKER_FLAG) {
            args.next();
            continue;
        }
        if arg.to_str().is_some_and(|a| a.starts_with("--worker=")) {
            continue;
        }
        kept.push(arg);
    }
    kept
}
