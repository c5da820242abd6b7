use super::sweep_dir;
use crate::channels::RunIdentity;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, OnceLock};

/// Filesystem state and child process of one live run, as seen by the
/// termination handler.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct RegisteredRun {
    dir: PathBuf,
    external_paths: Vec<PathBuf>,
    child_pid: Option<u32>,
}

fn runs() -> MutexGuard<'static, BTreeMap<RunIdentity, RegisteredRun>> {
    static RUNS: OnceLock<Mutex<BTreeMap<RunIdentity, RegisteredRun>>> = OnceLock::new();
    RUNS.get_or_init(|| Mutex::new(BTreeMap::new()))
        .lock()
        .unwrap_or_else(|err| err.into_inner())
}

pub fn register(identity: RunIdentity, dir: PathBuf) {
    runs().insert(
        identity,
        RegisteredRun {
            dir,
            ..RegisteredRun::default()
        },
    );
}

pub fn track_paths(identity: RunIdentity, paths: Vec<PathBuf>) {
    if let Some(run) = runs().get_mut(&identity) {
        run.external_paths.extend(paths);
    }
}

pub fn set_child(identity: RunIdentity, pid: Option<u32>) {
    if let Some(run) = runs().get_mut(&identity) {
        run.child_pid = pid;
    }
}

pub fn unregister(identity: RunIdentity) {
    runs().remove(&identity);
}

pub fn is_registered(identity: RunIdentity) -> bool {
    runs().contains_key(&identity)
}

/// Kills every registered child and removes every registered run's files.
/// Returns the number of runs cleaned.
pub fn cleanup_all() -> usize {
    let drained = std::mem::take(&mut *runs());
    for run in drained.values() {
        if let Some(pid) = run.child_pid.and_then(|pid| i32::try_from(pid).ok()) {
            let _ = kill(Pid::from_raw(pid), Signal::SIGKILL);
        }
        for path in &run.external_paths {
            let _ = fs::remove_file(path);
        }
        sweep_dir(&run.dir);
        let _ = fs::remove_dir(&run.dir);
    }
    drained.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_tracks_child_and_unregisters() {
        let identity = RunIdentity {
            pid: std::process::id(),
            seq: u64::MAX - 7,
        };
        register(identity, PathBuf::from("/nonexistent/run"));
        set_child(identity, Some(1));
        assert!(is_registered(identity));

        unregister(identity);
        assert!(!is_registered(identity));
    }
}
