//! Scoped mutation of process-wide state for engines that read it.
//!
//! Both guards restore the previous value on drop. Holders must also hold
//! [`lock_process_state`] for as long as the guards live.

use std::env;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::warn;

static PROCESS_STATE: Mutex<()> = Mutex::new(());

/// Serializes access to the working directory and environment.
pub fn lock_process_state() -> MutexGuard<'static, ()> {
    // Guards restore state on unwind, so a poisoned lock is still usable
    PROCESS_STATE.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Changes the working directory until dropped.
#[derive(Debug)]
pub struct WorkingDirGuard {
    previous: PathBuf,
}

impl WorkingDirGuard {
    pub fn change_to(dir: &Path) -> io::Result<Self> {
        let previous = env::current_dir()?;
        env::set_current_dir(dir)?;
        Ok(Self { previous })
    }
}

impl Drop for WorkingDirGuard {
    fn drop(&mut self) {
        if let Err(e) = env::set_current_dir(&self.previous) {
            warn!(dir = %self.previous.display(), error = %e, "Failed to restore working directory");
        }
    }
}

/// Prepends a directory to a search path variable until dropped.
#[derive(Debug)]
pub struct SearchPathGuard {
    var: String,
    previous: Option<OsString>,
}

impl SearchPathGuard {
    pub fn prepend(var: &str, dir: &Path) -> io::Result<Self> {
        let previous = env::var_os(var);

        let mut paths = vec![dir.to_path_buf()];
        if let Some(existing) = &previous {
            paths.extend(env::split_paths(existing));
        }
        let joined =
            env::join_paths(paths).map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        env::set_var(var, joined);

        Ok(Self {
            var: var.to_string(),
            previous,
        })
    }
}

impl Drop for SearchPathGuard {
    fn drop(&mut self) {
        match &self.previous {
            Some(value) => env::set_var(&self.var, value),
            None => env::remove_var(&self.var),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_path_restored() {
        let _lock = lock_process_state();
        let var = "RFREMOTE_TEST_SEARCH_PATH";
        env::set_var(var, "/existing");

        {
            let _guard = SearchPathGuard::prepend(var, Path::new("/workspace")).unwrap();
            let value = env::var_os(var).unwrap();
            let paths: Vec<PathBuf> = env::split_paths(&value).collect();
            assert_eq!(paths, vec![PathBuf::from("/workspace"), PathBuf::from("/existing")]);
        }

        assert_eq!(env::var(var).unwrap(), "/existing");
        env::remove_var(var);
    }

    #[test]
    fn test_unset_search_path_removed_again() {
        let _lock = lock_process_state();
        let var = "RFREMOTE_TEST_UNSET_PATH";
        env::remove_var(var);

        {
            let _guard = SearchPathGuard::prepend(var, Path::new("/workspace")).unwrap();
            assert!(env::var_os(var).is_some());
        }

        assert!(env::var_os(var).is_none());
    }
}
