use std::{
    path::PathBuf,
    sync::{Mutex, OnceLock},
};

static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

const CONFIG_HOME: &str = "SEQSUBMIT_CONFIG_HOME";
const BASE_URL: &str = "SEQSUBMIT_API_BASE_URL";

/// Points the client at a scratch config directory and clears the base URL override.
pub struct SeqsubmitEnvGuard {
    previous_home: Option<String>,
    previous_base_url: Option<String>,
    _lock: std::sync::MutexGuard<'static, ()>,
}

impl SeqsubmitEnvGuard {
    pub fn set_config_home(path: PathBuf) -> Self {
        let lock = ENV_LOCK
            .get_or_init(|| Mutex::new(()))
            .lock()
            .unwrap_or_else(|err| err.into_inner());
        let previous_home = std::env::var(CONFIG_HOME).ok();
        let previous_base_url = std::env::var(BASE_URL).ok();
        // SAFETY: tests run under a global lock to prevent concurrent env mutations.
        unsafe {
            std::env::set_var(CONFIG_HOME, path);
            std::env::remove_var(BASE_URL);
        }
        Self {
            previous_home,
            previous_base_url,
            _lock: lock,
        }
    }

    pub fn set_base_url(&self, value: &str) {
        // SAFETY: the guard holds the global env lock.
        unsafe {
            std::env::set_var(BASE_URL, value);
        }
    }
}

impl Drop for SeqsubmitEnvGuard {
    fn drop(&mut self) {
        restore(CONFIG_HOME, self.previous_home.take());
        restore(BASE_URL, self.previous_base_url.take());
    }
}

fn restore(key: &str, value: Option<String>) {
    match value {
        // SAFETY: tests run under a global lock to prevent concurrent env mutations.
        Some(value) => unsafe { std::env::set_var(key, value) },
        // SAFETY: as above.
        None => unsafe { std::env::remove_var(key) },
    }
}
