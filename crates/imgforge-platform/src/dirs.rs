use std::env;
use std::path::PathBuf;

/// `$XDG_CONFIG_HOME`, or `$HOME/.config` when unset.
pub fn config_home() -> Option<PathBuf> {
    env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| home::home_dir().map(|p| p.join(".config")))
}

/// `$XDG_CONFIG_DIRS`, colon-separated, defaulting to `/etc/xdg` when unset
/// or empty.
pub fn config_dirs() -> Vec<PathBuf> {
    match env::var_os("XDG_CONFIG_DIRS") {
        Some(val) if !val.is_empty() => env::split_paths(&val).collect(),
        _ => vec![PathBuf::from("/etc/xdg")],
    }
}

/// `$XDG_CACHE_HOME`, or `$HOME/.cache` when unset.
pub fn cache_home() -> Option<PathBuf> {
    env::var_os("XDG_CACHE_HOME")
        .map(PathBuf::from)
        .or_else(|| home::home_dir().map(|p| p.join(".cache")))
}

/// Ordered list of `repos.d` directories to scan for source descriptors:
/// the user config dir first, then each system config dir in order.
pub fn repos_d_dirs(program: &str) -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    if let Some(home) = config_home() {
        dirs.push(home.join(program).join("repos.d"));
    }
    for dir in config_dirs() {
        dirs.push(dir.join(program).join("repos.d"));
    }
    dirs
}

/// Default cache directory for the program: `$XDG_CACHE_HOME/<program>`.
pub fn default_cache_dir(program: &str) -> Option<PathBuf> {
    cache_home().map(|p| p.join(program))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Environment variable mutation must be serialized across tests in this
    // module; std::env is process-global.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn config_dirs_defaults_to_etc_xdg_when_unset() {
        let _guard = ENV_LOCK.lock().unwrap();
        let saved = env::var_os("XDG_CONFIG_DIRS");
        unsafe { env::remove_var("XDG_CONFIG_DIRS") };
        assert_eq!(config_dirs(), vec![PathBuf::from("/etc/xdg")]);
        if let Some(v) = saved {
            unsafe { env::set_var("XDG_CONFIG_DIRS", v) };
        }
    }

    #[test]
    fn config_dirs_splits_on_colon() {
        let _guard = ENV_LOCK.lock().unwrap();
        let saved = env::var_os("XDG_CONFIG_DIRS");
        unsafe { env::set_var("XDG_CONFIG_DIRS", "/a/xdg:/b/xdg") };
        assert_eq!(
            config_dirs(),
            vec![PathBuf::from("/a/xdg"), PathBuf::from("/b/xdg")]
        );
        match saved {
            Some(v) => unsafe { env::set_var("XDG_CONFIG_DIRS", v) },
            None => unsafe { env::remove_var("XDG_CONFIG_DIRS") },
        }
    }

    #[test]
    fn repos_d_dirs_puts_user_config_first() {
        let _guard = ENV_LOCK.lock().unwrap();
        let saved_home = env::var_os("XDG_CONFIG_HOME");
        let saved_dirs = env::var_os("XDG_CONFIG_DIRS");
        unsafe {
            env::set_var("XDG_CONFIG_HOME", "/home/u/.config");
            env::set_var("XDG_CONFIG_DIRS", "/etc/xdg");
        }
        let dirs = repos_d_dirs("imgforge");
        assert_eq!(dirs[0], PathBuf::from("/home/u/.config/imgforge/repos.d"));
        assert_eq!(dirs[1], PathBuf::from("/etc/xdg/imgforge/repos.d"));
        match saved_home {
            Some(v) => unsafe { env::set_var("XDG_CONFIG_HOME", v) },
            None => unsafe { env::remove_var("XDG_CONFIG_HOME") },
        }
        match saved_dirs {
            Some(v) => unsafe { env::set_var("XDG_CONFIG_DIRS", v) },
            None => unsafe { env::remove_var("XDG_CONFIG_DIRS") },
        }
    }
}
