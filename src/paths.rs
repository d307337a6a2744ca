use std::path::PathBuf;

const CACHE_DIR: &str = "matchday_form";

/// `$XDG_CACHE_HOME/matchday_form`, falling back to `~/.cache/matchday_form`.
pub fn app_cache_dir() -> Option<PathBuf> {
    if let Ok(base) = std::env::var("XDG_CACHE_HOME")
        && !base.trim().is_empty()
    {
        return Some(PathBuf::from(base).join(CACHE_DIR));
    }
    let home = std::env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(PathBuf::from(home).join(".cache").join(CACHE_DIR))
}

pub fn form_log_path() -> Option<PathBuf> {
    app_cache_dir().map(|dir| dir.join("form.log"))
}
