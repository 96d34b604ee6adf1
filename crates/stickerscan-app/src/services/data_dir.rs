// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform-aware data directory resolution.

use std::path::PathBuf;

/// Return the application data directory, creating it if needed.
pub fn data_dir() -> PathBuf {
    let base = base_dir(std::env::var("XDG_DATA_HOME").ok(), std::env::var("HOME").ok());
    let dir = base.join("stickerscan");
    std::fs::create_dir_all(&dir).ok();
    dir
}

/// XDG data dir, then `~/.local/share`, then `/tmp`.
fn base_dir(xdg_data_home: Option<String>, home: Option<String>) -> PathBuf {
    if let Some(xdg) = xdg_data_home.filter(|s| !s.is_empty()) {
        return PathBuf::from(xdg);
    }
    if let Some(home) = home.filter(|s| !s.is_empty()) {
        return PathBuf::from(home).join(".local").join("share");
    }
    // Last resort
    PathBuf::from("/tmp")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xdg_wins_over_home() {
        let dir = base_dir(Some("/data".into()), Some("/home/u".into()));
        assert_eq!(dir, PathBuf::from("/data"));
    }

    #[test]
    fn home_fallback() {
        let dir = base_dir(Some(String::new()), Some("/home/u".into()));
        assert_eq!(dir, PathBuf::from("/home/u/.local/share"));
        assert_eq!(base_dir(None, None), PathBuf::from("/tmp"));
    }
}
