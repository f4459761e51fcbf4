use std::path::{Path, PathBuf};

/// Resolve the project root that holds `.relnote/`.
///
/// Priority:
/// 1. `--root` flag / `RELNOTE_ROOT` env var (passed in as `explicit`)
/// 2. Nearest ancestor of `cwd` containing `.relnote/`
/// 3. Nearest ancestor of `cwd` containing `.git/`
/// 4. `cwd`
pub fn resolve_root(explicit: Option<&Path>) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_path_buf();
    }
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    find_upward(&cwd, ".relnote")
        .or_else(|| find_upward(&cwd, ".git"))
        .unwrap_or(cwd)
}

fn find_upward(start: &Path, marker: &str) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(marker).is_dir())
        .map(Path::to_path_buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn explicit_root_wins() {
        let dir = TempDir::new().unwrap();
        assert_eq!(resolve_root(Some(dir.path())), dir.path());
    }

    #[test]
    fn relnote_dir_beats_git_dir() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".git")).unwrap();
        std::fs::create_dir_all(dir.path().join("svc/.relnote")).unwrap();
        let deep = dir.path().join("svc/src/deep");
        std::fs::create_dir_all(&deep).unwrap();

        assert_eq!(find_upward(&deep, ".relnote"), Some(dir.path().join("svc")));
        assert_eq!(find_upward(&deep, ".git"), Some(dir.path().to_path_buf()));
        assert_eq!(find_upward(&deep, ".hg"), None);
    }
}
