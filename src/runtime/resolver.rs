//! Command name to executable path resolution.
//!
//! Resolution walks the lookup path entries directly instead of shelling out
//! to `which`/`where`, whose behavior differs between systems.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::error::{Result, RunwayError};

/// Check whether a file has executable permission bits set.
#[cfg(unix)]
pub fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

/// On Windows, executability is determined by file extension, not permission bits.
#[cfg(not(unix))]
pub fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Parse a PATH-style value into a list of directories.
pub fn parse_lookup_path(value: &OsString) -> Vec<PathBuf> {
    std::env::split_paths(value)
        .filter(|p| !p.as_os_str().is_empty())
        .collect()
}

#[cfg(windows)]
fn default_extensions() -> Vec<String> {
    std::env::var("PATHEXT")
        .unwrap_or_else(|_| ".COM;.EXE;.BAT;.CMD".to_string())
        .split(';')
        .filter(|e| !e.is_empty())
        .map(|e| e.to_ascii_lowercase())
        .collect()
}

#[cfg(not(windows))]
fn default_extensions() -> Vec<String> {
    Vec::new()
}

/// Resolves bare command names against an ordered list of directories.
#[derive(Debug, Clone)]
pub struct CommandResolver {
    entries: Vec<PathBuf>,
    extensions: Vec<String>,
}

impl CommandResolver {
    /// Build a resolver from the process `PATH`.
    ///
    /// Fails only when the process has no `PATH` at all; an empty `PATH`
    /// yields a resolver that finds nothing.
    pub fn from_env() -> Result<Self> {
        let path = std::env::var_os("PATH").ok_or_else(|| RunwayError::LookupUnavailable {
            message: "PATH is not set in the process environment".to_string(),
        })?;
        Ok(Self::new(parse_lookup_path(&path)))
    }

    /// Build a resolver over explicit directories.
    pub fn new(entries: Vec<PathBuf>) -> Self {
        Self {
            entries,
            extensions: default_extensions(),
        }
    }

    /// Use these executable extensions (e.g. `.exe`) instead of the platform default.
    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = extensions;
        self
    }

    /// The directories searched, in order.
    pub fn entries(&self) -> &[PathBuf] {
        &self.entries
    }

    fn candidates_in(&self, dir: &Path, name: &str) -> Vec<PathBuf> {
        let mut out = vec![dir.join(name)];
        let has_ext = Path::new(name).extension().is_some();
        if !has_ext {
            for ext in &self.extensions {
                out.push(dir.join(format!("{}{}", name, ext)));
            }
        }
        out
    }

    /// Resolve `name` to the first executable match in lookup order.
    ///
    /// A name containing a path separator is checked as-is.
    pub fn resolve(&self, name: &str) -> Option<PathBuf> {
        self.resolve_all(name).into_iter().next()
    }

    /// Every executable match for `name`, in lookup order, without duplicates.
    pub fn resolve_all(&self, name: &str) -> Vec<PathBuf> {
        if name.is_empty() {
            return Vec::new();
        }

        let as_path = Path::new(name);
        if as_path.components().count() > 1 || as_path.is_absolute() {
            return if is_executable(as_path) {
                vec![absolutize(as_path.to_path_buf())]
            } else {
                Vec::new()
            };
        }

        let mut found: Vec<PathBuf> = Vec::new();
        for dir in &self.entries {
            for candidate in self.candidates_in(dir, name) {
                if !is_executable(&candidate) {
                    continue;
                }
                let candidate = absolutize(candidate);
                if !found.contains(&candidate) {
                    found.push(candidate);
                }
            }
        }
        found
    }
}

/// Relative lookup entries (`.`, `bin`) resolve against the working directory.
fn absolutize(path: PathBuf) -> PathBuf {
    std::path::absolute(&path).unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    /// Create a fake binary at a path (creates parent dirs as needed).
    fn create_fake_binary(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, "#!/bin/sh\n").unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
        }
    }

    #[cfg(unix)]
    fn create_non_executable_file(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, "not executable").unwrap();
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o644)).unwrap();
    }

    #[test]
    fn resolve_finds_first_match() {
        let temp = TempDir::new().unwrap();
        let dir_a = temp.path().join("a");
        let dir_b = temp.path().join("b");
        create_fake_binary(&dir_a.join("python3"));
        create_fake_binary(&dir_b.join("python3"));

        let resolver = CommandResolver::new(vec![dir_a.clone(), dir_b.clone()]);
        assert_eq!(resolver.resolve("python3"), Some(dir_a.join("python3")));
    }

    #[test]
    fn resolve_all_lists_every_match_in_order() {
        let temp = TempDir::new().unwrap();
        let dir_a = temp.path().join("a");
        let dir_b = temp.path().join("b");
        create_fake_binary(&dir_a.join("python3"));
        create_fake_binary(&dir_b.join("python3"));

        let resolver = CommandResolver::new(vec![dir_a.clone(), dir_b.clone(), dir_a.clone()]);
        assert_eq!(
            resolver.resolve_all("python3"),
            vec![dir_a.join("python3"), dir_b.join("python3")]
        );
    }

    #[test]
    fn resolve_returns_none_when_absent() {
        let temp = TempDir::new().unwrap();
        let resolver = CommandResolver::new(vec![temp.path().to_path_buf()]);
        assert!(resolver.resolve("python3").is_none());
    }

    #[test]
    fn resolve_with_no_entries_finds_nothing() {
        let resolver = CommandResolver::new(Vec::new());
        assert!(resolver.resolve("python3").is_none());
        assert!(resolver.resolve("").is_none());
    }

    #[cfg(unix)]
    #[test]
    fn resolve_skips_non_executable() {
        let temp = TempDir::new().unwrap();
        let dir_a = temp.path().join("a");
        let dir_b = temp.path().join("b");
        create_non_executable_file(&dir_a.join("python3"));
        create_fake_binary(&dir_b.join("python3"));

        let resolver = CommandResolver::new(vec![dir_a, dir_b.clone()]);
        assert_eq!(resolver.resolve("python3"), Some(dir_b.join("python3")));
    }

    #[cfg(unix)]
    #[test]
    fn resolve_skips_directories_with_matching_name() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("a/python3")).unwrap();
        let resolver = CommandResolver::new(vec![temp.path().join("a")]);
        assert!(resolver.resolve("python3").is_none());
    }

    #[test]
    fn resolve_tries_extensions() {
        let temp = TempDir::new().unwrap();
        create_fake_binary(&temp.path().join("py.exe"));

        let resolver = CommandResolver::new(vec![temp.path().to_path_buf()])
            .with_extensions(vec![".exe".to_string()]);
        assert_eq!(resolver.resolve("py"), Some(temp.path().join("py.exe")));
    }

    #[test]
    fn resolve_checks_explicit_paths_directly() {
        let temp = TempDir::new().unwrap();
        let bin = temp.path().join("bin/python3");
        create_fake_binary(&bin);

        let resolver = CommandResolver::new(Vec::new());
        assert_eq!(resolver.resolve(bin.to_str().unwrap()), Some(bin.clone()));
        assert!(resolver
            .resolve(temp.path().join("bin/missing").to_str().unwrap())
            .is_none());
    }

    #[test]
    fn relative_entries_resolve_to_absolute_paths() {
        let temp = tempfile::tempdir_in(".").unwrap();
        let name = temp.path().file_name().unwrap().to_owned();
        create_fake_binary(&temp.path().join("python3"));

        let resolver = CommandResolver::new(vec![PathBuf::from(".").join(&name)]);
        let found = resolver.resolve("python3").unwrap();

        assert!(found.is_absolute());
        assert_eq!(
            found,
            std::env::current_dir().unwrap().join(&name).join("python3")
        );
    }

    #[test]
    fn parse_lookup_path_drops_empty_entries() {
        let joined = std::env::join_paths(["/usr/bin", "", "/bin"]).unwrap();
        assert_eq!(
            parse_lookup_path(&joined),
            vec![PathBuf::from("/usr/bin"), PathBuf::from("/bin")]
        );
    }

    #[test]
    fn is_executable_returns_false_for_nonexistent_file() {
        assert!(!is_executable(Path::new("/nonexistent/path/to/file")));
    }
}
