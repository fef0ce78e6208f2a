use std::env;
use std::ffi::{OsStr, OsString};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use log::debug;

use crate::constants::{STABLE_LOCALE, SYSTEM_BIN_DIRS};

/// Immutable description of how external tools are located and what
/// environment they run in.
///
/// Built once at startup and passed to everything that spawns a process, so
/// nothing in the collector mutates the process-wide `PATH`, locale or
/// working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolEnvironment {
    vars: Vec<(OsString, OsString)>,
    search_path: Vec<PathBuf>,
}

impl ToolEnvironment {
    /// Capture the ambient environment of this process.
    ///
    /// The directory holding the running executable is searched first so
    /// helper binaries shipped next to the collector win over system ones.
    pub fn from_process() -> Self {
        let mut search_path = Vec::new();
        if let Some(dir) = env::current_exe().ok().and_then(|exe| exe.parent().map(Path::to_path_buf)) {
            search_path.push(dir);
        }
        if let Some(path) = env::var_os("PATH") {
            search_path.extend(env::split_paths(&path));
        }
        search_path.extend(SYSTEM_BIN_DIRS.iter().map(PathBuf::from));

        Self::from_parts(env::vars_os(), search_path)
    }

    /// Build an environment from explicit variables and search directories.
    pub fn from_parts<I, P>(vars: I, search_path: P) -> Self
    where
        I: IntoIterator<Item = (OsString, OsString)>,
        P: IntoIterator<Item = PathBuf>,
    {
        let mut dedup: Vec<PathBuf> = Vec::new();
        for dir in search_path {
            if !dir.as_os_str().is_empty() && !dedup.contains(&dir) {
                dedup.push(dir);
            }
        }

        let mut vars: Vec<(OsString, OsString)> = vars
            .into_iter()
            .filter(|(key, _)| !is_locale_var(key) && key != "PATH")
            .collect();
        vars.push(("LC_ALL".into(), STABLE_LOCALE.into()));
        vars.push(("LANG".into(), STABLE_LOCALE.into()));
        if let Ok(path) = env::join_paths(&dedup) {
            vars.push(("PATH".into(), path));
        }

        debug!("Tool search path: {:?}", dedup);
        Self { vars, search_path: dedup }
    }

    /// Same environment, with extra directories searched before the current ones.
    pub fn with_leading_dirs<P: IntoIterator<Item = PathBuf>>(&self, dirs: P) -> Self {
        let mut search_path: Vec<PathBuf> = dirs.into_iter().collect();
        search_path.extend(self.search_path.iter().cloned());
        Self::from_parts(self.vars.iter().cloned(), search_path)
    }

    /// Variables every child process receives, after `env_clear()`.
    pub fn vars(&self) -> impl Iterator<Item = (&OsStr, &OsStr)> {
        self.vars.iter().map(|(k, v)| (k.as_os_str(), v.as_os_str()))
    }

    pub fn search_path(&self) -> &[PathBuf] {
        &self.search_path
    }

    /// Resolve a program name to an executable path.
    ///
    /// Names containing a slash are taken as paths and only checked for
    /// existence.
    pub fn find_program(&self, name: &str) -> Option<PathBuf> {
        if name.contains('/') {
            let path = PathBuf::from(name);
            return is_executable(&path).then_some(path);
        }
        self.search_path
            .iter()
            .map(|dir| dir.join(name))
            .find(|candidate| is_executable(candidate))
    }

    pub fn has_program(&self, name: &str) -> bool {
        self.find_program(name).is_some()
    }
}

fn is_locale_var(key: &OsStr) -> bool {
    let key = key.to_string_lossy();
    key.starts_with("LC_") || key == "LANG" || key == "LANGUAGE"
}

fn is_executable(path: &Path) -> bool {
    path.metadata()
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::install_tool;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(OsString, OsString)> {
        pairs.iter().map(|(k, v)| (OsString::from(k), OsString::from(v))).collect()
    }

    fn lookup<'a>(env: &'a ToolEnvironment, key: &str) -> Vec<&'a OsStr> {
        env.vars().filter(|(k, _)| *k == key).map(|(_, v)| v).collect()
    }

    #[test]
    fn test_locale_is_forced() {
        let env = ToolEnvironment::from_parts(
            vars(&[("LANG", "de_DE.UTF-8"), ("LC_TIME", "fr_FR"), ("LANGUAGE", "de"), ("HOME", "/root")]),
            Vec::new(),
        );

        assert_eq!(lookup(&env, "LC_ALL"), vec![OsStr::new(STABLE_LOCALE)]);
        assert_eq!(lookup(&env, "LANG"), vec![OsStr::new(STABLE_LOCALE)]);
        assert!(lookup(&env, "LC_TIME").is_empty());
        assert!(lookup(&env, "LANGUAGE").is_empty());
        assert_eq!(lookup(&env, "HOME"), vec![OsStr::new("/root")]);
    }

    #[test]
    fn test_path_reflects_search_path() {
        let env = ToolEnvironment::from_parts(
            vars(&[("PATH", "/ignored")]),
            vec![PathBuf::from("/opt/tools"), PathBuf::from("/usr/bin"), PathBuf::from("/opt/tools")],
        );

        assert_eq!(env.search_path(), &[PathBuf::from("/opt/tools"), PathBuf::from("/usr/bin")]);
        assert_eq!(lookup(&env, "PATH"), vec![OsStr::new("/opt/tools:/usr/bin")]);
    }

    #[test]
    fn test_find_program_in_search_path() {
        let dir = tempfile::TempDir::new().unwrap();
        install_tool(dir.path(), "fake-tool", "exit 0");
        std::fs::write(dir.path().join("not-executable"), "data").unwrap();

        let env = ToolEnvironment::from_parts(Vec::new(), vec![dir.path().to_path_buf()]);

        assert_eq!(env.find_program("fake-tool"), Some(dir.path().join("fake-tool")));
        assert!(!env.has_program("not-executable"));
        assert!(!env.has_program("missing-tool"));
    }

    #[test]
    fn test_leading_dirs_take_priority() {
        let first = tempfile::TempDir::new().unwrap();
        let second = tempfile::TempDir::new().unwrap();
        install_tool(first.path(), "tool", "exit 1");
        install_tool(second.path(), "tool", "exit 0");

        let env = ToolEnvironment::from_parts(Vec::new(), vec![second.path().to_path_buf()])
            .with_leading_dirs(vec![first.path().to_path_buf()]);

        assert_eq!(env.find_program("tool"), Some(first.path().join("tool")));
    }
}
