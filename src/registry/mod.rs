//! The static allow-list of modules and their on-disk layout.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// A registered module. All three paths are pure functions of the name:
/// `<module-root>/<name>/<name>.sh`, `.ini` and `.log`.
#[derive(Debug, Clone)]
pub struct Module {
    pub name: String,
    pub script_path: PathBuf,
    pub config_path: PathBuf,
    pub log_path: PathBuf,
}

impl Module {
    fn new(root: &Path, name: &str) -> Self {
        let dir = root.join(name);
        Self {
            name: name.to_string(),
            script_path: dir.join(format!("{}.sh", name)),
            config_path: dir.join(format!("{}.ini", name)),
            log_path: dir.join(format!("{}.log", name)),
        }
    }
}

/// Immutable module allow-list, built once at startup and shared via `Arc`.
///
/// Lookup is exact, case-sensitive string equality. Raw request input never
/// reaches the filesystem directly: callers resolve through this map or not
/// at all.
pub struct ModuleRegistry {
    modules: BTreeMap<String, Module>,
}

impl ModuleRegistry {
    pub fn new<I, S>(module_root: impl AsRef<Path>, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let root = module_root.as_ref();
        let mut modules = BTreeMap::new();
        for name in names {
            let name = name.as_ref();
            if !is_valid_name(name) {
                tracing::warn!("Ignoring invalid module name '{}'", name);
                continue;
            }
            modules.insert(name.to_string(), Module::new(root, name));
        }
        Self { modules }
    }

    pub fn resolve(&self, name: &str) -> Option<&Module> {
        self.modules.get(name)
    }

    pub fn list(&self) -> impl Iterator<Item = &Module> {
        self.modules.values()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

/// Module names become path components; anything that could step outside the
/// module root is rejected at construction time.
fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && name != "." && !name.contains("..") && !name.contains(['/', '\\'])
}
