use std::collections::HashMap;

use crate::module::ModuleInfo;
use crate::parser::Import;

/// Maps import statements onto project modules.
///
/// Lookups are index-based: `resolve` returns positions into the slice the
/// resolver was built from. Imports of the standard library or third-party
/// packages resolve to nothing, unless a project file shares the top-level
/// name: the stem fallback then maps `import json` onto e.g. `tools/json.py`.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use modgraph_scan::module::ModuleInfo;
/// use modgraph_scan::parser::Import;
/// use modgraph_scan::resolver::Resolver;
///
/// let modules = vec![
///     ModuleInfo::from_relative_path(Path::new("app.py"), 0),
///     ModuleInfo::from_relative_path(Path::new("pkg/models.py"), 0),
/// ];
/// let resolver = Resolver::new(&modules);
/// let import = Import {
///     module: "pkg.models".into(),
///     level: 0,
///     names: vec!["User".into()],
///     line: 1,
///     is_from: true,
/// };
/// assert_eq!(resolver.resolve(0, &import), vec![1]);
/// ```
pub struct Resolver<'a> {
    modules: &'a [ModuleInfo],
    by_id: HashMap<&'a str, usize>,
    by_module_path: HashMap<String, usize>,
    by_folder_stem: HashMap<(&'a str, &'a str), usize>,
    by_stem: HashMap<&'a str, Vec<usize>>,
}

impl<'a> Resolver<'a> {
    /// Index `modules` for lookup. On duplicate keys the earlier module wins.
    pub fn new(modules: &'a [ModuleInfo]) -> Self {
        let mut by_id = HashMap::new();
        let mut by_module_path = HashMap::new();
        let mut by_folder_stem = HashMap::new();
        let mut by_stem: HashMap<&str, Vec<usize>> = HashMap::new();

        for (idx, info) in modules.iter().enumerate() {
            by_id.entry(info.id.as_str()).or_insert(idx);
            if !info.module_path.is_empty() {
                by_module_path
                    .entry(info.module_path.clone())
                    .or_insert(idx);
            }
            if !info.is_init {
                by_folder_stem
                    .entry((info.folder.as_str(), info.stem.as_str()))
                    .or_insert(idx);
                by_stem.entry(info.stem.as_str()).or_default().push(idx);
            }
        }

        // `src/` layouts are imported without the `src.` prefix
        for (idx, info) in modules.iter().enumerate() {
            if let Some(stripped) = info.module_path.strip_prefix("src.") {
                by_module_path.entry(stripped.to_string()).or_insert(idx);
            }
        }

        Self {
            modules,
            by_id,
            by_module_path,
            by_folder_stem,
            by_stem,
        }
    }

    /// Resolve one import made by the module at `importer`.
    ///
    /// Returns deduplicated target indices in discovery order; an empty
    /// vector means the import is external or unresolvable.
    pub fn resolve(&self, importer: usize, import: &Import) -> Vec<usize> {
        let Some(info) = self.modules.get(importer) else {
            return Vec::new();
        };

        let mut targets = if import.is_relative() {
            self.resolve_relative(info, import)
        } else {
            self.resolve_absolute(info, import)
        };

        let mut seen = Vec::with_capacity(targets.len());
        targets.retain(|t| {
            if seen.contains(t) {
                false
            } else {
                seen.push(*t);
                true
            }
        });
        targets
    }

    fn resolve_relative(&self, importer: &ModuleInfo, import: &Import) -> Vec<usize> {
        let mut base: Vec<&str> = importer
            .directory()
            .split('/')
            .filter(|p| !p.is_empty())
            .collect();
        let ups = import.level - 1;
        if ups > base.len() {
            return Vec::new();
        }
        base.truncate(base.len() - ups);

        let mut package = base;
        package.extend(import.module.split('.').filter(|p| !p.is_empty()));

        let submodules: Vec<usize> = import
            .names
            .iter()
            .filter(|name| name.as_str() != "*")
            .filter_map(|name| {
                let mut parts = package.clone();
                parts.push(name.as_str());
                self.file_at(&parts)
            })
            .collect();
        if !submodules.is_empty() {
            return submodules;
        }

        let target = if import.module.is_empty() {
            self.init_at(&package)
        } else {
            self.file_at(&package)
        };
        target.into_iter().collect()
    }

    fn resolve_absolute(&self, importer: &ModuleInfo, import: &Import) -> Vec<usize> {
        if import.module.is_empty() {
            return Vec::new();
        }

        if import.is_from {
            let submodules: Vec<usize> = import
                .names
                .iter()
                .filter(|name| name.as_str() != "*")
                .filter_map(|name| {
                    self.by_module_path
                        .get(&format!("{}.{name}", import.module))
                        .copied()
                })
                .collect();
            if !submodules.is_empty() {
                return submodules;
            }
        }

        let parts: Vec<&str> = import.module.split('.').collect();
        for len in (1..=parts.len()).rev() {
            if let Some(&idx) = self.by_module_path.get(&parts[..len].join(".")) {
                return vec![idx];
            }
        }

        if parts.len() >= 2 {
            if let Some(&idx) = self.by_folder_stem.get(&(parts[0], parts[1])) {
                return vec![idx];
            }
        }

        self.by_stem_near(importer, parts[0]).into_iter().collect()
    }

    /// `a/b.py`, falling back to the package `a/b/__init__.py`.
    fn file_at(&self, parts: &[&str]) -> Option<usize> {
        if parts.is_empty() {
            return self.init_at(parts);
        }
        let joined = parts.join("/");
        self.by_id
            .get(format!("{joined}.py").as_str())
            .or_else(|| self.by_id.get(format!("{joined}/__init__.py").as_str()))
            .copied()
    }

    fn init_at(&self, parts: &[&str]) -> Option<usize> {
        let id = if parts.is_empty() {
            "__init__.py".to_string()
        } else {
            format!("{}/__init__.py", parts.join("/"))
        };
        self.by_id.get(id.as_str()).copied()
    }

    /// Pick among same-stem modules: same directory, then same top-level
    /// folder, then the smallest id.
    fn by_stem_near(&self, importer: &ModuleInfo, stem: &str) -> Option<usize> {
        let candidates = self.by_stem.get(stem)?;
        let pick = |pred: &dyn Fn(&ModuleInfo) -> bool| {
            candidates
                .iter()
                .copied()
                .filter(|&i| pred(&self.modules[i]))
                .min_by(|&a, &b| self.modules[a].id.cmp(&self.modules[b].id))
        };

        pick(&|m: &ModuleInfo| m.directory() == importer.directory())
            .or_else(|| pick(&|m: &ModuleInfo| m.folder == importer.folder))
            .or_else(|| pick(&|_: &ModuleInfo| true))
    }
}
