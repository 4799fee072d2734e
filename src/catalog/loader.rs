//! Locale file discovery, loading and per-locale assembly.

use std::collections::{
    BTreeMap,
    BTreeSet,
};
use std::path::{
    Path,
    PathBuf,
};

use ignore::WalkBuilder;

use super::error::CatalogError;
use super::flat::{
    self,
    FlatMap,
};
use super::language::LanguageMap;
use super::parser::ParserRegistry;
use crate::config::{
    I18nSettings,
    PathMatcher,
    build_glob_set,
};

/// Ignored in every locale root on top of `ignoreFiles`.
const ALWAYS_IGNORED: [&str; 2] = ["node_modules/**", "vendors/**"];
/// Never descended into while discovering locale roots.
const PRUNED_DIRS: [&str; 2] = ["node_modules", ".git"];
/// Re-export barrels such as `zh/index.js`, not catalogs.
const INDEX_NAMESPACE: &str = "index";
/// `<root>/<locale>/<file>` without `includeSubfolders`.
const SHALLOW_DEPTH: usize = 2;

/// One loaded locale file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocaleEntry {
    pub filepath: PathBuf,
    /// Locale root the file was found under.
    pub dirpath: PathBuf,
    pub locale: String,
    /// Empty when the matching pattern has no namespace group.
    pub namespace: String,
    pub value: FlatMap,
    pub matcher: String,
}

/// Merged keys of one namespace and the files they came from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamespaceCatalog {
    pub name: String,
    /// Origin files in load order.
    pub files: Vec<PathBuf>,
    /// Merged view; later files win key by key.
    pub values: FlatMap,
    /// Each origin file's own keys and values.
    pub origins: BTreeMap<PathBuf, FlatMap>,
}

impl NamespaceCatalog {
    /// Keys held by no origin file, i.e. added since loading.
    #[must_use]
    pub fn minted(&self) -> FlatMap {
        self.values
            .iter()
            .filter(|(key, _)| !self.origins.values().any(|origin| origin.contains_key(*key)))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }
}

/// All namespaces of one locale, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocaleCatalog {
    pub locale: String,
    pub namespaces: Vec<NamespaceCatalog>,
}

impl LocaleCatalog {
    #[must_use]
    pub fn new(locale: impl Into<String>) -> Self {
        Self { locale: locale.into(), namespaces: Vec::new() }
    }

    #[must_use]
    pub fn namespace(&self, name: &str) -> Option<&NamespaceCatalog> {
        self.namespaces.iter().find(|ns| ns.name == name)
    }

    /// Returns the namespace, appending an empty one if missing.
    #[allow(clippy::indexing_slicing)] // index comes from position or push
    pub fn namespace_mut(&mut self, name: &str) -> &mut NamespaceCatalog {
        let index = match self.namespaces.iter().position(|ns| ns.name == name) {
            Some(index) => index,
            None => {
                self.namespaces.push(NamespaceCatalog { name: name.to_string(), ..Default::default() });
                self.namespaces.len() - 1
            }
        };
        &mut self.namespaces[index]
    }

    /// Every key of the locale as a full `<namespace>.<key>` path.
    #[must_use]
    pub fn flattened(&self, separator: &str) -> FlatMap {
        self.namespaces
            .iter()
            .flat_map(|ns| {
                ns.values
                    .iter()
                    .map(|(key, value)| (flat::join_key(&ns.name, key, separator), value.clone()))
            })
            .collect()
    }
}

/// Catalogs of every loaded locale.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlattenedCatalog {
    pub locales: BTreeMap<String, LocaleCatalog>,
}

impl FlattenedCatalog {
    #[must_use]
    pub fn locale(&self, locale: &str) -> Option<&LocaleCatalog> {
        self.locales.get(locale)
    }

    /// Flat view of one locale; empty for unknown locales.
    #[must_use]
    pub fn flattened(&self, locale: &str, separator: &str) -> FlatMap {
        self.locales.get(locale).map(|c| c.flattened(separator)).unwrap_or_default()
    }
}

/// Loads every locale file under the configured locale roots.
#[derive(Debug)]
pub struct LocaleLoader<'a> {
    /// Project root `localesPaths` are resolved against.
    workspace_root: PathBuf,
    /// Project settings.
    settings: &'a I18nSettings,
    /// Parsers by file extension.
    registry: &'a ParserRegistry,
    /// Compiled `pathMatchers`.
    path_matcher: PathMatcher,
    /// Discovered locale roots, sorted.
    locale_dirs: Vec<PathBuf>,
    /// Loaded files in load order.
    files: Vec<LocaleEntry>,
    /// Catalog assembled from `files`.
    catalog: FlattenedCatalog,
}

impl<'a> LocaleLoader<'a> {
    pub fn new(
        workspace_root: impl Into<PathBuf>,
        settings: &'a I18nSettings,
        registry: &'a ParserRegistry,
    ) -> Result<Self, CatalogError> {
        let path_matcher = PathMatcher::new(&settings.path_matchers)?;
        Ok(Self {
            workspace_root: workspace_root.into(),
            settings,
            registry,
            path_matcher,
            locale_dirs: Vec::new(),
            files: Vec::new(),
            catalog: FlattenedCatalog::default(),
        })
    }

    /// Discovers locale roots, loads every file and assembles the catalog.
    pub async fn init(&mut self) -> Result<(), CatalogError> {
        if self.discover_roots()? {
            self.load_all().await?;
        }
        self.assemble();
        tracing::info!(
            roots = self.locale_dirs.len(),
            files = self.files.len(),
            locales = self.catalog.locales.len(),
            "Locale catalog loaded"
        );
        Ok(())
    }

    /// Resolves `localesPaths` into absolute directories.
    ///
    /// Returns `false` when nothing was found.
    pub fn discover_roots(&mut self) -> Result<bool, CatalogError> {
        let mut found = BTreeSet::new();
        let patterns: Vec<String> =
            self.settings.locales_paths.iter().filter(|p| p.as_str() != ".").cloned().collect();

        if self.settings.locales_paths.iter().any(|p| p == ".") {
            found.insert(self.workspace_root.clone());
        }

        if !patterns.is_empty() {
            let glob_set = build_glob_set(&patterns).map_err(crate::config::MatcherError::from)?;
            let walker = WalkBuilder::new(&self.workspace_root)
                .standard_filters(false)
                .hidden(true)
                .follow_links(false)
                .filter_entry(|entry| {
                    !entry.file_name().to_str().is_some_and(|name| PRUNED_DIRS.contains(&name))
                })
                .build();

            for result in walker {
                let entry = match result {
                    Ok(entry) => entry,
                    Err(err) => {
                        tracing::debug!(?err, "Failed to read directory entry");
                        continue;
                    }
                };
                if !entry.file_type().is_some_and(|ft| ft.is_dir()) {
                    continue;
                }
                let Ok(relative_path) = entry.path().strip_prefix(&self.workspace_root) else {
                    continue;
                };
                if !relative_path.as_os_str().is_empty() && glob_set.is_match(relative_path) {
                    found.insert(entry.path().to_path_buf());
                }
            }
        }

        self.locale_dirs = found.into_iter().collect();
        if self.locale_dirs.is_empty() {
            tracing::warn!(
                locales_paths = ?self.settings.locales_paths,
                "No locale directories found"
            );
            return Ok(false);
        }
        tracing::debug!(dirs = ?self.locale_dirs, "Locale directories discovered");
        Ok(true)
    }

    /// Loads every root in order.
    pub async fn load_all(&mut self) -> Result<(), CatalogError> {
        let ignore_set = build_glob_set(
            &ALWAYS_IGNORED
                .iter()
                .map(ToString::to_string)
                .chain(self.settings.ignore_files.iter().cloned())
                .collect::<Vec<_>>(),
        )
        .map_err(crate::config::MatcherError::from)?;

        for dir in self.locale_dirs.clone() {
            for relative_path in self.list_directory(&dir, &ignore_set) {
                self.load_file(&dir, &relative_path).await;
            }
        }
        Ok(())
    }

    /// Files under `dir` relative to it, minus ignored ones, in path order.
    fn list_directory(&self, dir: &Path, ignore_set: &globset::GlobSet) -> Vec<PathBuf> {
        let max_depth = if self.settings.include_subfolders { None } else { Some(SHALLOW_DEPTH) };
        let walker = WalkBuilder::new(dir)
            .standard_filters(false)
            .follow_links(false)
            .max_depth(max_depth)
            .sort_by_file_name(|a, b| a.cmp(b))
            .build();

        walker
            .filter_map(|result| match result {
                Ok(entry) => Some(entry),
                Err(err) => {
                    tracing::debug!(?err, "Failed to read directory entry");
                    None
                }
            })
            .filter(|entry| entry.file_type().is_some_and(|ft| ft.is_file()))
            .filter_map(|entry| entry.path().strip_prefix(dir).ok().map(Path::to_path_buf))
            .filter(|relative_path| !ignore_set.is_match(relative_path))
            .collect()
    }

    /// Parses one file and records it; failures are logged and skipped.
    async fn load_file(&mut self, dir: &Path, relative_path: &Path) {
        let Some(matched) = self.path_matcher.match_path(relative_path) else {
            tracing::info!(path = %relative_path.display(), "No path pattern matched, skipped");
            return;
        };

        let locale = matched.locale.unwrap_or_else(|| self.settings.source_language.clone());
        if locale.is_empty() {
            return;
        }
        let namespace = matched.namespace.unwrap_or_default();
        if namespace == INDEX_NAMESPACE {
            tracing::debug!(path = %relative_path.display(), "Index file skipped");
            return;
        }

        let ext = relative_path.extension().and_then(|e| e.to_str()).unwrap_or_default();
        let Some(parser) = self.registry.for_extension(ext) else {
            tracing::debug!(path = %relative_path.display(), "No parser for extension, skipped");
            return;
        };

        let filepath = dir.join(relative_path);
        let content = match tokio::fs::read_to_string(&filepath).await {
            Ok(content) => content,
            Err(e) => {
                tracing::error!("{}", CatalogError::Read { path: filepath, source: e });
                return;
            }
        };
        let value = match parser.parse(&content) {
            Ok(value) => value,
            Err(e) => {
                tracing::error!("{}", CatalogError::Parse { path: filepath, source: e });
                return;
            }
        };

        let entry = LocaleEntry {
            value: flat::flatten(&value, &self.settings.key_separator),
            filepath,
            dirpath: dir.to_path_buf(),
            locale,
            namespace,
            matcher: matched.matcher,
        };
        tracing::debug!(
            path = %entry.filepath.display(),
            locale = %entry.locale,
            namespace = %entry.namespace,
            keys = entry.value.len(),
            "Locale file loaded"
        );

        match self.files.iter_mut().find(|f| f.filepath == entry.filepath) {
            Some(existing) => *existing = entry,
            None => self.files.push(entry),
        }
    }

    /// Rebuilds the per-locale catalogs from the loaded files.
    ///
    /// Later files overwrite earlier ones key by key.
    pub fn assemble(&mut self) {
        let mut locales: BTreeMap<String, LocaleCatalog> = BTreeMap::new();
        for file in &self.files {
            let name = if self.settings.namespace { file.namespace.as_str() } else { "" };
            let catalog =
                locales.entry(file.locale.clone()).or_insert_with(|| LocaleCatalog::new(&file.locale));
            let namespace = catalog.namespace_mut(name);
            namespace.files.push(file.filepath.clone());
            namespace.values.extend(file.value.iter().map(|(k, v)| (k.clone(), v.clone())));
            namespace.origins.insert(file.filepath.clone(), file.value.clone());
        }
        self.catalog = FlattenedCatalog { locales };
    }

    #[must_use]
    pub fn locale_dirs(&self) -> &[PathBuf] {
        &self.locale_dirs
    }

    #[must_use]
    pub fn files(&self) -> &[LocaleEntry] {
        &self.files
    }

    #[must_use]
    pub const fn catalog(&self) -> &FlattenedCatalog {
        &self.catalog
    }

    /// Directory new namespaces are written under.
    #[must_use]
    pub fn output_root(&self) -> PathBuf {
        if let Some(dir) = self.locale_dirs.first() {
            return dir.clone();
        }
        self.settings
            .locales_paths
            .iter()
            .find(|p| !p.contains(['*', '?', '[', '{']))
            .map_or_else(|| self.workspace_root.join("locales"), |p| self.workspace_root.join(p))
    }

    /// Key resolver over `locale`, created empty when the locale has no files.
    pub fn language_map(&mut self, locale: &str) -> LanguageMap<'_> {
        let output_root = self.output_root();
        let catalog = self
            .catalog
            .locales
            .entry(locale.to_string())
            .or_insert_with(|| LocaleCatalog::new(locale));
        LanguageMap::new(catalog, self.settings, self.registry, &self.path_matcher, output_root)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::fs;

    use googletest::prelude::*;
    use rstest::*;
    use serde_json::{
        Value,
        json,
    };
    use tempfile::TempDir;

    use super::*;

    fn text<'a>(flat: &'a FlatMap, key: &str) -> Option<&'a str> {
        flat.get(key).and_then(Value::as_str)
    }

    fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[fixture]
    fn workspace() -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        write(root, "locales/en/common.json", r#"{"hello": "Hello", "nested": {"bye": "Bye"}}"#);
        write(root, "locales/en/errors.json", r#"{"notFound": "Not found"}"#);
        write(root, "locales/zh/common.js", "export default {\n  hello: '你好',\n}\n");
        write(root, "locales/zh/index.js", "export default {}\n");
        write(root, "locales/zh/README.md", "# notes");
        write(root, "node_modules/pkg/locales/en/common.json", r#"{"x": "y"}"#);
        temp_dir
    }

    #[rstest]
    #[tokio::test]
    async fn test_init_loads_and_assembles_catalog(workspace: TempDir) {
        let settings = I18nSettings::default();
        let registry = ParserRegistry::new();
        let mut loader = LocaleLoader::new(workspace.path(), &settings, &registry).unwrap();

        loader.init().await.unwrap();

        assert_eq!(loader.locale_dirs(), [workspace.path().join("locales")]);
        assert_that!(loader.files(), len(eq(3)));

        let en = loader.catalog().flattened("en", ".");
        assert_that!(text(&en, "common.hello"), some(eq("Hello")));
        assert_that!(text(&en, "common.nested.bye"), some(eq("Bye")));
        assert_that!(text(&en, "errors.notFound"), some(eq("Not found")));

        let zh = loader.catalog().locale("zh").unwrap();
        assert_that!(zh.namespaces, len(eq(1)));
        assert_that!(text(&zh.namespaces[0].values, "hello"), some(eq("你好")));
    }

    #[rstest]
    #[tokio::test]
    async fn test_namespaces_keep_first_seen_order(workspace: TempDir) {
        let settings = I18nSettings::default();
        let registry = ParserRegistry::new();
        let mut loader = LocaleLoader::new(workspace.path(), &settings, &registry).unwrap();

        loader.init().await.unwrap();

        let en = loader.catalog().locale("en").unwrap();
        let names: Vec<&str> = en.namespaces.iter().map(|ns| ns.name.as_str()).collect();
        assert_eq!(names, vec!["common", "errors"]);
    }

    #[rstest]
    #[tokio::test]
    async fn test_later_files_overlay_earlier_ones() {
        let temp_dir = TempDir::new().unwrap();
        write(temp_dir.path(), "locales/en/common.json", r#"{"a": "old", "b": "kept"}"#);
        write(temp_dir.path(), "src/locales/en/common.json", r#"{"a": "new"}"#);
        let settings = I18nSettings::default();
        let registry = ParserRegistry::new();
        let mut loader = LocaleLoader::new(temp_dir.path(), &settings, &registry).unwrap();

        loader.init().await.unwrap();

        let common = loader.catalog().locale("en").unwrap().namespace("common").unwrap();
        assert_that!(common.files, len(eq(2)));
        assert_that!(text(&common.values, "a"), some(eq("new")));
        assert_that!(text(&common.values, "b"), some(eq("kept")));
        assert_eq!(
            common.origins.get(&temp_dir.path().join("locales/en/common.json")),
            Some(&FlatMap::from([("a".to_string(), json!("old")), ("b".to_string(), json!("kept"))]))
        );
        assert_eq!(
            common.origins.get(&temp_dir.path().join("src/locales/en/common.json")),
            Some(&FlatMap::from([("a".to_string(), json!("new"))]))
        );
        assert_that!(common.minted(), is_empty());
    }

    #[rstest]
    #[tokio::test]
    async fn test_missing_roots_yield_empty_catalog() {
        let temp_dir = TempDir::new().unwrap();
        let settings = I18nSettings::default();
        let registry = ParserRegistry::new();
        let mut loader = LocaleLoader::new(temp_dir.path(), &settings, &registry).unwrap();

        loader.init().await.unwrap();

        assert_that!(loader.locale_dirs(), is_empty());
        assert_that!(loader.catalog().locales, is_empty());
        assert_eq!(loader.output_root(), temp_dir.path().join("locales"));
    }

    #[rstest]
    #[tokio::test]
    async fn test_depth_limit_unless_subfolders() {
        let temp_dir = TempDir::new().unwrap();
        write(temp_dir.path(), "locales/en/admin/users.json", r#"{"title": "Users"}"#);
        let registry = ParserRegistry::new();

        let shallow = I18nSettings::default();
        let mut loader = LocaleLoader::new(temp_dir.path(), &shallow, &registry).unwrap();
        loader.init().await.unwrap();
        assert_that!(loader.files(), is_empty());

        let deep = I18nSettings { include_subfolders: true, ..I18nSettings::default() };
        let mut loader = LocaleLoader::new(temp_dir.path(), &deep, &registry).unwrap();
        loader.init().await.unwrap();
        assert_that!(
            text(&loader.catalog().flattened("en", "."), "admin.users.title"),
            some(eq("Users"))
        );
    }

    #[rstest]
    #[tokio::test]
    async fn test_single_file_locales_and_ignore_files() {
        let temp_dir = TempDir::new().unwrap();
        write(temp_dir.path(), "lang/en.json", r#"{"hi": "Hi"}"#);
        write(temp_dir.path(), "lang/fr.json", r#"{"hi": "Salut"}"#);
        write(temp_dir.path(), "lang/broken.json", "{ not json");
        let settings = I18nSettings {
            locales_paths: vec!["lang".to_string()],
            namespace: false,
            ignore_files: vec!["fr.json".to_string()],
            ..I18nSettings::default()
        };
        let registry = ParserRegistry::new();
        let mut loader = LocaleLoader::new(temp_dir.path(), &settings, &registry).unwrap();

        loader.init().await.unwrap();

        assert_eq!(
            loader.catalog().flattened("en", "."),
            FlatMap::from([("hi".to_string(), json!("Hi"))])
        );
        assert_that!(loader.catalog().locale("fr"), none());
    }

    #[rstest]
    #[tokio::test]
    async fn test_dot_means_workspace_root() {
        let temp_dir = TempDir::new().unwrap();
        write(temp_dir.path(), "en/common.json", r#"{"ok": "OK"}"#);
        let settings = I18nSettings { locales_paths: vec![".".to_string()], ..I18nSettings::default() };
        let registry = ParserRegistry::new();
        let mut loader = LocaleLoader::new(temp_dir.path(), &settings, &registry).unwrap();

        loader.init().await.unwrap();

        assert_eq!(loader.locale_dirs(), [temp_dir.path().to_path_buf()]);
        assert_that!(text(&loader.catalog().flattened("en", "."), "common.ok"), some(eq("OK")));
    }

    #[rstest]
    #[tokio::test]
    async fn test_language_map_for_unknown_locale_starts_empty(workspace: TempDir) {
        let settings = I18nSettings::default();
        let registry = ParserRegistry::new();
        let mut loader = LocaleLoader::new(workspace.path(), &settings, &registry).unwrap();
        loader.init().await.unwrap();

        let map = loader.language_map("fr");

        assert_that!(map.lookup("common.hello"), none());
    }
}
