//! Find-or-create key resolution over one locale, and writing it back.

use std::collections::hash_map::Entry;
use std::collections::{
    BTreeSet,
    HashMap,
};
use std::ffi::OsStr;
use std::fmt;
use std::path::{
    Path,
    PathBuf,
};

use serde_json::Value;

use super::error::CatalogError;
use super::flat::{
    self,
    FlatMap,
};
use super::keygen::{
    KeyGenerator,
    RandomKeyGenerator,
};
use super::loader::{
    LocaleCatalog,
    NamespaceCatalog,
};
use super::parser::ParserRegistry;
use super::template;
use crate::config::{
    I18nSettings,
    OutputFormat,
    PathMatcher,
};
use crate::fsutil;

/// Attempts at minting a key before giving up on a namespace.
pub const MAX_MINT_ATTEMPTS: usize = 16;

/// The sole mutable handle on a locale's catalog while sources are rewritten.
pub struct LanguageMap<'a> {
    /// Catalog of the locale being resolved against.
    catalog: &'a mut LocaleCatalog,
    /// Project settings.
    settings: &'a I18nSettings,
    /// Serializers for emitted files.
    registry: &'a ParserRegistry,
    /// Used to warn about new files that would not load back.
    path_matcher: &'a PathMatcher,
    /// Directory new namespaces are written under.
    output_root: PathBuf,
    /// Canonical text → full key.
    reverse_index: HashMap<String, String>,
    /// Canonical texts held by more than one key.
    ambiguous: Vec<String>,
    /// Source of new keys.
    key_generator: Box<dyn KeyGenerator>,
    /// Namespaces that gained keys.
    dirty: BTreeSet<String>,
}

impl fmt::Debug for LanguageMap<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LanguageMap")
            .field("locale", &self.catalog.locale)
            .field("output_root", &self.output_root)
            .field("keys", &self.reverse_index.len())
            .field("key_generator", &self.key_generator)
            .field("dirty", &self.dirty)
            .finish_non_exhaustive()
    }
}

impl<'a> LanguageMap<'a> {
    pub fn new(
        catalog: &'a mut LocaleCatalog,
        settings: &'a I18nSettings,
        registry: &'a ParserRegistry,
        path_matcher: &'a PathMatcher,
        output_root: PathBuf,
    ) -> Self {
        let separator = settings.key_separator.as_str();
        let mut reverse_index = HashMap::new();
        let mut ambiguous = Vec::new();

        for namespace in &catalog.namespaces {
            for (key, value) in &namespace.values {
                let Some(text) = value.as_str() else {
                    continue;
                };
                let full_key = flat::join_key(&namespace.name, key, separator);
                match reverse_index.entry(template::canonicalize(text).text) {
                    Entry::Vacant(slot) => {
                        slot.insert(full_key);
                    }
                    Entry::Occupied(existing) => {
                        tracing::debug!(
                            kept = %existing.get(),
                            shadowed = %full_key,
                            "Text already mapped to another key"
                        );
                        if !ambiguous.contains(existing.key()) {
                            ambiguous.push(existing.key().clone());
                        }
                    }
                }
            }
        }

        if !ambiguous.is_empty() {
            tracing::warn!(
                locale = %catalog.locale,
                count = ambiguous.len(),
                "Some texts map to more than one key, the first namespace wins"
            );
        }

        Self {
            catalog,
            settings,
            registry,
            path_matcher,
            output_root,
            reverse_index,
            ambiguous,
            key_generator: Box::new(RandomKeyGenerator),
            dirty: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn with_key_generator(mut self, key_generator: Box<dyn KeyGenerator>) -> Self {
        self.key_generator = key_generator;
        self
    }

    #[must_use]
    pub fn locale(&self) -> &str {
        &self.catalog.locale
    }

    /// Canonical texts that more than one key maps to.
    #[must_use]
    pub fn ambiguous_values(&self) -> &[String] {
        &self.ambiguous
    }

    /// Namespaces that gained keys since the last [`Self::emit_dirty`].
    #[must_use]
    pub const fn dirty_namespaces(&self) -> &BTreeSet<String> {
        &self.dirty
    }

    /// Text stored under a full key; `None` for missing and non-string leaves.
    #[must_use]
    pub fn lookup(&self, full_key: &str) -> Option<&str> {
        let separator = self.settings.key_separator.as_str();
        self.catalog.namespaces.iter().find_map(|namespace| {
            let key = if namespace.name.is_empty() {
                full_key
            } else {
                full_key.strip_prefix(namespace.name.as_str())?.strip_prefix(separator)?
            };
            namespace.values.get(key).and_then(Value::as_str)
        })
    }

    /// Returns the key of `literal`, minting one when the text is new.
    ///
    /// Placeholders are canonicalized before the lookup, so `Hello {{name}}`
    /// and `Hello ${name}` share a key.
    pub fn find_or_create_key(
        &mut self,
        namespace_hint: Option<&str>,
        literal: &str,
    ) -> Result<String, CatalogError> {
        let canonical = template::canonicalize(literal).text;
        if let Some(key) = self.reverse_index.get(&canonical) {
            return Ok(key.clone());
        }

        let settings = self.settings;
        let separator = settings.key_separator.as_str();
        let hint = namespace_hint.filter(|h| !h.is_empty());
        let (slot, prefix) = if settings.namespace {
            (settings.namespace_for(hint, &self.catalog.locale).to_string(), None)
        } else {
            (String::new(), hint)
        };

        let namespace = self.catalog.namespace_mut(&slot);
        let key = mint_key(namespace, self.key_generator.as_mut(), &canonical, prefix, separator)
            .ok_or_else(|| CatalogError::KeyExhausted {
                namespace: slot.clone(),
                attempts: MAX_MINT_ATTEMPTS,
            })?;
        namespace.values.insert(key.clone(), Value::String(canonical.clone()));

        let full_key = flat::join_key(&slot, &key, separator);
        tracing::debug!(key = %full_key, text = %canonical, "Minted new key");
        self.reverse_index.insert(canonical, full_key.clone());
        self.dirty.insert(slot);
        Ok(full_key)
    }

    /// Writes the selected namespaces (all when `namespace` is `None`).
    ///
    /// Every origin file of a namespace is rewritten with its own keys.
    /// `format` overrides the syntax of the written files.
    pub async fn emit(
        &self,
        namespace: Option<&str>,
        format: Option<OutputFormat>,
    ) -> Result<Vec<PathBuf>, CatalogError> {
        let selected: Vec<&NamespaceCatalog> = self
            .catalog
            .namespaces
            .iter()
            .filter(|ns| namespace.is_none_or(|name| ns.name == name))
            .collect();
        if selected.is_empty() {
            tracing::warn!(namespace = ?namespace, locale = %self.catalog.locale, "Nothing to emit");
        }

        let mut written = Vec::with_capacity(selected.len());
        for ns in selected {
            for (path, values) in self.layout(ns, format) {
                written.push(self.write_file(&ns.name, path, &values).await?);
            }
        }
        Ok(written)
    }

    /// Writes the file receiving new keys of each namespace that gained some,
    /// then clears the dirty set.
    pub async fn emit_dirty(&mut self) -> Result<Vec<PathBuf>, CatalogError> {
        let mut written = Vec::with_capacity(self.dirty.len());
        for name in &self.dirty {
            let Some(ns) = self.catalog.namespace(name) else {
                continue;
            };
            if let Some((path, values)) = self.layout(ns, None).into_iter().next() {
                written.push(self.write_file(name, path, &values).await?);
            }
        }
        self.dirty.clear();
        Ok(written)
    }

    /// Destination files of a namespace, each with the keys it holds.
    ///
    /// Origin files get back exactly what they were loaded with; keys minted
    /// since go to the first one. A namespace without files gets a new one.
    fn layout(&self, ns: &NamespaceCatalog, format: Option<OutputFormat>) -> Vec<(PathBuf, FlatMap)> {
        if ns.files.is_empty() {
            return vec![(self.new_destination(ns, format), ns.values.clone())];
        }

        let mut minted = Some(ns.minted());
        ns.files
            .iter()
            .map(|origin| {
                let mut values = ns.origins.get(origin).cloned().unwrap_or_default();
                if let Some(minted) = minted.take() {
                    values.extend(minted);
                }
                (with_format(origin, format), values)
            })
            .collect()
    }

    /// Serializes `values` into `path`, replacing it.
    async fn write_file(
        &self,
        namespace: &str,
        path: PathBuf,
        values: &FlatMap,
    ) -> Result<PathBuf, CatalogError> {
        let ext = path.extension().and_then(OsStr::to_str).unwrap_or_default();
        let parser = self
            .registry
            .for_extension(ext)
            .ok_or_else(|| CatalogError::UnsupportedFormat(ext.to_string()))?;

        let value = flat::unflatten(values, &self.settings.key_separator);
        let text = parser
            .serialize(&value)
            .map_err(|source| CatalogError::Serialize { namespace: namespace.to_string(), source })?;
        fsutil::write_replace(&path, &text)
            .await
            .map_err(|source| CatalogError::Write { path: path.clone(), source })?;

        tracing::info!(path = %path.display(), keys = values.len(), "Locale file written");
        Ok(path)
    }

    /// Path under the output root for a namespace no file holds yet.
    fn new_destination(&self, ns: &NamespaceCatalog, format: Option<OutputFormat>) -> PathBuf {
        let ext = format.unwrap_or(self.settings.output_format).extension();
        let locale = &self.catalog.locale;
        let relative = if ns.name.is_empty() {
            PathBuf::from(format!("{locale}.{ext}"))
        } else {
            let namespace_path = ns.name.replace(self.settings.key_separator.as_str(), "/");
            Path::new(locale).join(format!("{namespace_path}.{ext}"))
        };
        if self.path_matcher.match_path(&relative).is_none() {
            tracing::warn!(
                path = %relative.display(),
                "New locale file does not match any path pattern and will not be loaded back"
            );
        }
        self.output_root.join(relative)
    }
}

/// `origin` with its extension swapped for `format`'s.
fn with_format(origin: &Path, format: Option<OutputFormat>) -> PathBuf {
    match format {
        Some(format) if origin.extension().and_then(OsStr::to_str) != Some(format.extension()) => {
            origin.with_extension(format.extension())
        }
        _ => origin.to_path_buf(),
    }
}

/// Draws keys until one is free in `namespace`, up to [`MAX_MINT_ATTEMPTS`].
fn mint_key(
    namespace: &NamespaceCatalog,
    key_generator: &mut dyn KeyGenerator,
    text: &str,
    prefix: Option<&str>,
    separator: &str,
) -> Option<String> {
    (0..MAX_MINT_ATTEMPTS).find_map(|_| {
        let candidate = key_generator.generate(text);
        let key = prefix.map_or_else(|| candidate.clone(), |p| format!("{p}{separator}{candidate}"));
        if namespace.values.contains_key(&key) {
            tracing::debug!(key = %key, "Key collision, regenerating");
            None
        } else {
            Some(key)
        }
    })
}
