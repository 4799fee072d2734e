//! Key minting for new catalog entries.

use std::fmt;

use rand::Rng;
use rand::distributions::Alphanumeric;

pub const KEY_PREFIX: &str = "trans_";
pub const RANDOM_KEY_LENGTH: usize = 8;
/// Longest slug kept from a translated text.
const MAX_SLUG_LENGTH: usize = 32;

/// Random ASCII alphanumeric identifier.
#[must_use]
pub fn random_id(length: usize) -> String {
    rand::thread_rng().sample_iter(&Alphanumeric).take(length).map(char::from).collect()
}

/// Produces candidate keys; the caller rejects collisions and asks again.
pub trait KeyGenerator: fmt::Debug {
    fn generate(&mut self, text: &str) -> String;
}

/// `trans_` followed by eight random alphanumerics.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomKeyGenerator;

impl KeyGenerator for RandomKeyGenerator {
    fn generate(&mut self, _text: &str) -> String {
        format!("{KEY_PREFIX}{}", random_id(RANDOM_KEY_LENGTH))
    }
}

/// Derives keys from a caller-supplied translation of the text.
///
/// Falls back to a random key when the function yields nothing usable.
pub struct TranslatingKeyGenerator<F> {
    /// Text → English (or any ASCII) rendering.
    translate: F,
    /// Used when the hook gives nothing.
    fallback: RandomKeyGenerator,
}

impl<F> TranslatingKeyGenerator<F>
where
    F: FnMut(&str) -> Option<String>,
{
    pub const fn new(translate: F) -> Self {
        Self { translate, fallback: RandomKeyGenerator }
    }
}

impl<F> fmt::Debug for TranslatingKeyGenerator<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TranslatingKeyGenerator").finish_non_exhaustive()
    }
}

impl<F> KeyGenerator for TranslatingKeyGenerator<F>
where
    F: FnMut(&str) -> Option<String>,
{
    fn generate(&mut self, text: &str) -> String {
        let slug = (self.translate)(text).map(|t| slugify(&t)).unwrap_or_default();
        if slug.is_empty() {
            tracing::debug!("Translation hook gave no usable key, using a random one");
            return self.fallback.generate(text);
        }
        format!("{KEY_PREFIX}{slug}")
    }
}

/// Lowercase ASCII words joined by `_`.
fn slugify(text: &str) -> String {
    let mut slug = String::new();
    for ch in text.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('_') {
            slug.push('_');
        }
        if slug.len() >= MAX_SLUG_LENGTH {
            break;
        }
    }
    slug.trim_end_matches('_').to_string()
}
