//! Locale catalogs: discovery, parsing, key resolution and write-back.

mod error;
pub mod flat;
pub mod keygen;
mod language;
mod loader;
pub mod parser;
pub mod template;

pub use error::{
    CatalogError,
    ParserError,
};
pub use flat::FlatMap;
pub use keygen::{
    KeyGenerator,
    RandomKeyGenerator,
    TranslatingKeyGenerator,
};
pub use language::{
    LanguageMap,
    MAX_MINT_ATTEMPTS,
};
pub use loader::{
    FlattenedCatalog,
    LocaleCatalog,
    LocaleEntry,
    LocaleLoader,
    NamespaceCatalog,
};
pub use parser::{
    LocaleParser,
    ParserRegistry,
};
