//! polyspell
//!
//! Multi-locale spell checking: validity checks across the user's enabled
//! locales and ranked corrections, over dictionaries kept in a small least
//! recently used cache and read by a bounded number of threads at once.
//!
//! Dictionaries are pluggable through [`DictionaryFactory`], a reference
//! backend reading plain word lists is provided in [`WordListFactory`].

mod cache;
pub mod casing;
mod config;
mod dictionary;
mod gate;
pub mod keyboard;
mod locale;
mod service;
mod session;
mod suggest;
pub mod text;
mod wordlist;

pub use cache::{CacheStats, CachedDictionary, DictionaryCache};
pub use casing::Capitalization;
pub use config::{Config, ConfigError};
pub use dictionary::{
	DictionaryFactory, DictionaryOptions, DictionaryResource, OpenError, QueryError,
	UnavailableDictionary,
};
pub use gate::{Gate, GateTimeout, Permit};
pub use keyboard::KeyboardGeometry;
pub use locale::{Locale, LocaleError, Script};
pub use service::{LocaleSource, SpellCheckService};
pub use session::{SessionId, SessionLease, SessionPool};
pub use suggest::{
	edit_distance, normalized_score, ComposedInput, NgramContext, Suggestion,
	SuggestionAttributes, SuggestionPolicy, SuggestionQuery, SuggestionResults, SuggestionsInfo,
};
pub use wordlist::{Entry, WordList, WordListDictionary, WordListFactory, MAX_SUGGESTIONS};
