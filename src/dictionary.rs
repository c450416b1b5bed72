//! Capability interface of per-locale dictionaries
//!
//! The core never looks inside a dictionary. Backends implement
//! [`DictionaryResource`] and are built by a [`DictionaryFactory`]:
//! - [`DictionaryResource::is_valid_spelling_word`]: whether a word is spelled right
//! - [`DictionaryResource::get_suggestions`]: ranked corrections for a typed word
//!
//! Resources are owned by the [`DictionaryCache`](crate::DictionaryCache),
//! which is also the only one to close them.

use crate::{
	config::DEFAULT_MAX_READERS,
	locale::Locale,
	session::SessionId,
	suggest::{SuggestionQuery, SuggestionResults},
};
use std::{io, num::NonZeroUsize};

/// A loaded dictionary for exactly one locale
pub trait DictionaryResource: Send + Sync {
	/// Whether `word` is in the dictionary, as is
	fn is_valid_spelling_word(&self, word: &str) -> bool;

	/// Rank corrections for the composed word of `query`
	///
	/// `session` selects the scratch state to use, no two concurrent calls
	/// share one.
	///
	/// # Errors
	///
	/// Check [`QueryError`] to see the ways a backend can fail.
	fn get_suggestions(
		&self,
		query: &SuggestionQuery<'_>,
		session: SessionId,
	) -> Result<SuggestionResults, QueryError>;

	/// Whether at least one main dictionary was loaded
	fn has_initialized_main_dictionary(&self) -> bool;

	/// Include or leave out words coming from the user's contacts
	fn set_use_contacts_dictionary(&mut self, enabled: bool);

	/// Release loaded data, the resource is never queried afterwards
	fn close(&mut self);
}

/// Options a dictionary is opened with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DictionaryOptions {
	/// Also accept and suggest words from the user's contacts
	pub use_contacts_dictionary: bool,
	/// Number of session ids queries may carry, ids range over `0..sessions`
	pub sessions: NonZeroUsize,
}

impl Default for DictionaryOptions {
	fn default() -> Self {
		Self {
			use_contacts_dictionary: true,
			sessions: DEFAULT_MAX_READERS,
		}
	}
}

/// Builds dictionaries on demand
pub trait DictionaryFactory: Send + Sync {
	/// Load the dictionary of `locale`
	///
	/// # Errors
	///
	/// Check [`OpenError`], a failure degrades the locale to an
	/// [`UnavailableDictionary`].
	fn open(
		&self,
		locale: &Locale,
		options: &DictionaryOptions,
	) -> Result<Box<dyn DictionaryResource>, OpenError>;
}

/// Ways opening a dictionary could go wrong
#[derive(Debug, thiserror::Error)]
pub enum OpenError {
	/// No dictionary is available for the locale
	#[error("no dictionary for locale {0}")]
	Missing(Locale),

	/// Could not parse the dictionary data
	#[error("could not parse dictionary: {0}")]
	Parser(String),

	/// Could not read the dictionary data
	#[error(transparent)]
	Io(#[from] io::Error),
}

/// Ways a query on an open dictionary could go wrong
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
	/// The resource was closed, usually by an eviction racing the query
	#[error("dictionary for {0} is closed")]
	Closed(Locale),

	/// Backend specific failure
	#[error("dictionary query failed: {0}")]
	Backend(String),
}

/// Stand-in for a dictionary that failed to load
///
/// Knows no word and suggests nothing, so that a missing dictionary only
/// degrades its locale.
#[derive(Debug)]
pub struct UnavailableDictionary {
	locale: Locale,
	reason: String,
}

impl UnavailableDictionary {
	/// Record why the dictionary of `locale` is missing
	#[must_use]
	pub fn new(locale: Locale, reason: &OpenError) -> Self {
		Self {
			locale,
			reason: reason.to_string(),
		}
	}

	/// Why the dictionary could not be opened
	#[must_use]
	pub fn reason(&self) -> &str {
		&self.reason
	}
}

impl DictionaryResource for UnavailableDictionary {
	fn is_valid_spelling_word(&self, _word: &str) -> bool {
		false
	}

	fn get_suggestions(
		&self,
		_query: &SuggestionQuery<'_>,
		_session: SessionId,
	) -> Result<SuggestionResults, QueryError> {
		Ok(SuggestionResults::empty())
	}

	fn has_initialized_main_dictionary(&self) -> bool {
		false
	}

	fn set_use_contacts_dictionary(&mut self, _enabled: bool) {}

	fn close(&mut self) {
		log::debug!("closing unavailable dictionary for {}", self.locale);
	}
}
