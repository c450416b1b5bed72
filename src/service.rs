//! Spell checking entry points offered to hosts
//!
//! Every query holds one [`Gate`] permit while it reads dictionaries, and
//! every reconfiguration holds all of them. A reconfiguration therefore waits
//! for in-flight queries and is never observed half done.
//!
//! Two sets of dictionaries are kept:
//! - a bounded cache for single-locale queries ([`SpellCheckService::get_suggestions`],
//!   [`SpellCheckService::is_valid_word`]),
//! - the dictionaries of the enabled locales, replaced wholesale when the
//!   host reports new locales and large enough to hold all of them.

use crate::{
	cache::{CacheStats, DictionaryCache},
	casing::{self, Capitalization},
	config::Config,
	dictionary::{DictionaryFactory, DictionaryOptions},
	gate::{Gate, GateTimeout, Permit},
	keyboard::KeyboardGeometry,
	locale::Locale,
	session::SessionPool,
	suggest::{
		ComposedInput, NgramContext, SuggestionPolicy, SuggestionQuery, SuggestionResults,
		SuggestionsInfo,
	},
};
use std::{
	num::NonZeroUsize,
	sync::{Arc, Mutex, MutexGuard, PoisonError},
	time::Duration,
};

/// Where the host's current input locales come from
pub trait LocaleSource {
	/// Enabled locales, most preferred first
	fn enabled_locales(&self) -> Vec<Locale>;
}

impl<F: Fn() -> Vec<Locale>> LocaleSource for F {
	fn enabled_locales(&self) -> Vec<Locale> {
		self()
	}
}

impl LocaleSource for [Locale] {
	fn enabled_locales(&self) -> Vec<Locale> {
		self.to_vec()
	}
}

impl LocaleSource for Vec<Locale> {
	fn enabled_locales(&self) -> Vec<Locale> {
		self.clone()
	}
}

/// Enabled locales and their dictionaries, only ever replaced as a whole
struct EnabledLocales {
	locales: Vec<Locale>,
	dictionaries: DictionaryCache,
}

impl EnabledLocales {
	fn new(
		locales: Vec<Locale>,
		factory: &Arc<dyn DictionaryFactory>,
		capacity: NonZeroUsize,
		options: DictionaryOptions,
	) -> Self {
		// every enabled locale stays resident, a multi-locale check must not
		// evict the dictionary it is about to query next
		log::debug!("enabled locales: {}", DisplayLocales(&locales));
		let capacity = match NonZeroUsize::new(locales.len()) {
			Some(needed) if needed > capacity => {
				log::debug!("keeping all {needed} enabled dictionaries resident");
				needed
			}
			_ => capacity,
		};

		Self {
			dictionaries: DictionaryCache::new(Arc::clone(factory), capacity, options),
			locales,
		}
	}
}

struct DisplayLocales<'a>(&'a [Locale]);

impl std::fmt::Display for DisplayLocales<'_> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		if self.0.is_empty() {
			return write!(f, "none");
		}
		for (i, locale) in self.0.iter().enumerate() {
			if i > 0 {
				write!(f, ", ")?;
			}
			write!(f, "{locale}")?;
		}
		Ok(())
	}
}

/// Multi-locale spell checker shared by every thread of a host
pub struct SpellCheckService {
	config: Config,
	policy: SuggestionPolicy,
	factory: Arc<dyn DictionaryFactory>,

	gate: Gate,
	sessions: SessionPool,
	/// Dictionaries for single-locale queries
	cache: DictionaryCache,
	/// Replaced only while every gate permit is held
	enabled: Mutex<Arc<EnabledLocales>>,
}

/// Constructors
impl SpellCheckService {
	/// Service reading dictionaries through `factory`, checking words in the
	/// locales `source` currently enables
	#[must_use]
	pub fn new(
		config: Config,
		factory: Arc<dyn DictionaryFactory>,
		source: &(impl LocaleSource + ?Sized),
	) -> Self {
		let readers = config.max_readers.get();
		let options = DictionaryOptions {
			use_contacts_dictionary: config.use_contacts_dictionary,
			sessions: config.max_readers,
		};
		let enabled = EnabledLocales::new(
			source.enabled_locales(),
			&factory,
			config.cache_capacity,
			options,
		);

		log::info!(
			"spell checker ready with {readers} readers and {} cached dictionaries",
			config.cache_capacity
		);

		Self {
			cache: DictionaryCache::new(Arc::clone(&factory), config.cache_capacity, options),
			enabled: Mutex::new(Arc::new(enabled)),
			gate: Gate::new(readers),
			sessions: SessionPool::new(readers),
			policy: SuggestionPolicy::default(),
			factory,
			config,
		}
	}
}

/// Queries
impl SpellCheckService {
	/// Whether `word` is spelled right in `locale`, as is
	pub fn is_valid_word(&self, locale: &Locale, word: &str) -> bool {
		let _permit = self.gate.acquire();
		self.cache
			.with_dictionary(locale, |dictionary| dictionary.is_valid_spelling_word(word))
	}

	/// Whether `word` is spelled right in one of the enabled locales
	///
	/// Locales are tried in order. In each, the word is looked up as typed,
	/// then lowercased unless it has no capital, then with only its first
	/// letter capitalized if it is all capitals. Dictionaries store words in
	/// their canonical casing, so `GERMANS` is found through `Germans`.
	pub fn is_valid_in_any_enabled_locale(&self, word: &str, capitalization: Capitalization) -> bool {
		let _permit = self.gate.acquire();
		let enabled = self.snapshot();

		for locale in &enabled.locales {
			let found = enabled.dictionaries.with_dictionary(locale, |dictionary| {
				let is_valid = |variant: &str| dictionary.is_valid_spelling_word(variant);

				is_valid(word)
					|| (capitalization.has_variants() && is_valid(&casing::lower(word, locale)))
					|| (capitalization == Capitalization::All
						&& is_valid(&casing::capitalize_first_lower_rest(word, locale)))
			});

			if found {
				log::debug!(target: "multi_locale", "`{word}` is valid in {locale}");
				return true;
			}
		}

		log::debug!(
			target: "multi_locale",
			"`{word}` is unknown to {}",
			DisplayLocales(&enabled.locales)
		);
		false
	}

	/// Rank corrections for `composed` in `locale`
	///
	/// Waits for a permit as long as the configured permit timeout allows.
	/// When it expires, or when the dictionary fails, no suggestion is
	/// returned.
	///
	/// # Panics
	///
	/// Panics if no session id is left although a permit was granted, which
	/// means a session leaked.
	pub fn get_suggestions(
		&self,
		locale: &Locale,
		composed: &ComposedInput,
		ngram_context: &NgramContext,
		keyboard: &KeyboardGeometry,
	) -> SuggestionResults {
		let permit = match self.config.permit_timeout {
			None => self.gate.acquire(),
			Some(timeout) => match self.gate.try_acquire_for(1, timeout) {
				Ok(permit) => permit,
				Err(err) => {
					log::warn!("skipping suggestions for {locale}: {err}");
					return SuggestionResults::empty();
				}
			},
		};

		self.suggest(&permit, locale, composed, ngram_context, keyboard)
	}

	/// Like [`Self::get_suggestions`], waiting at most `timeout` for a permit
	///
	/// # Errors
	///
	/// Returns [`GateTimeout`] when no permit was granted in time.
	///
	/// # Panics
	///
	/// Panics if a session leaked, see [`Self::get_suggestions`].
	pub fn try_get_suggestions(
		&self,
		locale: &Locale,
		composed: &ComposedInput,
		ngram_context: &NgramContext,
		keyboard: &KeyboardGeometry,
		timeout: Duration,
	) -> Result<SuggestionResults, GateTimeout> {
		let permit = self.gate.try_acquire_for(1, timeout)?;
		Ok(self.suggest(&permit, locale, composed, ngram_context, keyboard))
	}

	/// Whether the dictionary of `locale` loaded at least its main word list
	pub fn has_main_dictionary(&self, locale: &Locale) -> bool {
		let _permit = self.gate.acquire();
		self.cache
			.with_dictionary(locale, |dictionary| dictionary.has_initialized_main_dictionary())
	}

	/// What to show the host for `typed`, at most `max` suggestions
	#[must_use]
	pub fn suggestions_info(
		&self,
		typed: &str,
		locale: &Locale,
		results: &SuggestionResults,
		max: usize,
	) -> SuggestionsInfo {
		SuggestionsInfo::from_results(
			typed,
			locale,
			results,
			self.config.recommended_threshold,
			max,
		)
	}

	fn suggest(
		&self,
		_permit: &Permit<'_>,
		locale: &Locale,
		composed: &ComposedInput,
		ngram_context: &NgramContext,
		keyboard: &KeyboardGeometry,
	) -> SuggestionResults {
		let Some(session) = self.sessions.lease() else {
			log::error!(
				"all {} session ids are lent out while holding a permit",
				self.sessions.size()
			);
			panic!("session pool exhausted, a session id leaked");
		};

		let query = SuggestionQuery {
			composed,
			ngram_context,
			keyboard,
			policy: self.policy,
		};

		let results = self
			.cache
			.with_dictionary(locale, |dictionary| dictionary.get_suggestions(&query, session.id()));
		match results {
			Ok(results) => results,
			Err(err) => {
				log::warn!(
					"no suggestions for `{}` in {locale}: {err}",
					composed.typed_word()
				);
				SuggestionResults::empty()
			}
		}
	}
}

/// Reconfiguration, each waits for every in-flight query
impl SpellCheckService {
	/// Close every loaded dictionary
	///
	/// Dictionaries are opened again by the next query that needs them.
	pub fn close_all(&self) {
		let _permit = self.gate.acquire_all();
		self.cache.close_all();
		self.snapshot().dictionaries.close_all();
		log::debug!("closed every dictionary");
	}

	/// Include or leave out the user's contacts, in loaded and future dictionaries
	pub fn set_use_contacts_dictionary(&self, enabled: bool) {
		let _permit = self.gate.acquire_all();
		self.cache.set_option(enabled);
		self.snapshot().dictionaries.set_option(enabled);
		log::debug!("contacts dictionary turned {}", if enabled { "on" } else { "off" });
	}

	/// Read the enabled locales again, returning whether they changed
	///
	/// When they did, the dictionaries of the previous locales are closed and
	/// those of the new ones open lazily.
	pub fn refresh_enabled_locales(&self, source: &(impl LocaleSource + ?Sized)) -> bool {
		let _permit = self.gate.acquire_all();
		let locales = source.enabled_locales();

		let mut enabled = self.enabled();
		if enabled.locales == locales {
			return false;
		}

		enabled.dictionaries.close_all();
		let options = DictionaryOptions {
			use_contacts_dictionary: self.cache.uses_contacts_dictionary(),
			sessions: self.config.max_readers,
		};
		*enabled = Arc::new(EnabledLocales::new(
			locales,
			&self.factory,
			self.config.cache_capacity,
			options,
		));
		true
	}
}

/// Introspection
impl SpellCheckService {
	/// Enabled locales, most preferred first
	pub fn enabled_locales(&self) -> Vec<Locale> {
		self.snapshot().locales.clone()
	}

	/// Normalized score from which a suggestion is recommended
	#[must_use]
	pub const fn recommended_threshold(&self) -> f32 {
		self.config.recommended_threshold
	}

	/// Settings the service was built with
	#[must_use]
	pub const fn config(&self) -> &Config {
		&self.config
	}

	/// Callers waiting for a gate permit
	pub fn waiters(&self) -> usize {
		self.gate.waiting()
	}

	/// Session ids not lent out
	pub fn idle_sessions(&self) -> usize {
		self.sessions.available()
	}

	/// Behavior of the single-locale dictionary cache
	pub fn cache_stats(&self) -> CacheStats {
		self.cache.stats()
	}

	fn snapshot(&self) -> Arc<EnabledLocales> {
		Arc::clone(&self.enabled())
	}

	fn enabled(&self) -> MutexGuard<'_, Arc<EnabledLocales>> {
		self.enabled.lock().unwrap_or_else(PoisonError::into_inner)
	}
}
