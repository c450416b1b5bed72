//! Bounded, least recently used cache of per-locale dictionaries
//!
//! Dictionaries are memory heavy, so only a few stay resident. Resolving a
//! locale that is not resident opens its dictionary and evicts the least
//! recently used one, closing it before [`DictionaryCache::resolve`] returns.
//!
//! Every entry carries its own lock: it is held for writing while the
//! dictionary is opened, reconfigured or closed, and for reading while it is
//! queried. A closed dictionary is thus never queried.
//!
//! Evicted entries stay known to the cache until they are closed. A locale
//! resolved again in the meantime closes its evicted dictionary itself before
//! opening a new one, so a locale never has two dictionaries open at once.

use crate::{
	dictionary::{
		DictionaryFactory, DictionaryOptions, DictionaryResource, QueryError,
		UnavailableDictionary,
	},
	locale::Locale,
	session::SessionId,
	suggest::{SuggestionQuery, SuggestionResults},
};
use lru::LruCache;
use std::{
	collections::HashMap,
	num::NonZeroUsize,
	sync::{
		atomic::{AtomicBool, AtomicU64, Ordering},
		Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard,
	},
};

/// Counters describing how the cache behaved
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
	/// Resolves served by a resident dictionary
	pub hits: u64,
	/// Resolves that had to open a dictionary
	pub misses: u64,
	/// Dictionaries closed to make room
	pub evictions: u64,
}

type Entry = Arc<CachedDictionary>;

struct Resident {
	lru: LruCache<Locale, Entry>,
	/// Evicted or drained entries not closed yet
	closing: HashMap<Locale, Entry>,
}

impl Resident {
	/// Forget `entry` as pending once it is closed
	fn closed(&mut self, entry: &Entry) {
		let pending = self.closing.get(&entry.locale);
		if pending.is_some_and(|pending| Arc::ptr_eq(pending, entry)) {
			self.closing.remove(&entry.locale);
		}
	}
}

/// Locale → dictionary cache with a fixed capacity
pub struct DictionaryCache {
	factory: Arc<dyn DictionaryFactory>,
	use_contacts: AtomicBool,
	sessions: NonZeroUsize,
	resident: Mutex<Resident>,

	hits: AtomicU64,
	misses: AtomicU64,
	evictions: AtomicU64,
}

impl DictionaryCache {
	/// Empty cache holding at most `capacity` dictionaries, opened with `options`
	#[must_use]
	pub fn new(
		factory: Arc<dyn DictionaryFactory>,
		capacity: NonZeroUsize,
		options: DictionaryOptions,
	) -> Self {
		Self {
			factory,
			use_contacts: AtomicBool::new(options.use_contacts_dictionary),
			sessions: options.sessions,
			resident: Mutex::new(Resident {
				lru: LruCache::new(capacity),
				closing: HashMap::new(),
			}),
			hits: AtomicU64::new(0),
			misses: AtomicU64::new(0),
			evictions: AtomicU64::new(0),
		}
	}

	/// Dictionary of `locale`, opened if not resident
	///
	/// Opening failures are logged and yield a dictionary reporting itself as
	/// not initialized. The handle may be evicted by later resolves, use
	/// [`Self::with_dictionary`] to query a dictionary that stays open.
	pub fn resolve(&self, locale: &Locale) -> Arc<CachedDictionary> {
		let mut resident = self.resident();
		if let Some(entry) = resident.lru.get(locale) {
			self.hits.fetch_add(1, Ordering::Relaxed);
			return Arc::clone(entry);
		}
		self.misses.fetch_add(1, Ordering::Relaxed);

		// lock the new entry before publishing it, so that concurrent
		// resolves of this locale wait for it to be opened
		let entry = Arc::new(CachedDictionary::loading(locale.clone()));
		let mut state = entry.write_state();
		let previous = resident.closing.get(locale).map(Arc::clone);
		let evicted = resident.lru.push(locale.clone(), Arc::clone(&entry));
		if let Some((evicted_locale, evicted)) = &evicted {
			resident
				.closing
				.insert(evicted_locale.clone(), Arc::clone(evicted));
		}
		drop(resident);

		if let Some((evicted_locale, evicted)) = evicted {
			log::debug!("evicting dictionary for {evicted_locale} to make room for {locale}");
			evicted.close();
			self.resident().closed(&evicted);
			self.evictions.fetch_add(1, Ordering::Relaxed);
		}

		if let Some(previous) = previous {
			log::debug!("waiting for the evicted dictionary of {locale} to close");
			previous.close();
			self.resident().closed(&previous);
		}

		*state = EntryState::Ready(self.open(locale));
		drop(state);

		entry
	}

	/// Run `query` on the open dictionary of `locale`
	///
	/// The dictionary cannot be closed while `query` runs. A handle evicted
	/// between its resolve and the query is resolved again.
	pub fn with_dictionary<R>(
		&self,
		locale: &Locale,
		query: impl FnOnce(&dyn DictionaryResource) -> R,
	) -> R {
		let mut entry = self.resolve(locale);
		loop {
			let state = entry.read_state();
			match &*state {
				EntryState::Ready(resource) => return query(&**resource),
				// opening panicked, open again
				EntryState::Loading => self.forget(&entry),
				EntryState::Closed => {}
			}
			drop(state);

			log::debug!("dictionary for {locale} closed before being queried, resolving again");
			entry = self.resolve(locale);
		}
	}

	/// Close and forget every resident dictionary
	///
	/// Calling this on an empty cache does nothing.
	pub fn close_all(&self) {
		let mut resident = self.resident();
		let mut drained = Vec::with_capacity(resident.lru.len());
		while let Some((locale, entry)) = resident.lru.pop_lru() {
			resident.closing.insert(locale, Arc::clone(&entry));
			drained.push(entry);
		}
		drop(resident);

		if !drained.is_empty() {
			log::debug!("closing {} resident dictionaries", drained.len());
		}
		for entry in drained {
			entry.close();
			self.resident().closed(&entry);
		}
	}

	/// Turn the contacts dictionary on or off, now and for future opens
	pub fn set_option(&self, use_contacts_dictionary: bool) {
		self.use_contacts
			.store(use_contacts_dictionary, Ordering::SeqCst);

		let resident = self
			.resident()
			.lru
			.iter()
			.map(|(_, entry)| Arc::clone(entry))
			.collect::<Vec<_>>();
		for entry in resident {
			entry.set_use_contacts_dictionary(use_contacts_dictionary);
		}
	}

	/// Whether the contacts dictionary is currently on
	pub fn uses_contacts_dictionary(&self) -> bool {
		self.use_contacts.load(Ordering::SeqCst)
	}

	/// Whether `locale` is resident, without touching its recency
	pub fn contains(&self, locale: &Locale) -> bool {
		self.resident().lru.contains(locale)
	}

	/// Number of resident dictionaries
	pub fn len(&self) -> usize {
		self.resident().lru.len()
	}

	/// Whether no dictionary is resident
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Maximum number of resident dictionaries
	pub fn capacity(&self) -> NonZeroUsize {
		self.resident().lru.cap()
	}

	/// Counters since the cache was created
	pub fn stats(&self) -> CacheStats {
		CacheStats {
			hits: self.hits.load(Ordering::Relaxed),
			misses: self.misses.load(Ordering::Relaxed),
			evictions: self.evictions.load(Ordering::Relaxed),
		}
	}

	fn open(&self, locale: &Locale) -> Box<dyn DictionaryResource> {
		let options = DictionaryOptions {
			use_contacts_dictionary: self.uses_contacts_dictionary(),
			sessions: self.sessions,
		};

		match self.factory.open(locale, &options) {
			Ok(resource) => {
				log::debug!("opened dictionary for {locale}");
				resource
			}
			Err(err) => {
				log::warn!("dictionary for {locale} is unavailable: {err}");
				Box::new(UnavailableDictionary::new(locale.clone(), &err))
			}
		}
	}

	/// Drop `entry` from the resident set if it is still there
	fn forget(&self, entry: &Entry) {
		let mut resident = self.resident();
		let current = resident.lru.peek(&entry.locale);
		if current.is_some_and(|current| Arc::ptr_eq(current, entry)) {
			resident.lru.pop(&entry.locale);
		}
	}

	fn resident(&self) -> MutexGuard<'_, Resident> {
		self.resident.lock().unwrap_or_else(PoisonError::into_inner)
	}
}

/// Lifecycle of a cache entry
enum EntryState {
	/// Being opened, only ever seen by a poisoned lock
	Loading,
	/// Open and queryable
	Ready(Box<dyn DictionaryResource>),
	/// Evicted or closed by [`DictionaryCache::close_all`]
	Closed,
}

/// Handle on a dictionary resolved through a [`DictionaryCache`]
///
/// Queries on a handle whose dictionary has since been evicted answer as an
/// unavailable dictionary would, see [`DictionaryCache::with_dictionary`].
pub struct CachedDictionary {
	locale: Locale,
	state: RwLock<EntryState>,
}

impl CachedDictionary {
	fn loading(locale: Locale) -> Self {
		Self {
			locale,
			state: RwLock::new(EntryState::Loading),
		}
	}

	/// Locale of the dictionary
	#[must_use]
	pub const fn locale(&self) -> &Locale {
		&self.locale
	}

	/// See [`DictionaryResource::is_valid_spelling_word`]
	pub fn is_valid_spelling_word(&self, word: &str) -> bool {
		match &*self.read_state() {
			EntryState::Ready(resource) => resource.is_valid_spelling_word(word),
			EntryState::Loading | EntryState::Closed => false,
		}
	}

	/// See [`DictionaryResource::get_suggestions`]
	///
	/// # Errors
	///
	/// Returns [`QueryError::Closed`] when the dictionary was evicted after
	/// being resolved, or whatever the backend fails with.
	pub fn get_suggestions(
		&self,
		query: &SuggestionQuery<'_>,
		session: SessionId,
	) -> Result<SuggestionResults, QueryError> {
		match &*self.read_state() {
			EntryState::Ready(resource) => resource.get_suggestions(query, session),
			EntryState::Loading | EntryState::Closed => Err(QueryError::Closed(self.locale.clone())),
		}
	}

	/// See [`DictionaryResource::has_initialized_main_dictionary`]
	pub fn has_initialized_main_dictionary(&self) -> bool {
		match &*self.read_state() {
			EntryState::Ready(resource) => resource.has_initialized_main_dictionary(),
			EntryState::Loading | EntryState::Closed => false,
		}
	}

	/// Whether the dictionary was closed
	pub fn is_closed(&self) -> bool {
		matches!(*self.read_state(), EntryState::Closed)
	}

	fn set_use_contacts_dictionary(&self, enabled: bool) {
		if let EntryState::Ready(resource) = &mut *self.write_state() {
			resource.set_use_contacts_dictionary(enabled);
		}
	}

	/// Close the dictionary once in-flight queries are done, closing twice is a no-op
	fn close(&self) {
		let mut state = self.write_state();
		if let EntryState::Ready(mut resource) = std::mem::replace(&mut *state, EntryState::Closed) {
			resource.close();
		}
	}

	fn read_state(&self) -> RwLockReadGuard<'_, EntryState> {
		self.state.read().unwrap_or_else(PoisonError::into_inner)
	}

	fn write_state(&self) -> RwLockWriteGuard<'_, EntryState> {
		self.state.write().unwrap_or_else(PoisonError::into_inner)
	}
}
