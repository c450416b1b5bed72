#![allow(dead_code)]

use polyspell::{
	edit_distance, DictionaryFactory, DictionaryOptions, DictionaryResource, Locale, OpenError,
	QueryError, SessionId, Suggestion, SuggestionQuery, SuggestionResults,
};
use std::{
	collections::{HashMap, HashSet},
	sync::{
		atomic::{AtomicUsize, Ordering},
		Arc, Condvar, Mutex,
	},
	thread,
	time::{Duration, Instant},
};

/// Typed word making the mock query fail
pub(crate) const FAILING_WORD: &str = "fail";
/// Typed word making the mock query panic
pub(crate) const PANICKING_WORD: &str = "panic";
/// Typed word making the mock query wait for [`Latch::open`]
pub(crate) const BLOCKING_WORD: &str = "wait";

pub(crate) fn init_logger() {
	let _ = pretty_env_logger::try_init();
}

/// Poll until `condition` holds, failing the test after a few seconds
pub(crate) fn wait_until(condition: impl Fn() -> bool) {
	let start = Instant::now();
	while !condition() {
		assert!(start.elapsed() < Duration::from_secs(5), "condition never held");
		thread::sleep(Duration::from_millis(1));
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Event {
	Open(Locale),
	Close(Locale),
	Lookup(Locale, String),
	Query(Locale, String),
	Contacts(Locale, bool),
}

/// Blocks queries for [`BLOCKING_WORD`] until opened
#[derive(Debug, Default)]
pub(crate) struct Latch {
	open: Mutex<bool>,
	turn: Condvar,
	waiting: AtomicUsize,
}

impl Latch {
	pub(crate) fn open(&self) {
		*self.open.lock().expect("latch poisoned") = true;
		self.turn.notify_all();
	}

	/// Queries currently blocked
	pub(crate) fn waiting(&self) -> usize {
		self.waiting.load(Ordering::SeqCst)
	}

	fn wait(&self) {
		self.waiting.fetch_add(1, Ordering::SeqCst);
		let mut open = self.open.lock().expect("latch poisoned");
		while !*open {
			open = self.turn.wait(open).expect("latch poisoned");
		}
		self.waiting.fetch_sub(1, Ordering::SeqCst);
	}
}

/// What every mock dictionary shares with the test
#[derive(Debug, Default)]
pub(crate) struct Shared {
	events: Mutex<Vec<Event>>,
	sessions_in_use: Mutex<HashSet<SessionId>>,
	pub(crate) latch: Latch,
}

impl Shared {
	pub(crate) fn events(&self) -> Vec<Event> {
		self.events.lock().expect("events poisoned").clone()
	}

	pub(crate) fn count(&self, matches: impl Fn(&Event) -> bool) -> usize {
		self.events().iter().filter(|e| matches(e)).count()
	}

	pub(crate) fn clear(&self) {
		self.events.lock().expect("events poisoned").clear();
	}

	fn record(&self, event: Event) {
		self.events.lock().expect("events poisoned").push(event);
	}
}

/// Factory of in-memory dictionaries recording everything done to them
#[derive(Debug, Default)]
pub(crate) struct MockFactory {
	words: HashMap<Locale, Vec<String>>,
	failing: HashSet<Locale>,
	shared: Arc<Shared>,
}

impl MockFactory {
	pub(crate) fn new() -> Self {
		Self::default()
	}

	pub(crate) fn with_words(mut self, locale: &str, words: &[&str]) -> Self {
		self.words.insert(
			locale.parse().expect("valid locale"),
			words.iter().map(ToString::to_string).collect(),
		);
		self
	}

	pub(crate) fn failing(mut self, locale: &str) -> Self {
		self.failing.insert(locale.parse().expect("valid locale"));
		self
	}

	pub(crate) fn shared(&self) -> Arc<Shared> {
		Arc::clone(&self.shared)
	}
}

impl DictionaryFactory for MockFactory {
	fn open(
		&self,
		locale: &Locale,
		options: &DictionaryOptions,
	) -> Result<Box<dyn DictionaryResource>, OpenError> {
		self.shared.record(Event::Open(locale.clone()));
		if self.failing.contains(locale) {
			return Err(OpenError::Missing(locale.clone()));
		}

		Ok(Box::new(MockDictionary {
			locale: locale.clone(),
			words: self.words.get(locale).cloned().unwrap_or_default(),
			use_contacts: options.use_contacts_dictionary,
			closed: false,
			shared: Arc::clone(&self.shared),
		}))
	}
}

struct MockDictionary {
	locale: Locale,
	words: Vec<String>,
	use_contacts: bool,
	closed: bool,
	shared: Arc<Shared>,
}

impl MockDictionary {
	fn query(&self, typed: &str) -> Result<SuggestionResults, QueryError> {
		match typed {
			FAILING_WORD => return Err(QueryError::Backend("mock failure".into())),
			PANICKING_WORD => panic!("mock panic"),
			BLOCKING_WORD => self.shared.latch.wait(),
			_ => {}
		}

		let candidates = self
			.words
			.iter()
			.filter(|w| edit_distance(typed, w) <= 2)
			.map(|w| Suggestion {
				word: w.clone(),
				score: 1_000_000,
			})
			.collect();
		Ok(SuggestionResults {
			candidates,
			typed_word_valid: self.words.iter().any(|w| w == typed),
		})
	}
}

impl DictionaryResource for MockDictionary {
	fn is_valid_spelling_word(&self, word: &str) -> bool {
		assert!(!self.closed, "closed dictionary for {} was queried", self.locale);
		self.shared.record(Event::Lookup(self.locale.clone(), word.to_owned()));
		self.words.iter().any(|w| w == word)
	}

	fn get_suggestions(
		&self,
		query: &SuggestionQuery<'_>,
		session: SessionId,
	) -> Result<SuggestionResults, QueryError> {
		assert!(!self.closed, "closed dictionary for {} was queried", self.locale);
		let typed = query.composed.typed_word();
		self.shared.record(Event::Query(self.locale.clone(), typed.to_owned()));

		let _in_use = SessionInUse::mark(&self.shared, session);
		self.query(typed)
	}

	fn has_initialized_main_dictionary(&self) -> bool {
		!self.closed
	}

	fn set_use_contacts_dictionary(&mut self, enabled: bool) {
		self.use_contacts = enabled;
		self.shared.record(Event::Contacts(self.locale.clone(), enabled));
	}

	fn close(&mut self) {
		assert!(!self.closed, "dictionary for {} closed twice", self.locale);
		self.closed = true;
		self.shared.record(Event::Close(self.locale.clone()));
	}
}

/// Marks a session as used by a query until dropped, even by a panic
struct SessionInUse<'a> {
	shared: &'a Shared,
	session: SessionId,
}

impl<'a> SessionInUse<'a> {
	fn mark(shared: &'a Shared, session: SessionId) -> Self {
		let fresh = shared.sessions_in_use.lock().expect("sessions poisoned").insert(session);
		assert!(fresh, "{session} used by two queries at once");
		Self { shared, session }
	}
}

impl Drop for SessionInUse<'_> {
	fn drop(&mut self) {
		self.shared
			.sessions_in_use
			.lock()
			.expect("sessions poisoned")
			.remove(&self.session);
	}
}

pub(crate) fn locale(tag: &str) -> Locale {
	tag.parse().expect("valid locale")
}
