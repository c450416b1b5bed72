//! Reference dictionary backend reading plain word lists
//!
//! A word list starts with its number of entries, then holds one entry per
//! line with optional flags and fields:
//!
//! ```text
//! 4
//! hello fq:200
//! world fq:180 bg:hello
//! Germans/N fq:40
//! darn/O fq:10   # potentially offensive
//! ```
//!
//! Flags are `O` for potentially offensive words and `N` for words that are
//! valid but never suggested. `fq` is a frequency from 0 to 255 and `bg`
//! names a word that often comes right before this one.

use crate::{
	casing,
	dictionary::{
		DictionaryFactory, DictionaryOptions, DictionaryResource, OpenError, QueryError,
	},
	keyboard::Proximity,
	locale::Locale,
	session::SessionId,
	suggest::{self, Suggestion, SuggestionQuery, SuggestionResults},
};
use nom::{
	branch::alt,
	bytes::complete::{is_not, tag},
	character::complete::{newline, space0, space1, u64 as u64_p, u8 as u8_p},
	multi::many0,
	sequence::tuple,
	IResult, Parser,
};
use nom_supreme::ParserExt;
use std::{
	collections::{BTreeMap, HashMap},
	fs,
	path::{Path, PathBuf},
	sync::{Mutex, PoisonError},
};

/// Most suggestions returned for a word
pub const MAX_SUGGESTIONS: usize = 18;
/// Highest total edit cost of a suggestion
const MAX_EDIT_COST: f32 = 2.0;
/// Length difference past which no edit sequence fits [`MAX_EDIT_COST`]
const MAX_LENGTH_DIFFERENCE: usize = 2;
/// Score multiplier of a candidate following the previous word
const BIGRAM_BOOST: f64 = 1.5;
/// Name of the contacts list in a dictionary directory
const CONTACTS_FILE: &str = "contacts.dic";

/// One line of a word list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
	word: String,
	frequency: u8,
	offensive: bool,
	never_suggested: bool,
	/// Words this one often follows
	follows: Vec<String>,
}

impl Entry {
	/// Entry without flags nor fields
	#[must_use]
	pub fn new(word: &str) -> Self {
		Self {
			word: word.to_owned(),
			frequency: 0,
			offensive: false,
			never_suggested: false,
			follows: Vec::new(),
		}
	}

	fn from_parts(word: &str, flags: &str, fields: Vec<Field>) -> Self {
		let mut entry = Self::new(word);

		for flag in flags.chars() {
			match flag {
				'O' => entry.offensive = true,
				'N' => entry.never_suggested = true,
				_ => log::debug!("ignoring unknown flag `{flag}` on `{word}`"),
			}
		}

		for field in fields {
			match field {
				Field::Frequency(frequency) => entry.frequency = frequency,
				Field::Follows(previous) => entry.follows.push(previous),
			}
		}

		entry
	}

	/// The word, in its canonical casing
	#[must_use]
	pub fn word(&self) -> &str {
		&self.word
	}

	/// How common the word is, from 0 to 255
	#[must_use]
	pub const fn frequency(&self) -> u8 {
		self.frequency
	}

	/// Whether the word may offend
	#[must_use]
	pub const fn is_offensive(&self) -> bool {
		self.offensive
	}

	/// Whether the word is accepted but never offered as a correction
	#[must_use]
	pub const fn is_never_suggested(&self) -> bool {
		self.never_suggested
	}

	fn follows(&self, previous: &str, locale: &Locale) -> bool {
		let previous = casing::lower(previous, locale);
		self.follows
			.iter()
			.any(|word| casing::lower(word, locale) == previous)
	}
}

/// A parsed word list, indexed by word
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WordList {
	entries: Vec<Entry>,
	index: HashMap<String, usize>,
}

impl WordList {
	/// Parse a word list
	///
	/// # Errors
	///
	/// Will error if the content is not a word list.
	pub fn from_slice(content: &str) -> Result<Self, OpenError> {
		if content.ends_with('\n') {
			WordListParser::parse(content)
		} else {
			WordListParser::parse(&format!("{content}\n"))
		}
	}

	/// Read and parse a word list file
	///
	/// # Errors
	///
	/// Will error if the file cannot be read or is not a word list.
	pub fn file(path: &Path) -> Result<Self, OpenError> {
		Self::from_slice(&fs::read_to_string(path)?)
	}

	fn from_entries(entries: Vec<Entry>) -> Self {
		let mut index = HashMap::with_capacity(entries.len());
		for (position, entry) in entries.iter().enumerate() {
			index.entry(entry.word.clone()).or_insert(position);
		}
		Self { entries, index }
	}

	/// Entry for exactly `word`
	#[must_use]
	pub fn get(&self, word: &str) -> Option<&Entry> {
		self.index.get(word).map(|&position| &self.entries[position])
	}

	/// Whether `word` is listed, as is
	#[must_use]
	pub fn contains(&self, word: &str) -> bool {
		self.index.contains_key(word)
	}

	/// Every entry, in file order
	pub fn entries(&self) -> impl Iterator<Item = &Entry> {
		self.entries.iter()
	}

	/// Number of entries
	#[must_use]
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	/// Whether the list has no entry
	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Field {
	Frequency(u8),
	Follows(String),
}

impl Field {
	fn parse(i: &str) -> IResult<&str, Self> {
		alt((
			tag("fq:").precedes(u8_p).map(Self::Frequency),
			tag("bg:")
				.precedes(is_not(" \t#\n"))
				.map(|word: &str| Self::Follows(word.to_owned())),
		))
		.parse(i)
	}
}

struct WordListParser;

impl WordListParser {
	fn parse(i: &str) -> Result<WordList, OpenError> {
		let parser_err = |e: nom::Err<nom::error::Error<_>>| OpenError::Parser(e.to_string());

		let (i, expected) = u64_p
			.terminated(Self::parse_blank)
			.parse(i)
			.map_err(parser_err)?;
		let (_, lines) = many0(alt((
			Self::parse_entry.map(Some),
			Self::parse_blank.value(None),
		)))
		.all_consuming()
		.parse(i)
		.map_err(parser_err)?;

		let entries = lines.into_iter().flatten().collect::<Vec<_>>();
		if u64::try_from(entries.len()).map_or(true, |found| found != expected) {
			log::warn!(
				"word list announces {expected} entries but holds {}",
				entries.len()
			);
		}

		Ok(WordList::from_entries(entries))
	}

	fn parse_entry(i: &str) -> IResult<&str, Entry> {
		tuple((
			is_not(" \t/#\n"),
			tag("/").precedes(is_not(" \t#\n")).opt(),
			many0(space1.precedes(Field::parse)),
		))
		.terminated(Self::parse_blank)
		.map(|(word, flags, fields)| Entry::from_parts(word, flags.unwrap_or_default(), fields))
		.parse(i)
	}

	/// End of a line, with trailing spaces and comment
	fn parse_blank(i: &str) -> IResult<&str, ()> {
		space0
			.terminated(tag("#").terminated(is_not("\n").opt()).opt())
			.terminated(newline)
			.value(())
			.parse(i)
	}
}

/// Buffers reused by the distance computation of one session
#[derive(Debug, Default)]
struct Scratch {
	rows: [Vec<f32>; 3],
	candidate: Vec<char>,
}

impl Scratch {
	/// Optimal string alignment distance with a custom substitution cost
	///
	/// Insertions, deletions and transpositions cost 1. Gives up as soon as
	/// the distance is known to exceed [`MAX_EDIT_COST`].
	#[allow(clippy::cast_precision_loss)]
	fn distance(&mut self, typed: &[char], substitution: impl Fn(usize, char, char) -> f32) -> Option<f32> {
		let candidate = &self.candidate;
		let width = candidate.len() + 1;
		let [before, previous, current] = &mut self.rows;
		for row in [&mut *before, &mut *previous, &mut *current] {
			row.clear();
			row.resize(width, 0.0);
		}
		for (j, cell) in previous.iter_mut().enumerate() {
			*cell = j as f32;
		}

		for (i, &t) in typed.iter().enumerate() {
			current[0] = (i + 1) as f32;
			let mut row_min = current[0];

			for j in 1..width {
				let c = candidate[j - 1];
				let replace = if t == c { 0.0 } else { substitution(i, t, c) };
				let mut cost = (previous[j - 1] + replace)
					.min(previous[j] + 1.0)
					.min(current[j - 1] + 1.0);
				if i > 0 && j > 1 && t == candidate[j - 2] && typed[i - 1] == c {
					cost = cost.min(before[j - 2] + 1.0);
				}
				current[j] = cost;
				row_min = row_min.min(cost);
			}

			if row_min > MAX_EDIT_COST {
				return None;
			}
			std::mem::swap(before, previous);
			std::mem::swap(previous, current);
		}

		let distance = previous[width - 1];
		(distance <= MAX_EDIT_COST).then_some(distance)
	}
}

/// Dictionary backed by a main word list and an optional contacts list
#[derive(Debug)]
pub struct WordListDictionary {
	locale: Locale,
	main: Option<WordList>,
	contacts: Option<WordList>,
	use_contacts: bool,
	/// One buffer per session id
	scratch: Vec<Mutex<Scratch>>,
}

impl WordListDictionary {
	/// Dictionary over already parsed lists
	#[must_use]
	pub fn new(
		locale: Locale,
		main: WordList,
		contacts: Option<WordList>,
		options: &DictionaryOptions,
	) -> Self {
		Self {
			locale,
			main: Some(main),
			contacts,
			use_contacts: options.use_contacts_dictionary,
			scratch: (0..options.sessions.get())
				.map(|_| Mutex::new(Scratch::default()))
				.collect(),
		}
	}

	/// Lists currently searched, main list first
	fn lists(&self) -> impl Iterator<Item = &WordList> {
		let contacts = self.contacts.as_ref().filter(|_| self.use_contacts);
		self.main.iter().chain(contacts)
	}

	#[allow(clippy::cast_possible_truncation)]
	fn score(&self, entry: &Entry, typed_letters: usize, cost: f32, query: &SuggestionQuery<'_>) -> i32 {
		let letters = typed_letters.min(entry.word.chars().count()).min(20);
		let mut score = f64::from(entry.frequency.max(1))
			* suggest::max_score_for(letters)
			/ suggest::MAX_INITIAL_SCORE
			* 0.5_f64.powf(f64::from(cost));

		let follows_previous = query
			.ngram_context
			.previous_word(0)
			.is_some_and(|previous| entry.follows(previous, &self.locale));
		if follows_previous {
			score *= BIGRAM_BOOST;
		}

		// `i32::MAX` is kept for scores that must not be normalized
		score.min(f64::from(i32::MAX - 1)) as i32
	}

	fn substitution_cost(query: &SuggestionQuery<'_>, index: usize, typed: char, candidate: char) -> f32 {
		if let Some(touch) = query.composed.touch(index) {
			return query
				.keyboard
				.distance_to_key(touch, candidate)
				.map_or(1.0, |distance| (distance / 2.0).clamp(0.25, 1.0));
		}

		match query.keyboard.proximity(typed, candidate) {
			Proximity::Same => 0.0,
			Proximity::Adjacent => 0.5,
			Proximity::Distant | Proximity::Unknown => 1.0,
		}
	}
}

impl DictionaryResource for WordListDictionary {
	fn is_valid_spelling_word(&self, word: &str) -> bool {
		self.lists().any(|list| list.contains(word))
	}

	fn get_suggestions(
		&self,
		query: &SuggestionQuery<'_>,
		session: SessionId,
	) -> Result<SuggestionResults, QueryError> {
		if self.main.is_none() {
			return Err(QueryError::Closed(self.locale.clone()));
		}
		let scratch = self.scratch.get(session.index()).ok_or_else(|| {
			QueryError::Backend(format!(
				"{session} is out of the {} sessions of {}",
				self.scratch.len(),
				self.locale
			))
		})?;
		let mut scratch = scratch.lock().unwrap_or_else(PoisonError::into_inner);

		let typed_word = query.composed.typed_word();
		let lowered = casing::lower(typed_word, &self.locale);
		let typed = lowered.chars().collect::<Vec<_>>();
		let typed_word_valid =
			self.is_valid_spelling_word(typed_word) || self.is_valid_spelling_word(&lowered);

		let mut best = BTreeMap::<&str, i32>::new();
		for entry in self.lists().flat_map(WordList::entries) {
			if entry.never_suggested
				|| (entry.offensive && query.policy.block_potentially_offensive)
				|| entry.word == typed_word
			{
				continue;
			}

			scratch.candidate.clear();
			scratch
				.candidate
				.extend(casing::lower(&entry.word, &self.locale).chars());
			if scratch.candidate.len().abs_diff(typed.len()) > MAX_LENGTH_DIFFERENCE {
				continue;
			}

			let Some(cost) = scratch.distance(&typed, |index, t, c| {
				Self::substitution_cost(query, index, t, c)
			}) else {
				continue;
			};

			let score = self.score(entry, typed.len(), cost, query);
			let kept = best.entry(entry.word.as_str()).or_insert(score);
			*kept = (*kept).max(score);
		}

		let mut candidates = best
			.into_iter()
			.map(|(word, score)| Suggestion {
				word: word.to_owned(),
				score,
			})
			.collect::<Vec<_>>();
		// stable, so equal scores stay in alphabetical order
		candidates.sort_by(|a, b| b.score.cmp(&a.score));
		candidates.truncate(MAX_SUGGESTIONS);

		Ok(SuggestionResults {
			candidates,
			typed_word_valid,
		})
	}

	fn has_initialized_main_dictionary(&self) -> bool {
		self.main.is_some()
	}

	fn set_use_contacts_dictionary(&mut self, enabled: bool) {
		self.use_contacts = enabled;
	}

	fn close(&mut self) {
		log::debug!("releasing word lists of {}", self.locale);
		self.main = None;
		self.contacts = None;
	}
}

#[derive(Debug, Clone)]
enum Source {
	Directory(PathBuf),
	Memory {
		lists: HashMap<Locale, String>,
		contacts: Option<String>,
	},
}

/// Opens [`WordListDictionary`]s from a directory or from memory
///
/// In a directory, the list of a locale is `<locale>.dic`, falling back to
/// `<language>.dic`, and contacts are read from `contacts.dic`.
#[derive(Debug, Clone)]
pub struct WordListFactory {
	source: Source,
}

impl WordListFactory {
	/// Lists are read from files in `dir`
	#[must_use]
	pub fn directory(dir: &Path) -> Self {
		Self {
			source: Source::Directory(dir.to_owned()),
		}
	}

	/// Lists are given as strings, see [`Self::with_list`]
	#[must_use]
	pub fn memory() -> Self {
		Self {
			source: Source::Memory {
				lists: HashMap::new(),
				contacts: None,
			},
		}
	}

	/// Add the list of `locale` to an in-memory factory
	#[must_use]
	pub fn with_list(mut self, locale: Locale, content: &str) -> Self {
		if let Source::Memory { lists, .. } = &mut self.source {
			lists.insert(locale, content.to_owned());
		}
		self
	}

	/// Add the contacts list to an in-memory factory
	#[must_use]
	pub fn with_contacts(mut self, content: &str) -> Self {
		if let Source::Memory { contacts, .. } = &mut self.source {
			*contacts = Some(content.to_owned());
		}
		self
	}

	fn main_list(&self, locale: &Locale) -> Result<WordList, OpenError> {
		let language = Locale::new(locale.language());

		match &self.source {
			Source::Directory(dir) => {
				let path = [locale, &language]
					.into_iter()
					.map(|l| dir.join(format!("{l}.dic")))
					.find(|path| path.is_file())
					.ok_or_else(|| OpenError::Missing(locale.clone()))?;
				log::debug!("reading word list {}", path.display());
				WordList::file(&path)
			}
			Source::Memory { lists, .. } => lists
				.get(locale)
				.or_else(|| lists.get(&language))
				.ok_or_else(|| OpenError::Missing(locale.clone()))
				.and_then(|content| WordList::from_slice(content)),
		}
	}

	fn contacts_list(&self) -> Option<WordList> {
		let contacts = match &self.source {
			Source::Directory(dir) => {
				let path = dir.join(CONTACTS_FILE);
				if !path.is_file() {
					return None;
				}
				WordList::file(&path)
			}
			Source::Memory { contacts, .. } => WordList::from_slice(contacts.as_deref()?),
		};

		contacts
			.map_err(|err| log::warn!("ignoring contacts list: {err}"))
			.ok()
	}
}

impl DictionaryFactory for WordListFactory {
	fn open(
		&self,
		locale: &Locale,
		options: &DictionaryOptions,
	) -> Result<Box<dyn DictionaryResource>, OpenError> {
		let main = self.main_list(locale)?;
		let contacts = self.contacts_list();

		Ok(Box::new(WordListDictionary::new(
			locale.clone(),
			main,
			contacts,
			options,
		)))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{
		keyboard::KeyboardGeometry,
		suggest::{ComposedInput, NgramContext, SuggestionPolicy},
	};

	const ENGLISH: &str = "\
6
# greetings
hello fq:200
help fq:120
hell/N fq:90
world fq:180 bg:hello
darn/O fq:10   # mild
Germans fq:40
";

	fn english() -> Result<WordListDictionary, OpenError> {
		Ok(WordListDictionary::new(
			Locale::new("en"),
			WordList::from_slice(ENGLISH)?,
			Some(WordList::from_slice("1\nZoltan fq:50")?),
			&DictionaryOptions::default(),
		))
	}

	fn suggest(
		dictionary: &WordListDictionary,
		typed: &str,
		previous: &[&str],
	) -> Result<SuggestionResults, QueryError> {
		let composed = ComposedInput::typed(typed);
		let keyboard = KeyboardGeometry::for_layout("qwerty").expect("qwerty is built in");
		let query = SuggestionQuery {
			composed: &composed,
			ngram_context: &NgramContext::from_words(previous),
			keyboard: &keyboard,
			policy: SuggestionPolicy::default(),
		};
		dictionary.get_suggestions(&query, SessionId::new(1))
	}

	#[test]
	fn can_parse_entry() -> Result<(), nom::Err<nom::error::Error<&'static str>>> {
		let (i, entry) = WordListParser::parse_entry("world/ON fq:180 bg:hello  # note\n")?;
		assert_eq!(i, "");
		assert_eq!(
			entry,
			Entry {
				word: "world".into(),
				frequency: 180,
				offensive: true,
				never_suggested: true,
				follows: vec!["hello".into()],
			}
		);
		Ok(())
	}

	#[test]
	fn can_parse_list() -> Result<(), OpenError> {
		let list = WordList::from_slice(ENGLISH)?;
		assert_eq!(list.len(), 6);
		assert!(list.contains("Germans"));
		assert!(!list.contains("germans"));
		assert!(list.get("darn").is_some_and(Entry::is_offensive));
		assert!(list.get("hell").is_some_and(Entry::is_never_suggested));
		assert_eq!(list.get("hello").map(Entry::frequency), Some(200));
		Ok(())
	}

	#[test]
	fn refuses_malformed_lists() {
		assert!(matches!(WordList::from_slice(""), Err(OpenError::Parser(_))));
		assert!(matches!(
			WordList::from_slice("1\nhello fq:300\n"),
			Err(OpenError::Parser(_))
		));
		assert!(matches!(
			WordList::from_slice("1\nhello po:noun\n"),
			Err(OpenError::Parser(_))
		));
	}

	#[test]
	fn weighted_distance() {
		let mut scratch = Scratch::default();
		let mut distance = |typed: &str, candidate: &str| {
			scratch.candidate = candidate.chars().collect();
			scratch.distance(&typed.chars().collect::<Vec<_>>(), |_, _, _| 1.0)
		};

		assert_eq!(distance("helo", "hello"), Some(1.0));
		assert_eq!(distance("hlelo", "hello"), Some(1.0));
		assert_eq!(distance("wrold", "world"), Some(1.0));
		assert_eq!(distance("abc", "xyz"), None);
		assert_eq!(distance("", "ab"), Some(2.0));
	}

	#[test]
	fn suggests_close_frequent_words_first() -> Result<(), Box<dyn std::error::Error>> {
		let dictionary = english()?;
		let results = suggest(&dictionary, "helo", &[])?;

		assert!(!results.typed_word_valid);
		assert_eq!(results.best().map(|s| s.word.as_str()), Some("hello"));
		assert!(results.candidates.iter().any(|s| s.word == "help"));
		assert!(results.candidates.iter().all(|s| s.word != "hell"));
		assert!(results.candidates.len() <= MAX_SUGGESTIONS);
		Ok(())
	}

	#[test]
	fn offensive_words_are_blocked() -> Result<(), Box<dyn std::error::Error>> {
		let dictionary = english()?;
		let results = suggest(&dictionary, "dran", &[])?;
		assert!(results.candidates.iter().all(|s| s.word != "darn"));
		assert!(dictionary.is_valid_spelling_word("darn"));
		Ok(())
	}

	#[test]
	fn previous_word_boosts_bigram() -> Result<(), Box<dyn std::error::Error>> {
		let dictionary = english()?;
		let score_of = |results: &SuggestionResults| {
			results
				.candidates
				.iter()
				.find(|s| s.word == "world")
				.map(|s| s.score)
		};

		let alone = score_of(&suggest(&dictionary, "wrld", &[])?);
		let after_hello = score_of(&suggest(&dictionary, "wrld", &["hello"])?);
		assert!(alone.is_some());
		assert!(after_hello > alone);
		Ok(())
	}

	#[test]
	fn contacts_follow_option() -> Result<(), Box<dyn std::error::Error>> {
		let mut dictionary = english()?;
		assert!(dictionary.is_valid_spelling_word("Zoltan"));

		dictionary.set_use_contacts_dictionary(false);
		assert!(!dictionary.is_valid_spelling_word("Zoltan"));
		assert!(dictionary.is_valid_spelling_word("hello"));
		Ok(())
	}

	#[test]
	fn unknown_session_is_an_error() -> Result<(), OpenError> {
		let dictionary = english()?;
		let composed = ComposedInput::typed("helo");
		let query = SuggestionQuery {
			composed: &composed,
			ngram_context: &NgramContext::empty(),
			keyboard: &KeyboardGeometry::empty(),
			policy: SuggestionPolicy::default(),
		};
		assert!(matches!(
			dictionary.get_suggestions(&query, SessionId::new(2)),
			Err(QueryError::Backend(_))
		));
		Ok(())
	}

	#[test]
	fn closed_dictionary_is_empty() -> Result<(), OpenError> {
		let mut dictionary = english()?;
		dictionary.close();
		assert!(!dictionary.has_initialized_main_dictionary());
		assert!(!dictionary.is_valid_spelling_word("hello"));
		Ok(())
	}

	#[test]
	fn memory_factory_falls_back_to_language() -> Result<(), OpenError> {
		let factory = WordListFactory::memory().with_list(Locale::new("en"), ENGLISH);
		let options = DictionaryOptions::default();

		let dictionary = factory.open(&Locale::new("en").with_region("GB"), &options)?;
		assert!(dictionary.is_valid_spelling_word("hello"));
		assert!(matches!(
			factory.open(&Locale::new("fr"), &options),
			Err(OpenError::Missing(_))
		));
		Ok(())
	}

	#[test]
	fn scratch_follows_session_count() -> Result<(), OpenError> {
		let options = DictionaryOptions {
			sessions: std::num::NonZeroUsize::new(4).expect("4 is not zero"),
			..DictionaryOptions::default()
		};
		let dictionary = WordListFactory::memory()
			.with_list(Locale::new("en"), ENGLISH)
			.open(&Locale::new("en"), &options)?;

		let composed = ComposedInput::typed("helo");
		let keyboard = KeyboardGeometry::empty();
		let query = SuggestionQuery {
			composed: &composed,
			ngram_context: &NgramContext::empty(),
			keyboard: &keyboard,
			policy: SuggestionPolicy::default(),
		};
		assert!(dictionary.get_suggestions(&query, SessionId::new(3)).is_ok());
		assert!(matches!(
			dictionary.get_suggestions(&query, SessionId::new(4)),
			Err(QueryError::Backend(_))
		));
		Ok(())
	}
}
