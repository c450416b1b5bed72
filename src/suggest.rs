//! Suggestion queries, their results, and how results are reported to hosts

use crate::{
	casing::{self, Capitalization},
	keyboard::KeyboardGeometry,
	locale::Locale,
};

/// Number of previous words an [`NgramContext`] remembers
pub const MAX_PREVIOUS_WORDS: usize = 3;

/// Score of a candidate whose first letter was typed
pub(crate) const MAX_INITIAL_SCORE: f64 = 255.0;
/// Growth of the maximum score with each typed letter
pub(crate) const TYPED_LETTER_MULTIPLIER: f64 = 2.0;
/// Bonus for candidates that are whole words
pub(crate) const FULL_WORD_MULTIPLIER: f64 = 2.0;

/// What the user typed, with the touch points when the host knows them
#[derive(Debug, Clone, PartialEq)]
pub struct ComposedInput {
	typed_word: String,
	/// One point per character of `typed_word`, in keyboard pixels
	touches: Option<Vec<(f32, f32)>>,
}

impl ComposedInput {
	/// Input known only by its characters
	#[must_use]
	pub fn typed(word: &str) -> Self {
		Self {
			typed_word: word.to_owned(),
			touches: None,
		}
	}

	/// Input with one touch point per character
	///
	/// Points are dropped when their count does not match the word.
	#[must_use]
	pub fn with_touches(word: &str, touches: Vec<(f32, f32)>) -> Self {
		let touches = (touches.len() == word.chars().count()).then_some(touches);
		if touches.is_none() {
			log::debug!("ignoring touch points that do not match `{word}`");
		}

		Self {
			typed_word: word.to_owned(),
			touches,
		}
	}

	/// The word as typed
	#[must_use]
	pub fn typed_word(&self) -> &str {
		&self.typed_word
	}

	/// Touch point of the `index`th character
	#[must_use]
	pub fn touch(&self, index: usize) -> Option<(f32, f32)> {
		self.touches.as_ref()?.get(index).copied()
	}
}

/// Words preceding the one being checked, most recent first
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NgramContext {
	previous: Vec<String>,
	beginning_of_sentence: bool,
}

impl NgramContext {
	/// No known previous words
	#[must_use]
	pub fn empty() -> Self {
		Self::default()
	}

	/// The checked word starts a sentence
	#[must_use]
	pub fn beginning_of_sentence() -> Self {
		Self {
			previous: Vec::new(),
			beginning_of_sentence: true,
		}
	}

	/// Context from the words typed before, in reading order
	///
	/// Only the last [`MAX_PREVIOUS_WORDS`] words are kept.
	#[must_use]
	pub fn from_words<S: AsRef<str>>(words: &[S]) -> Self {
		Self {
			previous: words
				.iter()
				.rev()
				.take(MAX_PREVIOUS_WORDS)
				.map(|w| w.as_ref().to_owned())
				.collect(),
			beginning_of_sentence: false,
		}
	}

	/// The `n`th word before the checked one, `0` being the closest
	#[must_use]
	pub fn previous_word(&self, n: usize) -> Option<&str> {
		self.previous.get(n).map(String::as_str)
	}

	/// Whether the checked word starts a sentence
	#[must_use]
	pub const fn is_beginning_of_sentence(&self) -> bool {
		self.beginning_of_sentence
	}
}

/// Restrictions applied to every suggestion query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuggestionPolicy {
	/// Never suggest words flagged as potentially offensive
	pub block_potentially_offensive: bool,
}

impl Default for SuggestionPolicy {
	fn default() -> Self {
		Self {
			block_potentially_offensive: true,
		}
	}
}

/// Everything a dictionary needs to rank corrections for a word
#[derive(Debug, Clone, Copy)]
pub struct SuggestionQuery<'a> {
	/// Typed word and touch points
	pub composed: &'a ComposedInput,
	/// Previous words
	pub ngram_context: &'a NgramContext,
	/// Layout the word was typed on, for proximity aware corrections
	pub keyboard: &'a KeyboardGeometry,
	/// Restrictions on returned words
	pub policy: SuggestionPolicy,
}

/// A correction candidate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
	/// Candidate word, in dictionary casing
	pub word: String,
	/// Higher is better, on the scale of [`normalized_score`]
	pub score: i32,
}

/// Ranked candidates for one typed word
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuggestionResults {
	/// Best candidate first
	pub candidates: Vec<Suggestion>,
	/// Whether the typed word is itself in the dictionary
	pub typed_word_valid: bool,
}

impl SuggestionResults {
	/// No candidates, typed word unknown
	#[must_use]
	pub fn empty() -> Self {
		Self::default()
	}

	/// Whether there is no candidate at all
	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.candidates.is_empty()
	}

	/// Highest ranked candidate
	#[must_use]
	pub fn best(&self) -> Option<&Suggestion> {
		self.candidates.first()
	}
}

/// Verdict flags reported to the host for a checked word
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SuggestionAttributes {
	/// Word is valid, nothing to correct
	pub in_dictionary: bool,
	/// Word should be underlined as a typo
	pub looks_like_typo: bool,
	/// Best suggestion is confident enough to be recommended
	pub has_recommended: bool,
}

/// What a host shows for a checked word
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuggestionsInfo {
	/// Verdict
	pub attributes: SuggestionAttributes,
	/// Corrections to offer, cased like the typed word
	pub suggestions: Vec<String>,
}

impl SuggestionsInfo {
	/// Word is valid, no suggestions
	#[must_use]
	pub fn in_dictionary() -> Self {
		Self {
			attributes: SuggestionAttributes {
				in_dictionary: true,
				..SuggestionAttributes::default()
			},
			suggestions: Vec::new(),
		}
	}

	/// Word is unknown and there is nothing to suggest
	#[must_use]
	pub fn not_in_dictionary(report_as_typo: bool) -> Self {
		Self {
			attributes: SuggestionAttributes {
				looks_like_typo: report_as_typo,
				..SuggestionAttributes::default()
			},
			suggestions: Vec::new(),
		}
	}

	/// Classify ranked results for a typed word
	///
	/// At most `max` suggestions are kept, after they are recased like the
	/// typed word and deduplicated. The result is recommended when the best
	/// candidate's [`normalized_score`] reaches `threshold`.
	#[must_use]
	pub fn from_results(
		typed: &str,
		locale: &Locale,
		results: &SuggestionResults,
		threshold: f32,
		max: usize,
	) -> Self {
		if results.typed_word_valid {
			return Self::in_dictionary();
		}

		let capitalization = Capitalization::classify(typed);
		let mut suggestions = Vec::with_capacity(max.min(results.candidates.len()));
		for candidate in &results.candidates {
			if suggestions.len() == max {
				break;
			}
			let word = recase(&candidate.word, capitalization, locale);
			if word != typed && !suggestions.contains(&word) {
				suggestions.push(word);
			}
		}

		let has_recommended = results
			.best()
			.is_some_and(|best| normalized_score(typed, &best.word, best.score) >= threshold);

		Self {
			attributes: SuggestionAttributes {
				in_dictionary: false,
				looks_like_typo: true,
				has_recommended,
			},
			suggestions,
		}
	}
}

/// Apply the capitalization of the typed word to a candidate
fn recase(candidate: &str, capitalization: Capitalization, locale: &Locale) -> String {
	match capitalization {
		Capitalization::All => casing::upper(candidate, locale),
		Capitalization::First if Capitalization::classify(candidate) == Capitalization::None => {
			casing::capitalize_first_lower_rest(candidate, locale)
		}
		_ => candidate.to_owned(),
	}
}

/// Confidence of a correction from `before` to `after`
///
/// Zero means no confidence at all, a correction scored as high as a word of
/// its length can be and needing no edit gets 1.
///
/// The raw score is compared to the best score a word of that length could
/// get, then weighted down by how many edits the correction needs.
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
pub fn normalized_score(before: &str, after: &str, score: i32) -> f32 {
	let before_len = before.chars().count();
	let after_len = after.chars().count();
	if before_len == 0 || after_len == 0 {
		return 0.0;
	}

	let spaces = after.chars().filter(|&c| c == ' ').count();
	if spaces == after_len {
		return 0.0;
	}

	let distance = edit_distance(before, after);
	if score <= 0 || distance >= after_len {
		return 0.0;
	}

	let max_score = if score == i32::MAX {
		f64::from(i32::MAX)
	} else {
		max_score_for(before_len.min(after_len - spaces))
	};
	let weight = 1.0 - distance as f64 / after_len as f64;

	((f64::from(score) / max_score) * weight) as f32
}

/// Best raw score a word matching `letters` typed letters can get
#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
pub(crate) fn max_score_for(letters: usize) -> f64 {
	// past 20 letters the score would not fit an `i32`
	let letters = letters.min(20) as i32;
	MAX_INITIAL_SCORE * TYPED_LETTER_MULTIPLIER.powi(letters) * FULL_WORD_MULTIPLIER
}

/// Levenshtein distance between two words, counted in characters
#[must_use]
pub fn edit_distance(a: &str, b: &str) -> usize {
	let b = b.chars().collect::<Vec<_>>();
	let mut previous = (0..=b.len()).collect::<Vec<_>>();
	let mut current = vec![0; b.len() + 1];

	for (i, ca) in a.chars().enumerate() {
		current[0] = i + 1;
		for (j, &cb) in b.iter().enumerate() {
			let substitution = previous[j] + usize::from(ca != cb);
			current[j + 1] = substitution.min(previous[j + 1] + 1).min(current[j] + 1);
		}
		std::mem::swap(&mut previous, &mut current);
	}

	previous[b.len()]
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn edit_distances() {
		assert_eq!(edit_distance("", ""), 0);
		assert_eq!(edit_distance("", "abc"), 3);
		assert_eq!(edit_distance("helo", "hello"), 1);
		assert_eq!(edit_distance("kitten", "sitting"), 3);
		assert_eq!(edit_distance("flaw", "lawn"), 2);
		assert_eq!(edit_distance("ça", "ca"), 1);
	}

	#[test]
	fn normalized_score_edge_cases() {
		assert!(normalized_score("", "word", 1000).abs() < f32::EPSILON);
		assert!(normalized_score("word", "", 1000).abs() < f32::EPSILON);
		assert!(normalized_score("ab", "  ", 1000).abs() < f32::EPSILON);
		assert!(normalized_score("word", "ward", 0).abs() < f32::EPSILON);
		assert!(normalized_score("abc", "xyz", 1000).abs() < f32::EPSILON);
	}

	#[test]
	#[allow(clippy::cast_possible_truncation)]
	fn normalized_score_is_weighted_by_edits() {
		// a perfect score for five letters, one edit away
		let perfect = max_score_for(4) as i32;
		let score = normalized_score("helo", "hello", perfect);
		assert!((score - 0.8).abs() < 1e-4, "{score}");

		let half = normalized_score("helo", "hello", perfect / 2);
		assert!((half - 0.4).abs() < 1e-4, "{half}");
	}

	#[test]
	fn ngram_context_keeps_closest_words() {
		let context = NgramContext::from_words(&["one", "two", "three", "four"]);
		assert_eq!(context.previous_word(0), Some("four"));
		assert_eq!(context.previous_word(2), Some("two"));
		assert_eq!(context.previous_word(3), None);
		assert!(!context.is_beginning_of_sentence());
		assert!(NgramContext::beginning_of_sentence().is_beginning_of_sentence());
	}

	#[test]
	fn touches_must_match_word() {
		let input = ComposedInput::with_touches("ab", vec![(1.0, 2.0)]);
		assert_eq!(input.touch(0), None);

		let input = ComposedInput::with_touches("ab", vec![(1.0, 2.0), (3.0, 4.0)]);
		assert_eq!(input.touch(1), Some((3.0, 4.0)));
	}

	#[test]
	fn results_are_recased_and_classified() {
		let en = Locale::new("en");
		let results = SuggestionResults {
			candidates: vec![
				Suggestion { word: "hello".into(), score: 100_000 },
				Suggestion { word: "help".into(), score: 10 },
				Suggestion { word: "Hello".into(), score: 5 },
			],
			typed_word_valid: false,
		};

		let info = SuggestionsInfo::from_results("Helo", &en, &results, 0.1, 5);
		assert_eq!(info.suggestions, ["Hello", "Help"]);
		assert!(info.attributes.looks_like_typo);
		assert!(info.attributes.has_recommended);

		let info = SuggestionsInfo::from_results("HELO", &en, &results, 0.1, 1);
		assert_eq!(info.suggestions, ["HELLO"]);

		let info = SuggestionsInfo::from_results("helo", &en, &results, 20.0, 5);
		assert!(!info.attributes.has_recommended);
	}

	#[test]
	fn valid_word_needs_no_suggestions() {
		let results = SuggestionResults {
			candidates: vec![Suggestion { word: "hello".into(), score: 1 }],
			typed_word_valid: true,
		};
		let info = SuggestionsInfo::from_results("hello", &Locale::new("en"), &results, 0.1, 5);
		assert_eq!(info, SuggestionsInfo::in_dictionary());
		assert!(!SuggestionsInfo::not_in_dictionary(false).attributes.looks_like_typo);
	}
}
