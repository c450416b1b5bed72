//! Splitting text into checkable words

use regex::Regex;
use std::{borrow::Cow, sync::OnceLock};

/// Typographic apostrophe, checked as a plain single quote
pub const APOSTROPHE: char = '\u{2019}';
/// Apostrophe as stored in dictionaries
pub const SINGLE_QUOTE: char = '\u{0027}';

fn word_pattern() -> &'static Regex {
	static WORD: OnceLock<Regex> = OnceLock::new();
	WORD.get_or_init(|| {
		// letters, marks and digits, joined by inner apostrophes or hyphens
		Regex::new(r"[\p{L}\p{M}\p{N}]+(?:['\u{2019}\-][\p{L}\p{M}\p{N}]+)*")
			.expect("word pattern is a valid regex")
	})
}

/// Words of `text`, in order
///
/// Apostrophes and hyphens are only kept between two letters, so quotes and
/// dashes around a word are left out.
pub fn words(text: &str) -> impl Iterator<Item = &str> {
	word_pattern().find_iter(text).map(|m| m.as_str())
}

/// Replace typographic apostrophes with the ones dictionaries use
#[must_use]
pub fn normalize_apostrophes(word: &str) -> Cow<'_, str> {
	if word.contains(APOSTROPHE) {
		Cow::Owned(word.replace(APOSTROPHE, &SINGLE_QUOTE.to_string()))
	} else {
		Cow::Borrowed(word)
	}
}
