//! Capitalization classes and locale aware case mapping
//!
//! Dictionaries store words in their canonical casing (“Germans”, “NASA”,
//! “hello”), so lookups retry a typed word under a few normalized variants.
//! Everything here is pure and can be called from any thread.

use crate::locale::Locale;

/// How a word is capitalized, as typed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capitalization {
	/// First letter is lowercase (“foo”, also “fooBar”)
	None,
	/// Only the initial letter is capitalized (“Foo”)
	First,
	/// Every letter is capitalized (“FOO”, “IT'S”)
	All,
	/// Capitalized initial with more capitals further in (“FooBar”)
	///
	/// Behaves as [`Capitalization::None`] when looking for variants
	Mixed,
}

impl Capitalization {
	/// Classify a literal word
	///
	/// Leading characters that are not letters are skipped, and characters
	/// that are not letters never count against [`Capitalization::All`], so
	/// that “'TIS” or “FULL-TIME” are all caps.
	#[must_use]
	pub fn classify(word: &str) -> Self {
		let mut letters = word.chars().filter(|c| c.is_alphabetic());

		match letters.next() {
			Some(first) if first.is_uppercase() => {}
			_ => return Self::None,
		}

		let (letters, capitals) = letters.fold((1_usize, 1_usize), |(letters, capitals), c| {
			(letters + 1, capitals + usize::from(c.is_uppercase()))
		});

		match capitals {
			1 => Self::First,
			capitals if capitals == letters => Self::All,
			_ => Self::Mixed,
		}
	}

	/// Whether lowercased variants are worth looking up
	#[must_use]
	pub const fn has_variants(self) -> bool {
		matches!(self, Self::First | Self::All)
	}
}

/// Lowercase a whole word following the locale rules
#[must_use]
pub fn lower(word: &str, locale: &Locale) -> String {
	if locale.has_turkic_casing() {
		word.chars()
			.map(|c| match c {
				'I' => 'ı',
				'İ' => 'i',
				c => c,
			})
			.collect::<String>()
			.to_lowercase()
	} else {
		word.to_lowercase()
	}
}

/// Uppercase a whole word following the locale rules
#[must_use]
pub fn upper(word: &str, locale: &Locale) -> String {
	word.chars().map(|c| upper_char(c, locale)).collect()
}

/// Uppercase the first character and lowercase the rest (“GERMANS” to “Germans”)
#[must_use]
pub fn capitalize_first_lower_rest(word: &str, locale: &Locale) -> String {
	let mut chars = word.chars();
	chars.next().map_or_else(String::new, |first| {
		let mut capitalized = upper_char(first, locale);
		capitalized.push_str(&lower(chars.as_str(), locale));
		capitalized
	})
}

/// Uppercase mapping of a single character, which may expand (`ß` to `SS`)
fn upper_char(c: char, locale: &Locale) -> String {
	match c {
		'i' if locale.has_turkic_casing() => "İ".to_owned(),
		c => c.to_uppercase().collect(),
	}
}
