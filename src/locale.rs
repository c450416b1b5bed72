//! Locale identifiers used to key dictionaries and pick keyboard layouts
//!
//! A [`Locale`] is parsed from the identifiers input hosts hand out, either
//! underscore separated (`en_US`, `sr_Latn_RS`) or hyphen separated
//! (`pt-BR`). Subtags are normalized so that equal locales compare equal.

use nom::{
	character::complete::{alphanumeric1, one_of},
	multi::separated_list1,
	IResult, Parser,
};
use nom_supreme::ParserExt;
use std::{fmt, str::FromStr};

/// Language, script, region and variant of an input language
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Locale {
	/// Lowercase ISO 639 code (`en`)
	language: String,
	/// Titlecase ISO 15924 code (`Latn`)
	script: Option<String>,
	/// Uppercase ISO 3166 code or UN M.49 number (`US`, `419`)
	region: Option<String>,
	/// Anything trailing the region, kept verbatim (`POSIX`)
	variant: Option<String>,
}

/// Ways parsing a [`Locale`] could go wrong
#[derive(Debug, thiserror::Error)]
pub enum LocaleError {
	/// Identifier is empty or contains something else than subtags
	#[error("could not parse locale `{0}`")]
	Malformed(String),

	/// First subtag is not a two or three letter language code
	#[error("`{0}` is not a valid language subtag")]
	Language(String),
}

/// Constructors
impl Locale {
	/// Locale with only a language
	///
	/// The language is lowercased, no validation is done
	#[must_use]
	pub fn new(language: &str) -> Self {
		Self {
			language: language.to_ascii_lowercase(),
			script: None,
			region: None,
			variant: None,
		}
	}

	/// Same locale restricted to a region
	#[must_use]
	pub fn with_region(mut self, region: &str) -> Self {
		self.region = Some(region.to_ascii_uppercase());
		self
	}

	/// Same locale written in an explicit script
	#[must_use]
	pub fn with_script(mut self, script: &str) -> Self {
		self.script = Some(titlecase_ascii(script));
		self
	}
}

/// Accessors
impl Locale {
	/// Lowercase language code
	#[must_use]
	pub fn language(&self) -> &str {
		&self.language
	}

	/// Script subtag, when the identifier carried one
	#[must_use]
	pub fn script_subtag(&self) -> Option<&str> {
		self.script.as_deref()
	}

	/// Region subtag
	#[must_use]
	pub fn region(&self) -> Option<&str> {
		self.region.as_deref()
	}

	/// Variant subtags joined with `_`
	#[must_use]
	pub fn variant(&self) -> Option<&str> {
		self.variant.as_deref()
	}

	/// Writing system this locale is typed in
	///
	/// An explicit script subtag wins, otherwise the language decides and
	/// unknown languages are assumed to be written in latin script.
	#[must_use]
	pub fn script(&self) -> Script {
		self.script.as_deref().map_or_else(
			|| Script::from_language(&self.language),
			Script::from_subtag,
		)
	}

	/// Whether casing follows turkic rules for dotted and dotless `i`
	#[must_use]
	pub fn has_turkic_casing(&self) -> bool {
		matches!(self.language.as_str(), "tr" | "az")
	}
}

impl FromStr for Locale {
	type Err = LocaleError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let (_, subtags) = parse_subtags(s.trim()).map_err(|_| LocaleError::Malformed(s.to_owned()))?;
		let mut subtags = subtags.into_iter().peekable();

		let language = subtags
			.next()
			.ok_or_else(|| LocaleError::Malformed(s.to_owned()))?;
		if !(2..=3).contains(&language.len()) || !language.chars().all(|c| c.is_ascii_alphabetic()) {
			return Err(LocaleError::Language(language.to_owned()));
		}
		let mut locale = Self::new(language);

		if let Some(script) = subtags.next_if(|s| is_script_subtag(s)) {
			locale = locale.with_script(script);
		}
		if let Some(region) = subtags.next_if(|s| is_region_subtag(s)) {
			locale = locale.with_region(region);
		}

		let variant = subtags.collect::<Vec<_>>();
		if !variant.is_empty() {
			locale.variant = Some(variant.join("_"));
		}

		Ok(locale)
	}
}

impl fmt::Display for Locale {
	/// Subtags joined with underscores (`sr_Latn_RS`)
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.language)?;
		for subtag in [&self.script, &self.region, &self.variant]
			.into_iter()
			.flatten()
		{
			write!(f, "_{subtag}")?;
		}
		Ok(())
	}
}

/// Splits an identifier on `_` and `-`, refusing anything but ascii alphanumerics
fn parse_subtags(i: &str) -> IResult<&str, Vec<&str>> {
	separated_list1(one_of("_-"), alphanumeric1)
		.all_consuming()
		.parse(i)
}

fn is_script_subtag(s: &str) -> bool {
	s.len() == 4 && s.chars().all(|c| c.is_ascii_alphabetic())
}

fn is_region_subtag(s: &str) -> bool {
	(s.len() == 2 && s.chars().all(|c| c.is_ascii_alphabetic()))
		|| (s.len() == 3 && s.chars().all(|c| c.is_ascii_digit()))
}

fn titlecase_ascii(s: &str) -> String {
	let mut chars = s.chars();
	chars.next().map_or_else(String::new, |first| {
		first.to_ascii_uppercase().to_string() + &chars.as_str().to_ascii_lowercase()
	})
}

/// Writing systems dictionaries and layouts are told apart by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Script {
	/// `Latn`
	Latin,
	/// `Cyrl`
	Cyrillic,
	/// `Grek`
	Greek,
	/// `Hebr`
	Hebrew,
	/// `Arab`
	Arabic,
	/// `Armn`
	Armenian,
	/// `Beng`
	Bengali,
	/// `Geor`
	Georgian,
	/// `Khmr`
	Khmer,
	/// `Laoo`
	Lao,
	/// `Mlym`
	Malayalam,
	/// `Mymr`
	Myanmar,
	/// `Sinh`
	Sinhala,
	/// `Taml`
	Tamil,
	/// `Telu`
	Telugu,
	/// `Thai`
	Thai,
	/// Any script subtag not listed above
	Unknown,
}

impl Script {
	/// Script a language is written in when no subtag says otherwise
	#[must_use]
	pub fn from_language(language: &str) -> Self {
		match language {
			"ar" => Self::Arabic,
			"hy" => Self::Armenian,
			"bn" => Self::Bengali,
			"be" | "bg" | "kk" | "ky" | "mk" | "mn" | "ru" | "uk" => Self::Cyrillic,
			"ka" => Self::Georgian,
			"el" => Self::Greek,
			"he" | "iw" => Self::Hebrew,
			"km" => Self::Khmer,
			"lo" => Self::Lao,
			"ml" => Self::Malayalam,
			"my" => Self::Myanmar,
			"si" => Self::Sinhala,
			"ta" => Self::Tamil,
			"te" => Self::Telugu,
			"th" => Self::Thai,
			_ => Self::Latin,
		}
	}

	/// Script named by an ISO 15924 subtag, case insensitive
	#[must_use]
	pub fn from_subtag(subtag: &str) -> Self {
		match subtag.to_ascii_lowercase().as_str() {
			"latn" => Self::Latin,
			"cyrl" => Self::Cyrillic,
			"grek" => Self::Greek,
			"hebr" => Self::Hebrew,
			"arab" => Self::Arabic,
			"armn" => Self::Armenian,
			"beng" => Self::Bengali,
			"geor" => Self::Georgian,
			"khmr" => Self::Khmer,
			"laoo" => Self::Lao,
			"mlym" => Self::Malayalam,
			"mymr" => Self::Myanmar,
			"sinh" => Self::Sinhala,
			"taml" => Self::Tamil,
			"telu" => Self::Telugu,
			"thai" => Self::Thai,
			_ => Self::Unknown,
		}
	}
}
