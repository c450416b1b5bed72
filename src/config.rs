//! Service configuration and its directive file
//!
//! The file uses one directive per line, `#` starts a comment:
//!
//! ```text
//! # keep three dictionaries loaded
//! CACHECAPACITY 3
//! READERS 2
//! THRESHOLD 0.1
//! NOCONTACTS
//! PERMITTIMEOUT 250
//! ```

use nom::{
	branch::alt,
	bytes::complete::{is_not, tag, take_while1},
	character::complete::{newline, space0, space1},
	multi::many0,
	sequence::tuple,
	IResult, Parser,
};
use nom_supreme::ParserExt;
use std::{fs, io, num::NonZeroUsize, path::Path, str::FromStr, time::Duration};

/// Dictionaries kept resident by default
pub const DEFAULT_CACHE_CAPACITY: NonZeroUsize = match NonZeroUsize::new(3) {
	Some(capacity) => capacity,
	None => unreachable!(),
};
/// Concurrent dictionary readers allowed by default
pub const DEFAULT_MAX_READERS: NonZeroUsize = match NonZeroUsize::new(2) {
	Some(readers) => readers,
	None => unreachable!(),
};
/// Normalized score from which a suggestion is recommended by default
pub const DEFAULT_RECOMMENDED_THRESHOLD: f32 = 0.1;

/// Settings fixed for the lifetime of a service
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
	/// Dictionaries kept resident for single-locale queries
	pub cache_capacity: NonZeroUsize,
	/// Dictionary readers running at once, also the number of session ids
	pub max_readers: NonZeroUsize,
	/// Normalized score from which a suggestion is recommended
	pub recommended_threshold: f32,
	/// Whether contact names count as words
	pub use_contacts_dictionary: bool,
	/// Longest wait for a reader permit before suggestions are skipped
	///
	/// [`None`] waits as long as it takes.
	pub permit_timeout: Option<Duration>,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			cache_capacity: DEFAULT_CACHE_CAPACITY,
			max_readers: DEFAULT_MAX_READERS,
			recommended_threshold: DEFAULT_RECOMMENDED_THRESHOLD,
			use_contacts_dictionary: true,
			permit_timeout: None,
		}
	}
}

/// Ways reading a configuration could go wrong
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	/// File is not made of directive lines
	#[error("could not parse config: {0}")]
	Parser(String),

	/// Directive name is not known
	#[error("unknown directive `{0}`")]
	UnknownDirective(String),

	/// Directive value is missing, malformed or out of range
	#[error("invalid value `{value}` for directive `{directive}`")]
	InvalidValue {
		/// Directive name
		directive: String,
		/// Offending value, empty when missing
		value: String,
	},

	/// Could not read the file
	#[error(transparent)]
	Io(#[from] io::Error),
}

/// Constructors
impl Config {
	/// Read a directive file
	///
	/// # Errors
	///
	/// Will error if the file cannot be read or holds an invalid directive.
	pub fn file(path: &Path) -> Result<Self, ConfigError> {
		fs::read_to_string(path)?.parse()
	}
}

impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(content: &str) -> Result<Self, Self::Err> {
		let mut content = content.to_owned();
		if !content.ends_with('\n') {
			content.push('\n');
		}

		let (_, directives) = ConfigParser::parse(&content)
			.map_err(|e: nom::Err<nom::error::Error<_>>| ConfigError::Parser(e.to_string()))?;

		let mut config = Self::default();
		for directive in directives.into_iter().flatten() {
			directive.apply(&mut config)?;
		}
		Ok(config)
	}
}

/// A `NAME value` line
#[derive(Debug, Clone, PartialEq, Eq)]
struct Directive<'a> {
	name: &'a str,
	value: Option<&'a str>,
}

impl Directive<'_> {
	fn apply(&self, config: &mut Config) -> Result<(), ConfigError> {
		match self.name {
			"CACHECAPACITY" => config.cache_capacity = self.parse_value()?,
			"READERS" => config.max_readers = self.parse_value()?,
			"THRESHOLD" => {
				let threshold: f32 = self.parse_value()?;
				if !threshold.is_finite() || threshold < 0.0 {
					return Err(self.invalid());
				}
				config.recommended_threshold = threshold;
			}
			"CONTACTS" => config.use_contacts_dictionary = true,
			"NOCONTACTS" => config.use_contacts_dictionary = false,
			"PERMITTIMEOUT" => {
				config.permit_timeout = Some(Duration::from_millis(self.parse_value()?));
			}
			"NOPERMITTIMEOUT" => config.permit_timeout = None,
			name => return Err(ConfigError::UnknownDirective(name.to_owned())),
		}
		Ok(())
	}

	fn parse_value<T: FromStr>(&self) -> Result<T, ConfigError> {
		self.value
			.and_then(|value| value.parse().ok())
			.ok_or_else(|| self.invalid())
	}

	fn invalid(&self) -> ConfigError {
		ConfigError::InvalidValue {
			directive: self.name.to_owned(),
			value: self.value.unwrap_or_default().to_owned(),
		}
	}
}

struct ConfigParser;

impl ConfigParser {
	/// Every line, `None` standing for comments and blank lines
	fn parse(i: &str) -> IResult<&str, Vec<Option<Directive<'_>>>> {
		many0(alt((
			Self::parse_directive.map(Some),
			tag("#")
				.terminated(is_not("\n").opt())
				.terminated(newline)
				.value(None),
			space0.terminated(newline).value(None),
		)))
		.all_consuming()
		.parse(i)
	}

	/// Takes care of parsing a whole line with the ending newline
	fn parse_directive(i: &str) -> IResult<&str, Directive<'_>> {
		let is_directive_char = |c: char| matches!(c, 'A'..='Z' | '_');

		tuple((
			take_while1(is_directive_char).preceded_by(space0),
			is_not(" \t\n#").preceded_by(space1).opt(),
		))
		.terminated(space0)
		.terminated(tag("#").terminated(is_not("\n").opt()).opt())
		.terminated(newline)
		.map(|(name, value)| Directive { name, value })
		.parse(i)
	}
}
