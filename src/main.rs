//! Polyspell CLI
//!
//! Checks words against word lists found in a directory, e.g.
//! `polyspell --dictionaries dicts --locales en_US,fr "Helo wrold"`

use clap::Parser;
use polyspell::{
	text, Capitalization, ComposedInput, Config, KeyboardGeometry, Locale, NgramContext,
	SpellCheckService, WordListFactory,
};
use std::{
	collections::HashMap,
	io::{stdin, stdout, Write},
	num::NonZeroUsize,
	path::PathBuf,
	sync::Arc,
};

#[derive(clap::Parser)]
struct Args {
	/// Text to check
	text: Option<String>,

	/// Directory holding `<locale>.dic` word lists
	#[arg(long, short, default_value = ".")]
	dictionaries: PathBuf,

	/// Enabled locales, most preferred first
	#[arg(long, short, value_delimiter = ',', default_value = "en_US")]
	locales: Vec<Locale>,

	/// Directive file overriding default settings
	#[arg(long, short)]
	config: Option<PathBuf>,

	/// Do not accept words from `contacts.dic`
	#[arg(long)]
	no_contacts: bool,

	/// Most suggestions printed per word
	#[arg(long, short, default_value_t = 5)]
	max_suggestions: usize,

	/// Read text to check from stdin, line by line
	#[arg(long, short)]
	interactive: bool,
}

/// Keyboard geometries, one per layout
#[derive(Default)]
struct Keyboards(HashMap<String, KeyboardGeometry>);

impl Keyboards {
	fn for_locale(&mut self, locale: &Locale) -> &KeyboardGeometry {
		let layout = polyspell::keyboard::layout_name(locale);
		self.0
			.entry(layout.to_owned())
			.or_insert_with(|| KeyboardGeometry::for_locale(locale))
	}
}

struct Checker {
	service: SpellCheckService,
	keyboards: Keyboards,
	max_suggestions: usize,
}

impl Checker {
	fn check(&mut self, input: &str) {
		let mut previous = Vec::new();

		for word in text::words(input) {
			let word = text::normalize_apostrophes(word);
			self.check_word(&word, &previous);
			previous.push(word.into_owned());
		}
	}

	fn check_word(&mut self, word: &str, previous: &[String]) {
		let capitalization = Capitalization::classify(word);
		if self.service.is_valid_in_any_enabled_locale(word, capitalization) {
			log::info!("`{word}` is spelled right");
			return;
		}

		let Some(locale) = self.service.enabled_locales().into_iter().next() else {
			log::warn!("`{word}` is unknown, no locale is enabled");
			return;
		};
		if !self.service.has_main_dictionary(&locale) {
			log::warn!("`{word}` is unknown, no dictionary for {locale}");
			return;
		}

		let context = if previous.is_empty() {
			NgramContext::beginning_of_sentence()
		} else {
			NgramContext::from_words(previous)
		};
		let results = self.service.get_suggestions(
			&locale,
			&ComposedInput::typed(word),
			&context,
			self.keyboards.for_locale(&locale),
		);
		let info = self
			.service
			.suggestions_info(word, &locale, &results, self.max_suggestions);

		if info.suggestions.is_empty() {
			log::warn!("`{word}` is unknown, no suggestion");
		} else {
			let marker = if info.attributes.has_recommended { " (recommended)" } else { "" };
			log::warn!(
				"`{word}` is unknown, did you mean {}{marker}",
				info.suggestions.join(", ")
			);
		}
	}
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
	pretty_env_logger::init();

	let args = Args::parse();

	let mut config = match &args.config {
		Some(path) => Config::file(path)?,
		None => Config::default(),
	};
	if args.no_contacts {
		config.use_contacts_dictionary = false;
	}

	let factory = WordListFactory::directory(&args.dictionaries);
	let mut checker = Checker {
		service: SpellCheckService::new(config, Arc::new(factory), &args.locales),
		keyboards: Keyboards::default(),
		max_suggestions: NonZeroUsize::new(args.max_suggestions).map_or(1, NonZeroUsize::get),
	};

	if let Some(text) = args.text {
		checker.check(&text);
	} else if args.interactive {
		loop {
			print!("check text ❯ ");
			stdout().flush()?;

			let mut input = String::new();
			if stdin().read_line(&mut input)? == 0 {
				break;
			}
			checker.check(input.trim());
		}
	} else {
		return Err("no action provided".into());
	}

	checker.service.close_all();
	Ok(())
}
