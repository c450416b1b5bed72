mod utils;

use polyspell::{Capitalization, Config, SpellCheckService};
use std::sync::Arc;
use utils::{init_logger, locale, Event, MockFactory};

fn germans() -> (SpellCheckService, Arc<utils::Shared>) {
	init_logger();

	let factory = MockFactory::new().with_words("en_US", &["Germans"]);
	let shared = factory.shared();
	let service = SpellCheckService::new(Config::default(), Arc::new(factory), &vec![locale("en_US")]);
	(service, shared)
}

#[test]
fn all_caps_finds_canonical_casing() {
	let (service, shared) = germans();
	let capitalization = Capitalization::classify("GERMANS");
	assert_eq!(capitalization, Capitalization::All);

	assert!(service.is_valid_in_any_enabled_locale("GERMANS", capitalization));

	let lookups = shared
		.events()
		.into_iter()
		.filter_map(|event| match event {
			Event::Lookup(_, word) => Some(word),
			_ => None,
		})
		.collect::<Vec<_>>();
	assert_eq!(lookups, ["GERMANS", "germans", "Germans"]);
}

#[test]
fn lowercase_is_not_capitalized() {
	let (service, shared) = germans();
	assert!(!service.is_valid_in_any_enabled_locale("germans", Capitalization::None));
	assert_eq!(shared.count(|e| matches!(e, Event::Lookup(..))), 1);
}

#[test]
fn first_letter_capitalized_is_literal_hit() {
	let (service, shared) = germans();
	assert!(service.is_valid_in_any_enabled_locale("Germans", Capitalization::First));
	assert_eq!(shared.count(|e| matches!(e, Event::Lookup(..))), 1);
}

#[test]
fn mixed_case_only_checks_literal() {
	let (service, shared) = germans();
	assert!(!service.is_valid_in_any_enabled_locale("GerMans", Capitalization::Mixed));
	assert_eq!(shared.count(|e| matches!(e, Event::Lookup(..))), 1);
}

#[test]
fn first_letter_is_not_recapitalized() {
	let factory = MockFactory::new().with_words("en", &["iPhone"]);
	let service = SpellCheckService::new(Config::default(), Arc::new(factory), &vec![locale("en")]);

	// `Iphone` lowered is `iphone`, the canonical `iPhone` is never tried
	assert!(!service.is_valid_in_any_enabled_locale("Iphone", Capitalization::First));
}

#[test]
fn turkish_dotted_capitals() {
	let factory = MockFactory::new().with_words("tr", &["istanbul", "ılık"]);
	let service = SpellCheckService::new(Config::default(), Arc::new(factory), &vec![locale("tr")]);

	assert!(service.is_valid_in_any_enabled_locale("İSTANBUL", Capitalization::All));
	assert!(service.is_valid_in_any_enabled_locale("ILIK", Capitalization::All));
	assert!(!service.is_valid_in_any_enabled_locale("ISTANBUL", Capitalization::All));
}
