//! Keyboard geometry used to score corrections by key proximity
//!
//! Hosts own the real keyboard and usually cache one geometry per locale.
//! The built-in rows below are enough to tell neighbouring keys apart on the
//! layouts [`layout_name`] can pick.

use crate::locale::{Locale, Script};
use std::collections::HashMap;

/// Width of the keyboard built for spell checking, in pixels
pub const SPELL_CHECKER_KEYBOARD_WIDTH: f32 = 480.0;
/// Height of the keyboard built for spell checking, in pixels
pub const SPELL_CHECKER_KEYBOARD_HEIGHT: f32 = 301.0;

type Layout = (&'static str, [&'static str; 3]);

const QWERTY: Layout = ("qwerty", ["qwertyuiop", "asdfghjkl", "zxcvbnm"]);
const EAST_SLAVIC: Layout = ("east_slavic", ["йцукенгшщзх", "фывапролджэ", "ячсмитьбю"]);
const SOUTH_SLAVIC: Layout = ("south_slavic", ["љњертзуиопш", "асдфгхјклчћ", "ѕџцвбнмђж"]);
const GREEK: Layout = ("greek", [";ςερτυθιοπ", "ασδφγηξκλ", "ζχψωβνμ"]);
const HEBREW: Layout = ("hebrew", ["'-קראטוןםפ", "שדגכעיחלךף", "זסבהנמצתץ"]);

/// Letter rows of the layouts known to [`KeyboardGeometry::for_layout`]
const LAYOUTS: [Layout; 5] = [QWERTY, EAST_SLAVIC, SOUTH_SLAVIC, GREEK, HEBREW];

/// Layout a locale is typed on
fn layout_for(locale: &Locale) -> &'static Layout {
	// serbian is written in both scripts but typed on a single layout
	if locale.language() == "sr" {
		return &SOUTH_SLAVIC;
	}

	match locale.script() {
		Script::Latin => &QWERTY,
		Script::Cyrillic => &EAST_SLAVIC,
		Script::Greek => &GREEK,
		Script::Hebrew => &HEBREW,
		script => panic!("no keyboard layout for {script:?} script of locale {locale}"),
	}
}

/// Name of the alphabet layout a locale is typed on
///
/// # Panics
///
/// Panics if the locale's script has no layout, the mapping above must be
/// extended before such a locale can be spell checked.
#[must_use]
pub fn layout_name(locale: &Locale) -> &'static str {
	layout_for(locale).0
}

/// How close two keys are on a keyboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Proximity {
	/// Same key
	Same,
	/// Keys touching each other
	Adjacent,
	/// Keys further apart
	Distant,
	/// At least one of the characters has no key
	Unknown,
}

/// Centres and size of the keys of a layout
#[derive(Debug, Clone, PartialEq)]
pub struct KeyboardGeometry {
	layout: String,
	keys: HashMap<char, (f32, f32)>,
	key_width: f32,
	key_height: f32,
}

impl KeyboardGeometry {
	/// Geometry without any key, every proximity is unknown
	#[must_use]
	pub fn empty() -> Self {
		Self {
			layout: String::new(),
			keys: HashMap::new(),
			key_width: 1.0,
			key_height: 1.0,
		}
	}

	/// Lay out rows of keys on a `width` × `height` keyboard
	///
	/// Keys share the width of the longest row, each row is shifted right by
	/// half a key more than the one above it, and one extra row is left for
	/// the space bar.
	#[must_use]
	#[allow(clippy::cast_precision_loss)]
	pub fn from_rows(layout: &str, rows: &[&str], width: f32, height: f32) -> Self {
		let columns = rows.iter().map(|r| r.chars().count()).max().unwrap_or(0).max(1);
		let key_width = width / columns as f32;
		let key_height = height / (rows.len() + 1) as f32;

		let mut keys = HashMap::new();
		for (row_index, row) in rows.iter().enumerate() {
			let offset = row_index as f32 * key_width / 2.0;
			let y = (row_index as f32 + 0.5) * key_height;
			for (column, key) in row.chars().enumerate() {
				let x = offset + (column as f32 + 0.5) * key_width;
				keys.entry(key).or_insert((x, y));
			}
		}

		Self {
			layout: layout.to_owned(),
			keys,
			key_width,
			key_height,
		}
	}

	/// One of the built-in layouts, sized like the spell checker keyboard
	#[must_use]
	pub fn for_layout(name: &str) -> Option<Self> {
		LAYOUTS
			.iter()
			.find(|(layout, _)| *layout == name)
			.map(Self::built_in)
	}

	/// Geometry of the layout a locale is typed on
	///
	/// # Panics
	///
	/// Panics when no layout exists for the locale's script, see [`layout_name`].
	#[must_use]
	pub fn for_locale(locale: &Locale) -> Self {
		Self::built_in(layout_for(locale))
	}

	fn built_in((layout, rows): &Layout) -> Self {
		Self::from_rows(
			layout,
			rows,
			SPELL_CHECKER_KEYBOARD_WIDTH,
			SPELL_CHECKER_KEYBOARD_HEIGHT,
		)
	}

	/// Name of the layout
	#[must_use]
	pub fn layout(&self) -> &str {
		&self.layout
	}

	/// Width shared by every key
	#[must_use]
	pub const fn key_width(&self) -> f32 {
		self.key_width
	}

	/// Centre of the key typing `c`, ignoring case
	#[must_use]
	pub fn key_center(&self, c: char) -> Option<(f32, f32)> {
		self.keys
			.get(&c)
			.or_else(|| c.to_lowercase().next().and_then(|lower| self.keys.get(&lower)))
			.copied()
	}

	/// Distance from a touch point to the centre of a key, in key sizes
	#[must_use]
	pub fn distance_to_key(&self, point: (f32, f32), c: char) -> Option<f32> {
		let center = self.key_center(c)?;
		Some(self.scaled_distance(point, center))
	}

	/// How close the keys typing `a` and `b` are
	#[must_use]
	pub fn proximity(&self, a: char, b: char) -> Proximity {
		let (Some(ka), Some(kb)) = (self.key_center(a), self.key_center(b)) else {
			return Proximity::Unknown;
		};

		if ka == kb {
			Proximity::Same
		} else if self.scaled_distance(ka, kb) <= 1.5 {
			Proximity::Adjacent
		} else {
			Proximity::Distant
		}
	}

	fn scaled_distance(&self, (ax, ay): (f32, f32), (bx, by): (f32, f32)) -> f32 {
		let dx = (ax - bx) / self.key_width;
		let dy = (ay - by) / self.key_height;
		dx.hypot(dy)
	}
}
