// ---------------------------------------------------------------------------
// Identifiers and row types shared by the loader, the query modules and the
// JSON-RPC surface.
// ---------------------------------------------------------------------------
//
// Identifier columns arrive from dataframe exports, so numeric ids may show up
// as integers, integral floats (`42.0`) or numeric strings. All three decode
// to the same value; anything else is rejected as malformed.
// ---------------------------------------------------------------------------

use std::fmt;
use std::str::FromStr;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::LibraryError;

// ---------------------------------------------------------------------------
// Numeric identifier parsing
// ---------------------------------------------------------------------------

/// Largest float that still converts losslessly into the u64 range.
const MAX_INTEGRAL_F64: f64 = 18_446_744_073_709_549_568.0;

fn integral_f64(v: f64) -> Option<u64> {
	if v.is_finite() && v >= 0.0 && v.fract() == 0.0 && v <= MAX_INTEGRAL_F64 {
		Some(v as u64)
	} else {
		None
	}
}

fn parse_numeric_id(raw: &str, what: &str) -> Result<u64, LibraryError> {
	let trimmed = raw.trim();
	if let Ok(v) = trimmed.parse::<u64>() {
		return Ok(v);
	}
	trimmed
		.parse::<f64>()
		.ok()
		.and_then(integral_f64)
		.ok_or_else(|| {
			LibraryError::MalformedInput(format!(
				"{} '{}' is not a non-negative integer",
				what, raw
			))
		})
}

struct NumericIdVisitor(&'static str);

impl<'de> Visitor<'de> for NumericIdVisitor {
	type Value = u64;

	fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "a non-negative integer {}", self.0)
	}

	fn visit_u64<E: de::Error>(self, v: u64) -> Result<u64, E> {
		Ok(v)
	}

	fn visit_i64<E: de::Error>(self, v: i64) -> Result<u64, E> {
		u64::try_from(v)
			.map_err(|_| E::custom(format!("{} must not be negative, got {}", self.0, v)))
	}

	fn visit_f64<E: de::Error>(self, v: f64) -> Result<u64, E> {
		integral_f64(v)
			.ok_or_else(|| E::custom(format!("{} must be a whole number, got {}", self.0, v)))
	}

	fn visit_str<E: de::Error>(self, v: &str) -> Result<u64, E> {
		parse_numeric_id(v, self.0).map_err(E::custom)
	}
}

macro_rules! numeric_id {
	($(#[$meta:meta])* $name:ident, $what:literal) => {
		$(#[$meta])*
		#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
		pub struct $name(pub u64);

		impl fmt::Display for $name {
			fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
				write!(f, "{}", self.0)
			}
		}

		impl FromStr for $name {
			type Err = LibraryError;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				parse_numeric_id(s, $what).map(Self)
			}
		}

		impl<'de> Deserialize<'de> for $name {
			fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
				deserializer.deserialize_any(NumericIdVisitor($what)).map(Self)
			}
		}
	};
}

numeric_id!(
	/// Reader (user) identifier.
	ReaderId,
	"reader id"
);
numeric_id!(
	/// Book identifier; the join key shared by all three tables.
	BookId,
	"book id"
);

// ---------------------------------------------------------------------------
// ISBN-13
// ---------------------------------------------------------------------------

/// A normalized 13-digit ISBN. Hyphens and spaces are stripped on parse; the
/// check digit is not verified.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Isbn13(String);

impl Isbn13 {
	pub fn parse(raw: &str) -> Result<Self, LibraryError> {
		let digits: String = raw
			.trim()
			.chars()
			.filter(|c| *c != '-' && *c != ' ')
			.collect();
		if digits.len() != 13 || !digits.bytes().all(|b| b.is_ascii_digit()) {
			return Err(LibraryError::MalformedInput(format!(
				"isbn13 '{}' must contain exactly 13 digits",
				raw
			)));
		}
		Ok(Self(digits))
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for Isbn13 {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl FromStr for Isbn13 {
	type Err = LibraryError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::parse(s)
	}
}

struct Isbn13Visitor;

impl<'de> Visitor<'de> for Isbn13Visitor {
	type Value = Isbn13;

	fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
		f.write_str("a 13-digit isbn as a string or integer")
	}

	fn visit_u64<E: de::Error>(self, v: u64) -> Result<Isbn13, E> {
		Isbn13::parse(&v.to_string()).map_err(E::custom)
	}

	fn visit_i64<E: de::Error>(self, v: i64) -> Result<Isbn13, E> {
		Isbn13::parse(&v.to_string()).map_err(E::custom)
	}

	fn visit_f64<E: de::Error>(self, v: f64) -> Result<Isbn13, E> {
		let whole = integral_f64(v)
			.ok_or_else(|| E::custom(format!("isbn13 must be a whole number, got {}", v)))?;
		Isbn13::parse(&whole.to_string()).map_err(E::custom)
	}

	fn visit_str<E: de::Error>(self, v: &str) -> Result<Isbn13, E> {
		Isbn13::parse(v).map_err(E::custom)
	}
}

impl<'de> Deserialize<'de> for Isbn13 {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		deserializer.deserialize_any(Isbn13Visitor)
	}
}

// ---------------------------------------------------------------------------
// Source rows
// ---------------------------------------------------------------------------

/// One row of the reading-event table: "this reader read/rated this book".
/// Columns beyond the ones below are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingEvent {
	#[serde(alias = "userId")]
	pub reader_id: ReaderId,
	pub book_id: BookId,
	#[serde(default)]
	pub isbn13: Option<Isbn13>,
	pub title: String,
	#[serde(default)]
	pub language: Option<String>,
}

/// One row of an externally produced affinity table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AffinityRow {
	pub book_id: BookId,
	#[serde(alias = "targetId")]
	pub target_reader_id: ReaderId,
}

// ---------------------------------------------------------------------------
// Derived / result rows
// ---------------------------------------------------------------------------

/// Ordered pair of distinct titles from one reader's history. Lives only for
/// the duration of a single aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BookPair<'a> {
	pub book_a: &'a str,
	pub book_b: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairCount {
	pub book_a: String,
	pub book_b: String,
	pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BookRecommendation {
	pub title: String,
	pub isbn13: Option<Isbn13>,
	pub language: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReaderRecommendation {
	pub title: String,
	pub target_reader_id: ReaderId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryStats {
	pub events: usize,
	pub readers: usize,
	pub titles: usize,
	pub reader_affinity_rows: usize,
	pub book_affinity_rows: usize,
}
