// ---------------------------------------------------------------------------
// Library: process-wide, read-only query state
// ---------------------------------------------------------------------------
//
// Built once at startup from the three source tables and never mutated. All
// query methods take `&self`, so a `Library` behind an `Arc` can serve any
// number of concurrent callers without locking.
// ---------------------------------------------------------------------------

use std::collections::HashSet;

use crate::affinity::{self, BookAffinity, ReaderAffinity};
use crate::error::LibraryError;
use crate::pairs;
use crate::persistence::{self, TableSources};
use crate::types::{
	AffinityRow, BookRecommendation, Isbn13, LibraryStats, PairCount, ReaderId,
	ReaderRecommendation, ReadingEvent,
};

#[derive(Debug)]
pub struct Library {
	events: Vec<ReadingEvent>,
	reader_affinity: ReaderAffinity,
	book_affinity: BookAffinity,
}

/// Distinct values in first-seen order.
fn distinct_in_order<'a, T, I>(values: I) -> Vec<T>
where
	T: Clone + Eq + std::hash::Hash + 'a,
	I: IntoIterator<Item = &'a T>,
{
	let mut seen = HashSet::new();
	values
		.into_iter()
		.filter(|v| seen.insert(*v))
		.cloned()
		.collect()
}

impl Library {
	// -- Construction --------------------------------------------------------

	pub fn from_tables(
		events: Vec<ReadingEvent>,
		reader_affinity: Vec<AffinityRow>,
		book_affinity: Vec<AffinityRow>,
	) -> Self {
		Self {
			events,
			reader_affinity: ReaderAffinity::new(reader_affinity),
			book_affinity: BookAffinity::new(book_affinity),
		}
	}

	/// Load all three tables from disk. Fails if any of them is missing or
	/// unreadable.
	pub fn load(sources: &TableSources) -> Result<Self, LibraryError> {
		let tables = persistence::load_tables(sources)?;
		let library = Self::from_tables(
			tables.events,
			tables.reader_affinity,
			tables.book_affinity,
		);
		let stats = library.stats();
		tracing::info!(
			events = stats.events,
			readers = stats.readers,
			titles = stats.titles,
			reader_affinity_rows = stats.reader_affinity_rows,
			book_affinity_rows = stats.book_affinity_rows,
			"Library loaded"
		);
		Ok(library)
	}

	// -- Catalog -------------------------------------------------------------

	pub fn reader_ids(&self) -> Vec<ReaderId> {
		distinct_in_order(self.events.iter().map(|e| &e.reader_id))
	}

	pub fn titles(&self) -> Vec<String> {
		distinct_in_order(self.events.iter().map(|e| &e.title))
	}

	/// Distinct ISBNs; rows without one are skipped.
	pub fn isbns(&self) -> Vec<Isbn13> {
		distinct_in_order(self.events.iter().filter_map(|e| e.isbn13.as_ref()))
	}

	pub fn stats(&self) -> LibraryStats {
		let readers: HashSet<ReaderId> = self.events.iter().map(|e| e.reader_id).collect();
		let titles: HashSet<&str> = self.events.iter().map(|e| e.title.as_str()).collect();
		LibraryStats {
			events: self.events.len(),
			readers: readers.len(),
			titles: titles.len(),
			reader_affinity_rows: self.reader_affinity.row_count(),
			book_affinity_rows: self.book_affinity.row_count(),
		}
	}

	// -- Queries -------------------------------------------------------------

	/// Top co-read titles for `title`. An unknown title yields an empty list.
	///
	/// A blank title is rejected as malformed input rather than answered with
	/// an empty list, deliberately unlike the old web form, which ran the
	/// query on an empty text box and showed nothing.
	pub fn find_top_pairs(&self, title: &str) -> Result<Vec<PairCount>, LibraryError> {
		if title.trim().is_empty() {
			return Err(LibraryError::MalformedInput(
				"book title must not be empty".into(),
			));
		}
		Ok(pairs::find_top_pairs(&self.events, title))
	}

	pub fn recommend_books_for_reader(&self, reader: ReaderId) -> Vec<BookRecommendation> {
		let recs = affinity::recommend_books_for_reader(&self.events, &self.reader_affinity, reader);
		tracing::debug!(reader = %reader, rows = recs.len(), "Books for reader");
		recs
	}

	pub fn recommend_readers_for_book(&self, isbn: &Isbn13) -> Vec<ReaderRecommendation> {
		let recs = affinity::recommend_readers_for_book(&self.events, &self.book_affinity, isbn);
		tracing::debug!(isbn = %isbn, rows = recs.len(), "Readers for book");
		recs
	}

	pub fn recommend_reader_ids_for_book(&self, isbn: &Isbn13) -> Vec<ReaderId> {
		affinity::recommend_reader_ids_for_book(&self.events, &self.book_affinity, isbn)
	}
}
