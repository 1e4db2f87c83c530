// ---------------------------------------------------------------------------
// AffinityJoiner: joins reading events against precomputed affinity tables
// ---------------------------------------------------------------------------
//
// Output order is join order: reading-event rows first, then affinity rows in
// table order. Deduplication keeps the first occurrence. No truncation here;
// callers that want "top N" slice the result themselves.
// ---------------------------------------------------------------------------

use std::collections::{HashMap, HashSet};

use crate::types::{
	AffinityRow, BookId, BookRecommendation, Isbn13, ReaderId, ReaderRecommendation, ReadingEvent,
};

// ---------------------------------------------------------------------------
// Affinity indexes
// ---------------------------------------------------------------------------
//
// Each table is only ever joined in one direction, so each keeps only the
// lookup its query needs.

/// Reader-affinity table keyed by target reader, for books-for-reader.
#[derive(Debug)]
pub struct ReaderAffinity {
	rows: usize,
	books_by_target: HashMap<ReaderId, HashSet<BookId>>,
}

impl ReaderAffinity {
	pub fn new(rows: Vec<AffinityRow>) -> Self {
		let mut books_by_target: HashMap<ReaderId, HashSet<BookId>> = HashMap::new();
		for row in &rows {
			books_by_target
				.entry(row.target_reader_id)
				.or_default()
				.insert(row.book_id);
		}
		Self {
			rows: rows.len(),
			books_by_target,
		}
	}

	/// Source row count, repeats included.
	pub fn row_count(&self) -> usize {
		self.rows
	}

	/// Books whose affinity rows name `reader` as a target.
	pub fn books_for_target(&self, reader: ReaderId) -> Option<&HashSet<BookId>> {
		self.books_by_target.get(&reader)
	}
}

/// Book-affinity table keyed by book, for readers-for-book.
#[derive(Debug)]
pub struct BookAffinity {
	rows: usize,
	targets_by_book: HashMap<BookId, Vec<ReaderId>>,
}

impl BookAffinity {
	pub fn new(rows: Vec<AffinityRow>) -> Self {
		let mut targets_by_book: HashMap<BookId, Vec<ReaderId>> = HashMap::new();
		for row in &rows {
			targets_by_book
				.entry(row.book_id)
				.or_default()
				.push(row.target_reader_id);
		}
		Self {
			rows: rows.len(),
			targets_by_book,
		}
	}

	/// Source row count, repeats included.
	pub fn row_count(&self) -> usize {
		self.rows
	}

	/// Target readers for `book`, in table order (repeats preserved).
	pub fn targets_for_book(&self, book: BookId) -> &[ReaderId] {
		self.targets_by_book
			.get(&book)
			.map(Vec::as_slice)
			.unwrap_or(&[])
	}
}

// ---------------------------------------------------------------------------
// Books for a reader
// ---------------------------------------------------------------------------

/// Left-join events with `reader_affinity` on book id, keep rows targeting
/// `reader`, project to `(title, isbn13, language)` and drop repeats.
///
/// Unmatched left-join rows carry no target and never survive the filter, so
/// only events whose book targets `reader` are visited.
pub fn recommend_books_for_reader(
	events: &[ReadingEvent],
	reader_affinity: &ReaderAffinity,
	reader: ReaderId,
) -> Vec<BookRecommendation> {
	let Some(books) = reader_affinity.books_for_target(reader) else {
		return Vec::new();
	};

	let mut seen: HashSet<BookRecommendation> = HashSet::new();
	let mut out = Vec::new();
	for event in events.iter().filter(|e| books.contains(&e.book_id)) {
		let rec = BookRecommendation {
			title: event.title.clone(),
			isbn13: event.isbn13.clone(),
			language: event.language.clone(),
		};
		if seen.insert(rec.clone()) {
			out.push(rec);
		}
	}
	out
}

// ---------------------------------------------------------------------------
// Readers for a book
// ---------------------------------------------------------------------------

/// Filter events to `isbn`, inner-join with `book_affinity` on book id and
/// keep the first row per target reader.
pub fn recommend_readers_for_book(
	events: &[ReadingEvent],
	book_affinity: &BookAffinity,
	isbn: &Isbn13,
) -> Vec<ReaderRecommendation> {
	let mut seen: HashSet<ReaderId> = HashSet::new();
	let mut out = Vec::new();
	for event in events.iter().filter(|e| e.isbn13.as_ref() == Some(isbn)) {
		for &target in book_affinity.targets_for_book(event.book_id) {
			if seen.insert(target) {
				out.push(ReaderRecommendation {
					title: event.title.clone(),
					target_reader_id: target,
				});
			}
		}
	}
	out
}

/// Same join as [`recommend_readers_for_book`], projected to reader ids only.
pub fn recommend_reader_ids_for_book(
	events: &[ReadingEvent],
	book_affinity: &BookAffinity,
	isbn: &Isbn13,
) -> Vec<ReaderId> {
	recommend_readers_for_book(events, book_affinity, isbn)
		.into_iter()
		.map(|r| r.target_reader_id)
		.collect()
}
