// ---------------------------------------------------------------------------
// PairFinder: "books frequently read together"
// ---------------------------------------------------------------------------
//
// Pure functions over the reading-event table. Every query re-derives the
// per-reader histories and the pair aggregate; nothing is cached between
// calls. Cost is O(R * k^2) for R readers with k distinct titles each.
// ---------------------------------------------------------------------------

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::types::{BookPair, PairCount, ReaderId, ReadingEvent};

/// Maximum number of rows returned by [`find_top_pairs`].
pub const TOP_PAIRS_LIMIT: usize = 10;

// ---------------------------------------------------------------------------
// Partition
// ---------------------------------------------------------------------------

/// Partition events by reader. Each history holds the reader's distinct
/// titles in first-seen order; two editions sharing a title collapse to one.
pub fn reader_histories(events: &[ReadingEvent]) -> BTreeMap<ReaderId, Vec<&str>> {
	let mut histories: BTreeMap<ReaderId, Vec<&str>> = BTreeMap::new();
	let mut seen: HashSet<(ReaderId, &str)> = HashSet::new();

	for event in events {
		if seen.insert((event.reader_id, event.title.as_str())) {
			histories
				.entry(event.reader_id)
				.or_default()
				.push(event.title.as_str());
		}
	}

	histories
}

// ---------------------------------------------------------------------------
// Pair generation
// ---------------------------------------------------------------------------

/// Every ordered pair of distinct positions in `history`: n * (n - 1) pairs
/// for n titles, none for a history of one.
pub fn ordered_pairs<'a>(history: &'a [&'a str]) -> impl Iterator<Item = BookPair<'a>> + 'a {
	history.iter().enumerate().flat_map(move |(i, &book_a)| {
		history
			.iter()
			.enumerate()
			.filter(move |(j, _)| *j != i)
			.map(move |(_, &book_b)| BookPair { book_a, book_b })
	})
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Count, per `(bookA, bookB)`, the readers whose history produced that pair.
/// Pairs rejected by `keep` are never counted.
fn aggregate_pairs<'a, F>(
	histories: &'a BTreeMap<ReaderId, Vec<&'a str>>,
	mut keep: F,
) -> HashMap<BookPair<'a>, usize>
where
	F: FnMut(&BookPair<'a>) -> bool,
{
	let mut counts: HashMap<BookPair<'a>, usize> = HashMap::new();
	for history in histories.values() {
		for pair in ordered_pairs(history) {
			if keep(&pair) {
				*counts.entry(pair).or_insert(0) += 1;
			}
		}
	}
	counts
}

/// Ranking order: count descending, then `bookA` and `bookB` ascending.
fn rank_order(a: &PairCount, b: &PairCount) -> Ordering {
	b.count
		.cmp(&a.count)
		.then_with(|| a.book_a.cmp(&b.book_a))
		.then_with(|| a.book_b.cmp(&b.book_b))
}

/// Drop self-pairs and sort the aggregate into ranking order.
fn rank(counts: HashMap<BookPair<'_>, usize>) -> Vec<PairCount> {
	let mut rows: Vec<PairCount> = counts
		.into_iter()
		.filter(|(pair, _)| pair.book_a != pair.book_b)
		.map(|(pair, count)| PairCount {
			book_a: pair.book_a.to_string(),
			book_b: pair.book_b.to_string(),
			count,
		})
		.collect();
	rows.sort_by(rank_order);
	rows
}

/// Full pair aggregate across all readers, in ranking order.
pub fn count_pairs(events: &[ReadingEvent]) -> Vec<PairCount> {
	let histories = reader_histories(events);
	rank(aggregate_pairs(&histories, |_| true))
}

/// Up to [`TOP_PAIRS_LIMIT`] titles most often read by readers of
/// `book_title`. An unknown title yields an empty list.
pub fn find_top_pairs(events: &[ReadingEvent], book_title: &str) -> Vec<PairCount> {
	let histories = reader_histories(events);
	let mut rows = rank(aggregate_pairs(&histories, |pair| pair.book_a == book_title));
	rows.truncate(TOP_PAIRS_LIMIT);
	tracing::debug!(title = book_title, rows = rows.len(), "Ranked co-read pairs");
	rows
}
