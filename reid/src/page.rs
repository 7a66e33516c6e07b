//! Opaque-cursor pagination over a creation-time key index.
//!
//! The index keys sort newest-first (see [`crate::keys`]); the page
//! protocol fetches limit+1 qualifying records to detect whether more
//! remain, without a separate count query. The cursor is the id of the
//! last record on the page; resuming looks that record up to find its
//! index key, and a cursor whose record has since been deleted degrades
//! to starting from the beginning rather than erroring.

use strayid_kv::KVStore;

use crate::error::ReidError;
use crate::types::Page;

/// How many index entries to pull per store round-trip while filling a
/// page. Filtered listings may need several batches.
const SCAN_BATCH: usize = 64;

/// Walk `index_prefix` newest-first and collect up to `limit` records
/// passing `filter`.
///
/// `load` maps a record id to its document (`None` for dangling index
/// entries, which are skipped), and `index_key_of` rebuilds a record's
/// index key so a cursor can be turned into a resume position.
pub fn list_index<T>(
    store: &dyn KVStore,
    index_prefix: &str,
    cursor: Option<&str>,
    limit: usize,
    load: impl Fn(&str) -> Result<Option<T>, ReidError>,
    index_key_of: impl Fn(&T) -> String,
    filter: impl Fn(&T) -> bool,
    id_of: impl Fn(&T) -> String,
) -> Result<Page<T>, ReidError> {
    // A deleted cursor record degrades to "start from the beginning".
    let mut start_after: Option<String> = match cursor {
        Some(id) => load(id)?.map(|t| index_key_of(&t)),
        None => None,
    };

    let mut items: Vec<T> = Vec::new();
    loop {
        let batch = store.scan_page(index_prefix, start_after.as_deref(), SCAN_BATCH)?;
        let exhausted = batch.len() < SCAN_BATCH;

        for (key, value) in batch {
            start_after = Some(key);
            let id = String::from_utf8_lossy(&value).into_owned();
            let Some(item) = load(&id)? else {
                continue;
            };
            if !filter(&item) {
                continue;
            }
            items.push(item);
            if items.len() > limit {
                // limit+1 fetched: more remain, the limit-th record's
                // identity becomes the cursor.
                items.truncate(limit);
                let next_cursor = items.last().map(&id_of);
                return Ok(Page {
                    items,
                    next_cursor,
                });
            }
        }

        if exhausted {
            return Ok(Page {
                items,
                next_cursor: None,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{decode, encode};
    use crate::keys;
    use serde::{Deserialize, Serialize};
    use strayid_kv::MemoryStore;

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    struct Rec {
        id: String,
        ts: i64,
        tag: String,
    }

    fn seed(store: &MemoryStore, n: usize) -> Vec<Rec> {
        let mut recs = Vec::new();
        for i in 0..n {
            let rec = Rec {
                id: format!("r{i:02}"),
                ts: 1_000 + i as i64,
                tag: if i % 2 == 0 { "even" } else { "odd" }.to_string(),
            };
            let doc = encode(&rec).unwrap();
            store.set(&format!("rec:{}", rec.id), &doc).unwrap();
            store
                .set(
                    &keys::sighting_ts_key(rec.ts, &rec.id),
                    rec.id.as_bytes(),
                )
                .unwrap();
            recs.push(rec);
        }
        recs
    }

    fn list(
        store: &MemoryStore,
        cursor: Option<&str>,
        limit: usize,
        filter: impl Fn(&Rec) -> bool,
    ) -> Page<Rec> {
        list_index(
            store,
            keys::sighting_ts_prefix(),
            cursor,
            limit,
            |id| match store.get(&format!("rec:{id}")).unwrap() {
                Some(data) => Ok(Some(decode(&data).unwrap())),
                None => Ok(None),
            },
            |r: &Rec| keys::sighting_ts_key(r.ts, &r.id),
            filter,
            |r: &Rec| r.id.clone(),
        )
        .unwrap()
    }

    #[test]
    fn newest_first_ordering() {
        let store = MemoryStore::new();
        seed(&store, 5);
        let page = list(&store, None, 10, |_| true);
        assert!(page.next_cursor.is_none());
        let ids: Vec<&str> = page.items.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["r04", "r03", "r02", "r01", "r00"]);
    }

    #[test]
    fn concatenated_pages_reproduce_collection_exactly_once() {
        let store = MemoryStore::new();
        let total = 23;
        seed(&store, total);

        for page_size in [1usize, 2, 5, 7, 23, 50] {
            let mut seen = Vec::new();
            let mut cursor: Option<String> = None;
            loop {
                let page = list(&store, cursor.as_deref(), page_size, |_| true);
                assert!(page.items.len() <= page_size);
                seen.extend(page.items.iter().map(|r| r.id.clone()));
                match page.next_cursor {
                    Some(c) => cursor = Some(c),
                    None => break,
                }
            }
            assert_eq!(seen.len(), total, "page_size {page_size}");
            let mut dedup = seen.clone();
            dedup.sort();
            dedup.dedup();
            assert_eq!(dedup.len(), total, "no duplicates for {page_size}");
        }
    }

    #[test]
    fn exact_multiple_has_no_trailing_cursor() {
        let store = MemoryStore::new();
        seed(&store, 4);
        let first = list(&store, None, 2, |_| true);
        assert!(first.next_cursor.is_some());
        let second = list(&store, first.next_cursor.as_deref(), 2, |_| true);
        assert_eq!(second.items.len(), 2);
        assert!(
            second.next_cursor.is_none(),
            "exhausted collection must not hand out a cursor"
        );
    }

    #[test]
    fn filtered_pages_still_fill_to_limit() {
        let store = MemoryStore::new();
        seed(&store, 10); // 5 even, 5 odd
        let page = list(&store, None, 3, |r| r.tag == "even");
        assert_eq!(page.items.len(), 3);
        assert!(page.items.iter().all(|r| r.tag == "even"));
        assert!(page.next_cursor.is_some());

        let rest = list(&store, page.next_cursor.as_deref(), 3, |r| r.tag == "even");
        assert_eq!(rest.items.len(), 2);
        assert!(rest.next_cursor.is_none());
    }

    #[test]
    fn deleted_cursor_degrades_to_beginning() {
        let store = MemoryStore::new();
        let recs = seed(&store, 6);
        let first = list(&store, None, 2, |_| true);
        let cursor = first.next_cursor.clone().unwrap();

        // Delete the cursor record itself.
        store.delete(&format!("rec:{cursor}")).unwrap();
        store
            .delete(&keys::sighting_ts_key(
                recs.iter().find(|r| r.id == cursor).unwrap().ts,
                &cursor,
            ))
            .unwrap();

        let page = list(&store, Some(&cursor), 3, |_| true);
        // Starts over from the newest record instead of erroring.
        assert_eq!(page.items[0].id, "r05");
    }

    #[test]
    fn timestamp_ties_ordered_by_id() {
        let store = MemoryStore::new();
        for id in ["b", "a", "c"] {
            let rec = Rec {
                id: id.to_string(),
                ts: 999,
                tag: String::new(),
            };
            let doc = encode(&rec).unwrap();
            store.set(&format!("rec:{id}"), &doc).unwrap();
            store
                .set(&keys::sighting_ts_key(999, id), id.as_bytes())
                .unwrap();
        }
        let page = list(&store, None, 10, |_| true);
        let ids: Vec<&str> = page.items.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }
}
