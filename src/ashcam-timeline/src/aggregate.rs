//! Timeline aggregation
//!
//! Merges overlapping fetch batches into one deduplicated, newest-first
//! working set.

use std::collections::HashMap;
use std::ops::Deref;

use serde::Serialize;

use crate::schema::ImageRecord;

/// Deduplicated images, newest first
///
/// Only built by [`aggregate`]; never mutated after construction.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct WorkingSet(Vec<ImageRecord>);

impl WorkingSet {
    pub fn images(&self) -> &[ImageRecord] {
        &self.0
    }

    pub fn newest(&self) -> Option<&ImageRecord> {
        self.0.first()
    }

    pub fn oldest(&self) -> Option<&ImageRecord> {
        self.0.last()
    }

    pub fn into_vec(self) -> Vec<ImageRecord> {
        self.0
    }
}

impl Deref for WorkingSet {
    type Target = [ImageRecord];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Merge batches into a working set
///
/// A repeated `id` keeps the record from the latest batch. Records are
/// sorted by timestamp descending; equal timestamps fall back to `id`
/// descending so the result does not depend on hashing order.
pub fn aggregate<I, B>(batches: I) -> WorkingSet
where
    I: IntoIterator<Item = B>,
    B: AsRef<[ImageRecord]>,
{
    let mut by_id: HashMap<i64, ImageRecord> = HashMap::new();

    for batch in batches {
        for image in batch.as_ref() {
            by_id.insert(image.id, image.clone());
        }
    }

    let mut images: Vec<ImageRecord> = by_id.into_values().collect();
    images.sort_by(|a, b| {
        b.timestamp
            .cmp(&a.timestamp)
            .then_with(|| b.id.cmp(&a.id))
    });

    WorkingSet(images)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::schema::InterestingCode;
    use std::collections::HashSet;

    pub(crate) fn image(id: i64, timestamp: i64) -> ImageRecord {
        ImageRecord {
            id,
            timestamp,
            url: format!("https://example.org/{}.jpg", id),
            interesting_code: InterestingCode::Unset,
            is_night: false,
            webcam_code: Some("ys-bbsn".to_string()),
        }
    }

    #[test]
    fn test_empty_input() {
        let batches: Vec<Vec<ImageRecord>> = vec![];
        assert!(aggregate(&batches).is_empty());

        let batches: Vec<Vec<ImageRecord>> = vec![vec![], vec![]];
        assert!(aggregate(&batches).is_empty());
    }

    #[test]
    fn test_dedup_and_order() {
        let batches = vec![
            vec![image(3, 300), image(2, 200)],
            vec![],
            vec![image(2, 200), image(1, 100), image(4, 400)],
        ];
        let set = aggregate(&batches);

        let ids: Vec<i64> = set.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![4, 3, 2, 1]);

        let expected: HashSet<i64> = batches.iter().flatten().map(|i| i.id).collect();
        let actual: HashSet<i64> = set.iter().map(|i| i.id).collect();
        assert_eq!(expected, actual);
        assert_eq!(set.len(), actual.len());

        for pair in set.windows(2) {
            assert!(pair[0].timestamp >= pair[1].timestamp);
        }
    }

    #[test]
    fn test_last_write_wins() {
        let mut refreshed = image(7, 700);
        refreshed.interesting_code = InterestingCode::Volcanic;

        let set = aggregate(vec![vec![image(7, 700)], vec![refreshed.clone()]]);
        assert_eq!(set.len(), 1);
        assert_eq!(set[0], refreshed);
    }

    #[test]
    fn test_reaggregate_is_noop() {
        let batches = vec![
            vec![image(1, 100), image(5, 500)],
            vec![image(3, 300), image(5, 500), image(9, 300)],
        ];
        let once = aggregate(&batches);
        let twice = aggregate([once.images()]);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_batch_order_does_not_change_ordering() {
        let a = vec![image(1, 100), image(2, 100)];
        let b = vec![image(3, 50)];
        assert_eq!(aggregate([&a, &b]), aggregate([&b, &a]));
        assert_eq!(aggregate([&a])[0].id, 2);
    }

    #[test]
    fn test_newest_and_oldest() {
        let set = aggregate([vec![image(1, 100), image(2, 900)]]);
        assert_eq!(set.newest().map(|i| i.id), Some(2));
        assert_eq!(set.oldest().map(|i| i.id), Some(1));
    }
}
