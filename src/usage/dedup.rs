use std::collections::HashSet;

use super::types::UsageRecord;

/// Records with no two sharing a non-empty request id.
///
/// Only [`deduplicate`] builds one, so holding a `DedupedRecords` means the
/// invariant holds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DedupedRecords {
    records: Vec<UsageRecord>,
}

impl DedupedRecords {
    pub fn iter(&self) -> std::slice::Iter<'_, UsageRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl<'a> IntoIterator for &'a DedupedRecords {
    type Item = &'a UsageRecord;
    type IntoIter = std::slice::Iter<'a, UsageRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Keep the first record per request id.
///
/// The CLI writes one line per content block of an API call, each carrying the
/// same request id and identical usage totals. Summing them all would multiply
/// usage by the block count. Records without a request id are always kept.
pub fn deduplicate(records: impl IntoIterator<Item = UsageRecord>) -> DedupedRecords {
    let mut seen: HashSet<String> = HashSet::new();
    let records = records
        .into_iter()
        .filter(|record| match record.request_id.as_deref() {
            Some(id) if !id.is_empty() => seen.insert(id.to_string()),
            _ => true,
        })
        .collect();

    DedupedRecords { records }
}
