//! Import deduplication by normalized phone number.

use std::collections::HashSet;

use crate::contacts::model::{Contact, normalize_phone};

/// Normalized phones this short are not real numbers and are rejected.
pub const MIN_PHONE_DIGITS: usize = 6;

/// Outcome of merging an import into the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    /// Records added to the store.
    pub accepted: usize,
    /// Records rejected as duplicates or fake phone numbers.
    pub duplicates: usize,
}

impl ImportSummary {
    /// Total records the parser produced.
    pub fn parsed(&self) -> usize {
        self.accepted + self.duplicates
    }
}

/// Split `records` into those to accept and a summary of what was skipped.
///
/// A record is rejected when its normalized phone is shorter than
/// [`MIN_PHONE_DIGITS`] or matches an existing contact's normalized phone.
/// Records are only compared against `existing`, not against each other.
/// Accepted records keep their file order.
pub fn dedupe_imports(existing: &[Contact], records: Vec<Contact>) -> (Vec<Contact>, ImportSummary) {
    let known: HashSet<String> = existing.iter().map(Contact::normalized_phone).collect();

    let total = records.len();
    let accepted: Vec<Contact> = records
        .into_iter()
        .filter(|c| {
            let phone = normalize_phone(&c.phone);
            phone.len() >= MIN_PHONE_DIGITS && !known.contains(&phone)
        })
        .collect();

    let summary = ImportSummary {
        accepted: accepted.len(),
        duplicates: total - accepted.len(),
    };
    (accepted, summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_matching_normalized_phone() {
        let existing = vec![Contact::new("Acme", "555-0100")];
        let (accepted, summary) = dedupe_imports(&existing, vec![Contact::new("Acme 2", "(555) 0100")]);
        assert!(accepted.is_empty());
        assert_eq!(summary, ImportSummary { accepted: 0, duplicates: 1 });
    }

    #[test]
    fn rejects_short_phones() {
        let (accepted, summary) = dedupe_imports(
            &[],
            vec![Contact::new("A", "12345"), Contact::new("B", "ext. 1"), Contact::new("C", "123456")],
        );
        assert_eq!(accepted.len(), 1);
        assert_eq!(accepted[0].name, "C");
        assert_eq!(summary.duplicates, 2);
        assert_eq!(summary.parsed(), 3);
    }

    #[test]
    fn duplicates_within_one_file_are_kept() {
        let (accepted, _) = dedupe_imports(
            &[],
            vec![Contact::new("A", "555-0100"), Contact::new("B", "5550100")],
        );
        assert_eq!(accepted.len(), 2);
    }

    #[test]
    fn accepted_keep_file_order() {
        let (accepted, _) = dedupe_imports(
            &[],
            vec![Contact::new("A", "555-0001"), Contact::new("B", "555-0002")],
        );
        assert_eq!(accepted[0].name, "A");
        assert_eq!(accepted[1].name, "B");
    }
}
