//! Positional CSV import of `Name,Address...,Phone,Link` rows.

use tracing::debug;

use crate::contacts::model::Contact;

use super::export::EXPORT_HEADER;

/// Parse raw CSV text into new contacts.
///
/// Rows with fewer than three fields, or a blank name or phone, are skipped
/// silently. If the first line mentions `name` (case-insensitive) it is
/// treated as a header. A file carrying our own export header is read back
/// by its leading `Name,Phone` columns; status columns are not re-imported.
pub fn parse_csv(text: &str) -> Vec<Contact> {
    let mut lines = text.lines().peekable();
    let mut parse_row: fn(&str) -> Option<Contact> = parse_line;
    if let Some(&first) = lines.peek() {
        if first.trim() == EXPORT_HEADER {
            parse_row = parse_exported_line;
        }
        if first.to_lowercase().contains("name") {
            lines.next();
        }
    }

    let mut contacts = Vec::new();
    let mut skipped = 0usize;
    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match parse_row(line) {
            Some(contact) => contacts.push(contact),
            None => skipped += 1,
        }
    }

    debug!(parsed = contacts.len(), skipped, "Parsed CSV");
    contacts
}

/// One row: first field is the name, last is an ignored link, second-to-last
/// is the phone, and anything in between is the address.
fn parse_line(line: &str) -> Option<Contact> {
    let parts: Vec<&str> = line.split(',').collect();
    if parts.len() < 3 {
        return None;
    }

    let name = strip_quotes(parts[0].trim());
    let phone = parts[parts.len() - 2].trim();
    let address = parts[1..parts.len() - 2]
        .iter()
        .map(|p| p.trim())
        .collect::<Vec<_>>()
        .join(", ");
    let address = strip_quotes(address.trim());

    if name.is_empty() || phone.is_empty() {
        return None;
    }

    let mut contact = Contact::new(name, phone);
    if !address.is_empty() {
        contact = contact.with_notes(format!("Address: {address}"));
    }
    Some(contact)
}

/// A row written by our own export: `"Name","Phone",Status,...`.
fn parse_exported_line(line: &str) -> Option<Contact> {
    let parts: Vec<&str> = line.split(',').collect();
    if parts.len() < 3 {
        return None;
    }
    let name = unescape(parts[0].trim());
    let phone = unescape(parts[1].trim());
    if name.trim().is_empty() || phone.trim().is_empty() {
        return None;
    }
    Some(Contact::new(name, phone))
}

fn unescape(field: &str) -> String {
    strip_quotes(field).replace("\"\"", "\"")
}

/// Drop one leading and one trailing double quote, each independently.
fn strip_quotes(s: &str) -> &str {
    let s = s.strip_prefix('"').unwrap_or(s);
    s.strip_suffix('"').unwrap_or(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contacts::model::{DraftStatus, ReplyStatus};

    #[test]
    fn parses_address_with_commas() {
        let contacts = parse_csv("Acme Pharmacy,123 Main St, Suite 2,555-0100,http://x");
        assert_eq!(contacts.len(), 1);
        let c = &contacts[0];
        assert_eq!(c.name, "Acme Pharmacy");
        assert_eq!(c.phone, "555-0100");
        assert_eq!(c.notes.as_deref(), Some("Address: 123 Main St, Suite 2"));
        assert_eq!(c.draft_status, DraftStatus::Idle);
        assert_eq!(c.reply_status, ReplyStatus::Unknown);
        assert!(c.message.is_empty());
    }

    #[test]
    fn skips_header_row() {
        let text = "Name,Address,Phone Number,Google Map Link\nAcme,1 Main St,555-0100,http://x\n";
        let contacts = parse_csv(text);
        assert_eq!(contacts.len(), 1);
        assert_eq!(contacts[0].name, "Acme");
    }

    #[test]
    fn first_row_without_name_is_data() {
        let contacts = parse_csv("Acme,1 Main St,555-0100,http://x");
        assert_eq!(contacts.len(), 1);
    }

    #[test]
    fn three_fields_means_no_address() {
        let contacts = parse_csv("Acme,555-0100,http://x");
        assert_eq!(contacts.len(), 1);
        assert_eq!(contacts[0].phone, "555-0100");
        assert!(contacts[0].notes.is_none());
    }

    #[test]
    fn short_and_blank_rows_are_skipped() {
        let text = "Acme,555-0100\n\n   \n,1 Main St,555-0100,http://x\nCorner,1 Main St, ,http://x\n";
        assert!(parse_csv(text).is_empty());
    }

    #[test]
    fn strips_quotes_around_name() {
        let contacts = parse_csv("\"Acme Pharmacy\",1 Main St,555-0100,http://x");
        assert_eq!(contacts[0].name, "Acme Pharmacy");
    }

    #[test]
    fn handles_crlf_line_endings() {
        let text = "Name,Address,Phone,Link\r\nAcme,1 Main St,555-0100,http://x\r\nCorner,2 Elm,555-0101,http://y\r\n";
        let contacts = parse_csv(text);
        assert_eq!(contacts.len(), 2);
        assert_eq!(contacts[1].name, "Corner");
        assert_eq!(contacts[1].phone, "555-0101");
    }

    #[test]
    fn reads_back_own_export() {
        use crate::csv::export_csv;

        let mut original = vec![
            Contact::new("Acme Pharmacy", "555-0100").with_notes("Address: 1 Main St, Suite 2"),
            Contact::new("Corner Drugs", "(555) 0199"),
        ];
        original[0].message = "Hi, do you have it?".to_string();

        let parsed = parse_csv(&export_csv(&original));
        let pairs: Vec<(String, String)> = parsed.into_iter().map(|c| (c.name, c.phone)).collect();
        assert_eq!(
            pairs,
            vec![
                ("Acme Pharmacy".to_string(), "555-0100".to_string()),
                ("Corner Drugs".to_string(), "(555) 0199".to_string()),
            ]
        );
    }

    #[test]
    fn empty_input_yields_nothing() {
        assert!(parse_csv("").is_empty());
    }
}
