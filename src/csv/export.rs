//! CSV export of the full contact list.

use chrono::{DateTime, Local, NaiveDate, Utc};

use crate::contacts::model::Contact;

/// Header row written by [`export_csv`].
pub const EXPORT_HEADER: &str = "Name,Phone,Status,Response Status,Message,Notes,Last Updated";

/// Render contacts as CSV text, one row per contact in store order.
pub fn export_csv(contacts: &[Contact]) -> String {
    let mut rows = Vec::with_capacity(contacts.len() + 1);
    rows.push(EXPORT_HEADER.to_string());
    rows.extend(contacts.iter().map(export_row));
    rows.join("\n")
}

/// Suggested download name for an export made on `date`.
pub fn export_filename(date: NaiveDate) -> String {
    format!("pharmacy_inquiries_{}.csv", date.format("%Y-%m-%d"))
}

fn export_row(contact: &Contact) -> String {
    let message = contact.message.replace('\n', " ");
    [
        quote(&contact.name),
        quote(&contact.phone),
        contact.draft_status.to_string(),
        contact.reply_status.to_string(),
        quote(&message),
        quote(contact.notes.as_deref().unwrap_or_default()),
        format_date(contact.last_updated),
    ]
    .join(",")
}

/// Wrap in double quotes, doubling any inside.
fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Local calendar date, no time component.
pub(crate) fn format_date(ts: DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format("%-m/%-d/%Y").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contacts::model::{DraftStatus, ReplyStatus};

    #[test]
    fn header_only_for_empty_store() {
        assert_eq!(export_csv(&[]), EXPORT_HEADER);
    }

    #[test]
    fn escapes_quotes_and_collapses_newlines() {
        let mut c = Contact::new("Joe's \"Best\" Pharmacy", "555-0100")
            .with_notes("Address: 1 Main St, Suite 2");
        c.message = "Hi there,\nany \"stock\"?".to_string();
        c.draft_status = DraftStatus::Ready;
        c.reply_status = ReplyStatus::NoReply;

        let csv = export_csv(&[c.clone()]);
        let row = csv.lines().nth(1).unwrap();
        let expected = format!(
            "\"Joe's \"\"Best\"\" Pharmacy\",\"555-0100\",READY,NO_REPLY,\"Hi there, any \"\"stock\"\"?\",\"Address: 1 Main St, Suite 2\",{}",
            format_date(c.last_updated)
        );
        assert_eq!(row, expected);
        assert_eq!(csv.lines().count(), 2);
    }

    #[test]
    fn missing_notes_export_empty() {
        let c = Contact::new("Acme", "555-0100");
        let csv = export_csv(&[c]);
        assert!(csv.lines().nth(1).unwrap().contains(",IDLE,UNKNOWN,\"\",\"\","));
    }

    #[test]
    fn date_has_no_time_component() {
        let c = Contact::new("Acme", "555-0100");
        let date = format_date(c.last_updated);
        assert_eq!(date.matches('/').count(), 2);
        assert!(!date.contains(':'));
    }

    #[test]
    fn filename_uses_iso_date() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 7).unwrap();
        assert_eq!(export_filename(date), "pharmacy_inquiries_2026-03-07.csv");
    }
}
