use anyhow::{Context, Result};
use serde::Deserialize;
use std::io::Read;
use std::path::Path;

use crate::utils::sanitize_filename;

/// Columns every contact dataset must carry
pub const REQUIRED_COLUMNS: [&str; 6] = ["Name", "Job Title", "Email", "Phone", "Company", "bg_color"];

/// One row of the contact dataset
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ContactRecord {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Job Title")]
    pub title: String,
    #[serde(rename = "Email")]
    pub email: String,
    #[serde(rename = "Phone")]
    pub phone: String,
    #[serde(rename = "Company")]
    pub company: String,
    /// Hex background colour, empty for the configured default
    #[serde(rename = "bg_color")]
    pub bg_color: String,
    #[serde(rename = "Profile image path or url", default)]
    pub profile_image: String,
    #[serde(rename = "linkedinUrl", default)]
    pub linkedin_url: String,
}

/// A dataset row: its 1-based position and the parsed record, or why it
/// could not be parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactRow {
    pub row: usize,
    pub record: std::result::Result<ContactRecord, String>,
}

/// Read all rows of a CSV contact dataset
///
/// A missing file or a missing required column is an error; a single
/// malformed row is returned as a failed `ContactRow`.
pub fn read_contacts(path: &Path) -> Result<Vec<ContactRow>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open contact file: {}", path.display()))?;
    read_contacts_from(file).with_context(|| format!("Failed to read contacts from {}", path.display()))
}

pub fn read_contacts_from<R: Read>(reader: R) -> Result<Vec<ContactRow>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers = csv_reader.headers().context("Failed to read CSV header")?.clone();
    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|column| !headers.iter().any(|h| h == *column))
        .collect();
    if !missing.is_empty() {
        return Err(anyhow::anyhow!("Missing required column(s): {}", missing.join(", ")));
    }

    let rows = csv_reader
        .deserialize::<ContactRecord>()
        .enumerate()
        .map(|(index, record)| ContactRow {
            row: index + 1,
            record: record.map_err(|e| e.to_string()),
        })
        .collect();

    Ok(rows)
}

/// Card file name for a contact: spaces become underscores, characters that
/// are unsafe in file names are replaced, and `_card.png` is appended
pub fn output_filename(name: &str) -> String {
    let stem = sanitize_filename(&name.trim().replace(' ', "_"));
    let stem = if stem.is_empty() { "contact".to_string() } else { stem };
    format!("{}_card.png", stem)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "Name,Job Title,Email,Phone,Company,bg_color";

    #[test]
    fn test_output_filename() {
        assert_eq!(output_filename("Mary Ann Smith"), "Mary_Ann_Smith_card.png");
        assert_eq!(output_filename("Jane"), "Jane_card.png");
        assert_eq!(output_filename("  Jane Doe  "), "Jane_Doe_card.png");
        assert_eq!(output_filename("AC/DC"), "AC_DC_card.png");
        assert_eq!(output_filename("José Núñez"), "José_Núñez_card.png");
        assert_eq!(output_filename(""), "contact_card.png");
    }

    #[test]
    fn test_optional_columns_default_to_empty() {
        let csv = format!("{}\nJane Doe,Engineer,j@acme.com,15551234567,Acme,#5046e3\n", HEADER);
        let rows = read_contacts_from(csv.as_bytes()).unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].row, 1);
        let record = rows[0].record.as_ref().unwrap();
        assert_eq!(record.name, "Jane Doe");
        assert_eq!(record.phone, "15551234567");
        assert_eq!(record.profile_image, "");
        assert_eq!(record.linkedin_url, "");
    }

    #[test]
    fn test_all_columns() {
        let csv = "Name,Job Title,Email,Phone,Company,bg_color,Profile image path or url,linkedinUrl\n\
                   Jane Doe,Engineer,j@acme.com,15551234567,Acme,,https://example.com/j.png,https://linkedin.com/in/jane\n";
        let rows = read_contacts_from(csv.as_bytes()).unwrap();
        let record = rows[0].record.as_ref().unwrap();

        assert_eq!(record.bg_color, "");
        assert_eq!(record.profile_image, "https://example.com/j.png");
        assert_eq!(record.linkedin_url, "https://linkedin.com/in/jane");
    }

    #[test]
    fn test_quoted_fields_and_whitespace() {
        let csv = format!(
            "{}\n\"Doe, Jane\", Engineer ,j@acme.com,15551234567,\"Acme, Inc.\",#fff\n",
            HEADER
        );
        let rows = read_contacts_from(csv.as_bytes()).unwrap();
        let record = rows[0].record.as_ref().unwrap();

        assert_eq!(record.name, "Doe, Jane");
        assert_eq!(record.title, "Engineer");
        assert_eq!(record.company, "Acme, Inc.");
    }

    #[test]
    fn test_missing_required_column_is_an_error() {
        let csv = "Name,Email\nJane,j@acme.com\n";
        let err = read_contacts_from(csv.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("Job Title"));
    }

    #[test]
    fn test_short_row_fails_alone() {
        let csv = format!(
            "{}\nJane Doe,Engineer,j@acme.com,15551234567,Acme,#5046e3\nBroken Row,Engineer\nJohn Roe,CTO,r@acme.com,15550000000,Acme,#000\n",
            HEADER
        );
        let rows = read_contacts_from(csv.as_bytes()).unwrap();

        assert_eq!(rows.len(), 3);
        assert!(rows[0].record.is_ok());
        assert!(rows[1].record.is_err());
        assert_eq!(rows[1].row, 2);
        assert_eq!(rows[2].record.as_ref().unwrap().name, "John Roe");
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(read_contacts(Path::new("/nonexistent/contacts.csv")).is_err());
    }
}
