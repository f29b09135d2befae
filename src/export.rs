use crate::models::HomeRecord;
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use clap::ValueEnum;
use std::path::{Path, PathBuf};

/// Exported columns, in order
pub const EXPORT_COLUMNS: [&str; 25] = [
    "address",
    "price",
    "type",
    "number_of_bedrooms",
    "number_of_bathrooms",
    "sqft",
    "home_details_link",
    "listing_provided_by",
    "listing_provider_name",
    "listing_provider_phone",
    "property_taxes_last_year",
    "estimated_monthly_cost",
    "property_taxes_monthly",
    "hoa_fees",
    "zestimate_sell_price",
    "zestimate_rent_price",
    "elementary_school_name",
    "elementary_school_rating",
    "elementary_school_link",
    "middle_school_name",
    "middle_school_rating",
    "middle_school_link",
    "high_school_name",
    "high_school_rating",
    "high_school_link",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    /// Format implied by a file extension; CSV unless it says JSON
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => ExportFormat::Json,
            _ => ExportFormat::Csv,
        }
    }
}

/// `<timestamp>_listing_results.csv`
pub fn default_output_path(now: DateTime<Utc>) -> PathBuf {
    PathBuf::from(format!("{}_listing_results.csv", now.format("%Y-%m-%dT%H-%M-%S")))
}

/// Write all records to `path`
pub async fn write_records(path: &Path, format: ExportFormat, records: &[HomeRecord]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let contents = match format {
        ExportFormat::Csv => to_csv(records)?,
        ExportFormat::Json => serde_json::to_string_pretty(records)?,
    };

    tokio::fs::write(path, contents)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

/// CSV with a header row even when there are no records
fn to_csv(records: &[HomeRecord]) -> Result<String> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());

    writer.write_record(EXPORT_COLUMNS)?;
    for record in records {
        writer.serialize(record)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|err| anyhow!("Failed to flush CSV output: {}", err.error()))?;
    String::from_utf8(bytes).context("CSV output is not UTF-8")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record() -> HomeRecord {
        HomeRecord {
            address: Some("12 Elm St, Austin, TX".to_string()),
            price: Some("$450,000".to_string()),
            home_type: Some("House for sale".to_string()),
            sqft: Some("1,450".to_string()),
            listing_provider_name: Some("Jane Realtor".to_string()),
            high_school_link: Some("https://www.greatschools.org/high".to_string()),
            ..HomeRecord::default()
        }
    }

    #[test]
    fn test_csv_columns_match_record_fields() {
        let csv = to_csv(&[record()]).unwrap();
        let mut reader = csv::Reader::from_reader(csv.as_bytes());

        let headers: Vec<String> = reader.headers().unwrap().iter().map(str::to_string).collect();
        assert_eq!(headers, EXPORT_COLUMNS);

        let rows: Vec<HomeRecord> = reader.deserialize().map(|row| row.unwrap()).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].address.as_deref(), Some("12 Elm St, Austin, TX"));
        assert_eq!(rows[0].home_type.as_deref(), Some("House for sale"));
        assert_eq!(rows[0].number_of_bedrooms, None);
        assert_eq!(rows[0].high_school_link.as_deref(), Some("https://www.greatschools.org/high"));
    }

    #[test]
    fn test_empty_export_still_has_header() {
        let csv = to_csv(&[]).unwrap();
        assert_eq!(csv.trim_end(), EXPORT_COLUMNS.join(","));
    }

    #[test]
    fn test_format_and_default_path() {
        assert_eq!(ExportFormat::from_path(Path::new("out/homes.JSON")), ExportFormat::Json);
        assert_eq!(ExportFormat::from_path(Path::new("homes.csv")), ExportFormat::Csv);
        assert_eq!(ExportFormat::from_path(Path::new("homes")), ExportFormat::Csv);

        let now = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 0).unwrap();
        assert_eq!(
            default_output_path(now),
            PathBuf::from("2024-03-09T14-05-00_listing_results.csv")
        );
    }

    #[tokio::test]
    async fn test_write_json_file() {
        let dir = std::env::temp_dir().join(format!("listing-scout-export-{}", std::process::id()));
        let path = dir.join("homes.json");

        write_records(&path, ExportFormat::Json, &[record()]).await.unwrap();

        let written = tokio::fs::read_to_string(&path).await.unwrap();
        let parsed: Vec<HomeRecord> = serde_json::from_str(&written).unwrap();
        assert_eq!(parsed, vec![record()]);
        assert!(written.contains("\"type\": \"House for sale\""));

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}
