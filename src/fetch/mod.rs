// src/fetch/mod.rs

use anyhow::{Context, Result};
use csv::ReaderBuilder;
use reqwest::Client;
use tracing::debug;
use url::Url;

/// One spreadsheet tab as exported, before any reshaping: ordered rows of
/// ordered stringish cells. The first rows carry title and legend text, not
/// data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSheet {
    pub rows: Vec<Vec<String>>,
}

const EXPORT_BASE: &str = "https://docs.google.com/spreadsheets/d/";

/// CSV export endpoint for one tab of the report spreadsheet.
pub fn export_url(report_id: &str, gid: &str) -> Result<Url> {
    let mut url = Url::parse(EXPORT_BASE)?
        .join(&format!("{}/export", report_id))
        .with_context(|| format!("building export URL for report {:?}", report_id))?;
    url.query_pairs_mut()
        .append_pair("format", "csv")
        .append_pair("gid", gid);
    Ok(url)
}

/// Download one tab and parse it into rows. The export needs no
/// authentication; a non-success status or a malformed body fails the sheet.
pub async fn fetch_sheet(client: &Client, report_id: &str, gid: &str) -> Result<RawSheet> {
    let url = export_url(report_id, gid)?;
    debug!(%url, gid, "downloading sheet export");

    let body = client
        .get(url.clone())
        .send()
        .await
        .with_context(|| format!("requesting {}", url))?
        .error_for_status()
        .with_context(|| format!("export of sheet gid {} was refused", gid))?
        .text()
        .await
        .with_context(|| format!("reading export body of sheet gid {}", gid))?;

    parse_export(&body).with_context(|| format!("parsing CSV export of sheet gid {}", gid))
}

/// Parse an export body into rows. Rows keep their original order and widths;
/// the title block makes the row lengths uneven, so the reader stays flexible
/// and nothing is treated as a header here.
pub fn parse_export(body: &str) -> Result<RawSheet> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(body.as_bytes());

    let mut rows = Vec::new();
    for (idx, result) in rdr.records().enumerate() {
        let record = result.with_context(|| format!("CSV parse error at record {}", idx))?;
        rows.push(record.iter().map(|cell| cell.to_string()).collect());
    }
    Ok(RawSheet { rows })
}
