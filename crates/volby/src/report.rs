use std::collections::BTreeSet;
use std::io::Write;

use crate::scraper::WebScraper;
use crate::types::{MunicipalityRef, MunicipalityResult, PartyTally, SummaryStats};

#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error("Failed to write CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Leading columns of every report, ahead of the sorted party columns.
pub const LEADING_COLUMNS: [&str; 5] = ["code", "location", "registered", "envelopes", "valid"];

const UTF8_BOM: &[u8] = b"\xef\xbb\xbf";

/// One municipality's scraped results. Immutable once pushed into a
/// builder; parties the municipality never saw are rendered as 0 when
/// the record is emitted, not written back into the row.
#[derive(Debug, Clone)]
pub struct ReportRow {
    pub code: String,
    pub name: String,
    pub summary: SummaryStats,
    parties: PartyTally,
}

impl ReportRow {
    fn to_record(&self, parties: &[String]) -> Vec<String> {
        let mut record = vec![
            self.code.clone(),
            self.name.clone(),
            self.summary.registered.to_string(),
            self.summary.envelopes.to_string(),
            self.summary.valid_votes.to_string(),
        ];
        record.extend(
            parties
                .iter()
                .map(|p| self.parties.get(p).copied().unwrap_or(0).to_string()),
        );
        record
    }
}

/// Accumulation phase of report assembly: rows in scrape order plus the
/// running union of every party name seen so far.
#[derive(Debug, Default)]
pub struct ReportBuilder {
    party_names: BTreeSet<String>,
    rows: Vec<ReportRow>,
}

impl ReportBuilder {
    pub fn push(&mut self, municipality: &MunicipalityRef, result: MunicipalityResult) {
        self.party_names.extend(result.parties.keys().cloned());
        self.rows.push(ReportRow {
            code: municipality.code.clone(),
            name: municipality.name.clone(),
            summary: result.summary,
            parties: result.parties,
        });
    }

    /// Freezes the accumulated rows into a report with the final sorted
    /// party column set.
    pub fn finish(self) -> Report {
        Report {
            parties: self.party_names.into_iter().collect(),
            rows: self.rows,
        }
    }
}

/// A finished report: the lexicographically sorted party column list
/// and one row per successfully scraped municipality, in scrape order.
#[derive(Debug)]
pub struct Report {
    parties: Vec<String>,
    rows: Vec<ReportRow>,
}

impl Report {
    pub fn parties(&self) -> &[String] {
        &self.parties
    }

    pub fn rows(&self) -> &[ReportRow] {
        &self.rows
    }

    pub fn header(&self) -> Vec<&str> {
        LEADING_COLUMNS
            .iter()
            .copied()
            .chain(self.parties.iter().map(String::as_str))
            .collect()
    }
}

/// Scrapes every municipality in sequence and assembles the report.
///
/// A failing municipality is logged and skipped; it never aborts the
/// run, so a report is produced even when every detail page fails.
pub async fn build_report(scraper: &WebScraper, municipalities: &[MunicipalityRef]) -> Report {
    let mut builder = ReportBuilder::default();

    for municipality in municipalities {
        match scraper.fetch_municipality(&municipality.url).await {
            Ok(result) => {
                log::info!("Scraped {}", municipality);
                builder.push(municipality, result);
            }
            Err(e) => {
                log::warn!("Skipping municipality {}: {}", municipality, e);
            }
        }
    }

    builder.finish()
}

/// Writes the report as semicolon-delimited CSV with a UTF-8 byte-order
/// mark, so spreadsheet applications pick up the encoding.
pub fn write_csv<W: Write>(report: &Report, mut out: W) -> Result<(), WriteError> {
    out.write_all(UTF8_BOM)?;

    let mut writer = csv::WriterBuilder::new().delimiter(b';').from_writer(out);
    writer.write_record(report.header())?;
    for row in report.rows() {
        writer.write_record(row.to_record(report.parties()))?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse_municipality_links, parse_municipality_page};
    use reqwest::Url;

    fn municipality(code: &str, name: &str) -> MunicipalityRef {
        MunicipalityRef {
            code: code.to_string(),
            name: name.to_string(),
            url: format!("https://www.volby.cz/pls/ps2017nss/ps311?xobec={code}"),
        }
    }

    fn result(summary: (u32, u32, u32), parties: &[(&str, u32)]) -> MunicipalityResult {
        MunicipalityResult {
            summary: SummaryStats {
                registered: summary.0,
                envelopes: summary.1,
                valid_votes: summary.2,
            },
            parties: parties
                .iter()
                .map(|(name, votes)| (name.to_string(), *votes))
                .collect(),
        }
    }

    #[test]
    fn columns_cover_the_union_of_all_parties() {
        let mut builder = ReportBuilder::default();
        builder.push(&municipality("1", "A"), result((10, 8, 7), &[("ODS", 3)]));
        builder.push(&municipality("2", "B"), result((20, 16, 14), &[("ANO", 9)]));

        let report = builder.finish();

        assert_eq!(
            report.header(),
            vec!["code", "location", "registered", "envelopes", "valid", "ANO", "ODS"]
        );
        for row in report.rows() {
            assert_eq!(row.to_record(report.parties()).len(), report.header().len());
        }
    }

    #[test]
    fn party_columns_are_sorted_and_deduplicated() {
        let mut builder = ReportBuilder::default();
        builder.push(
            &municipality("1", "A"),
            result((10, 8, 7), &[("ODS", 3), ("ANO", 2), ("KDU", 1)]),
        );
        builder.push(
            &municipality("2", "B"),
            result((20, 16, 14), &[("ANO", 9), ("ODS", 4)]),
        );

        let report = builder.finish();

        let parties = report.parties();
        assert_eq!(parties, ["ANO", "KDU", "ODS"]);
        assert!(parties.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn missing_parties_are_backfilled_with_zero() {
        let mut builder = ReportBuilder::default();
        builder.push(&municipality("1", "A"), result((10, 8, 7), &[("ODS", 3)]));
        builder.push(&municipality("2", "B"), result((20, 16, 14), &[("ANO", 9)]));

        let report = builder.finish();

        let records: Vec<_> = report
            .rows()
            .iter()
            .map(|r| r.to_record(report.parties()))
            .collect();
        // Columns are [.., ANO, ODS].
        assert_eq!(records[0][5], "0");
        assert_eq!(records[0][6], "3");
        assert_eq!(records[1][5], "9");
        assert_eq!(records[1][6], "0");
    }

    #[test]
    fn a_failing_municipality_does_not_exclude_the_others() {
        let good_page = r#"
            <table class="table">
                <tr><th>h</th></tr><tr><th>h</th></tr>
                <tr><td>1</td><td>x</td><td>x</td><td>1000</td><td>800</td>
                    <td>x</td><td>x</td><td>750</td></tr>
            </table>
            <table class="table">
                <tr><th>h</th></tr><tr><th>h</th></tr>
                <tr><td>1</td><td>ODS</td><td>300</td></tr>
            </table>
        "#;
        let broken_page = r#"<table class="table"><tr><td>only one table</td></tr></table>"#;

        let mut builder = ReportBuilder::default();
        for (mref, page) in [
            (municipality("1", "Good"), good_page),
            (municipality("2", "Broken"), broken_page),
            (municipality("3", "Also good"), good_page),
        ] {
            match parse_municipality_page(page) {
                Ok((summary, parties)) => builder.push(&mref, MunicipalityResult { summary, parties }),
                Err(_) => continue,
            }
        }

        let report = builder.finish();
        let codes: Vec<_> = report.rows().iter().map(|r| r.code.as_str()).collect();
        assert_eq!(codes, ["1", "3"]);
    }

    #[test]
    fn an_empty_report_still_writes_a_header() {
        let report = ReportBuilder::default().finish();

        let mut out = Vec::new();
        write_csv(&report, &mut out).expect("should write");

        let text = String::from_utf8(out).expect("utf-8 output");
        assert_eq!(text, "\u{feff}code;location;registered;envelopes;valid\n");
    }

    #[test]
    fn index_and_detail_fixtures_produce_the_expected_csv() {
        let index_page = r#"
            <table class="table">
                <tr><th>h</th></tr><tr><th>h</th></tr>
                <tr><td><a href="detail.html">500054</a></td><td>Praha</td></tr>
            </table>
        "#;
        let detail_page = r#"
            <table class="table">
                <tr><th>h</th></tr><tr><th>h</th></tr>
                <tr><td>1</td><td>x</td><td>x</td><td>1000</td><td>800</td>
                    <td>x</td><td>x</td><td>750</td></tr>
            </table>
            <table class="table">
                <tr><th>h</th></tr><tr><th>h</th></tr>
                <tr><td>1</td><td>ODS</td><td>300</td></tr>
                <tr><td>2</td><td>ANO</td><td>450</td></tr>
            </table>
        "#;

        let base = Url::parse("https://www.volby.cz/pls/ps2017nss/ps32?xjazyk=CZ")
            .expect("valid index url");
        let refs = parse_municipality_links(index_page, &base).expect("should parse index");
        assert_eq!(refs.len(), 1);
        assert_eq!(
            refs[0].url,
            "https://www.volby.cz/pls/ps2017nss/detail.html"
        );

        let (summary, parties) = parse_municipality_page(detail_page).expect("should parse detail");
        let mut builder = ReportBuilder::default();
        builder.push(&refs[0], MunicipalityResult { summary, parties });
        let report = builder.finish();

        let mut out = Vec::new();
        write_csv(&report, &mut out).expect("should write");

        let text = String::from_utf8(out).expect("utf-8 output");
        assert_eq!(
            text,
            "\u{feff}code;location;registered;envelopes;valid;ANO;ODS\n\
             500054;Praha;1000;800;750;450;300\n"
        );
    }
}
