use std::collections::HashMap;

use reqwest::Url;
use scraper::{ElementRef, Html, Selector};

use crate::types::{MunicipalityRef, PartyTally, SummaryStats};

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("No results tables found on the page")]
    NoTablesFound,
    #[error("Municipality page has {0} results tables, expected at least 2")]
    InsufficientTables(usize),
    #[error("Summary table has {0} cells, expected at least {MIN_SUMMARY_CELLS}")]
    MalformedSummary(usize),
    #[error("Failed to parse count: '{0}'")]
    InvalidCount(String),
}

// Fixed layout of the volby.cz results pages. The first table on a
// municipality page is the turnout summary; its cells are addressed by
// position. Every results table starts with a two-row header.
const HEADER_ROWS: usize = 2;
const SUMMARY_REGISTERED_CELL: usize = 3;
const SUMMARY_ENVELOPES_CELL: usize = 4;
const SUMMARY_VALID_CELL: usize = 7;
const MIN_SUMMARY_CELLS: usize = 8;
const PARTY_NAME_CELL: usize = 1;
const PARTY_VOTES_CELL: usize = 2;

fn elem_text(element: ElementRef) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Parses a thousands-separated count as rendered by the site, which
/// mixes non-breaking and ASCII spaces as group separators.
fn parse_count(raw: &str) -> Result<u32, ParseError> {
    let cleaned: String = raw
        .chars()
        .filter(|&c| c != '\u{a0}' && c != ' ')
        .collect();
    cleaned
        .trim()
        .parse()
        .map_err(|_| ParseError::InvalidCount(raw.trim().to_string()))
}

/// Extracts (code, name, detail URL) for every municipality listed on a
/// territorial-unit index page.
///
/// The index may split municipalities across several `table.table`
/// elements laid out side by side; all of them are walked in document
/// order. Rows whose code cell carries no hyperlink (district
/// aggregates) are skipped.
pub fn parse_municipality_links(
    html: &str,
    base_url: &Url,
) -> Result<Vec<MunicipalityRef>, ParseError> {
    let document = Html::parse_document(html);
    let table_selector = Selector::parse("table.table").unwrap();
    let row_selector = Selector::parse("tr").unwrap();
    let cell_selector = Selector::parse("td").unwrap();
    let link_selector = Selector::parse("a[href]").unwrap();

    let tables: Vec<_> = document.select(&table_selector).collect();
    if tables.is_empty() {
        return Err(ParseError::NoTablesFound);
    }

    let mut refs = Vec::new();
    for table in tables {
        for row in table.select(&row_selector).skip(HEADER_ROWS) {
            let cells: Vec<_> = row.select(&cell_selector).collect();
            if cells.len() < 2 {
                continue;
            }
            let Some(href) = cells[0]
                .select(&link_selector)
                .next()
                .and_then(|a| a.value().attr("href"))
            else {
                continue;
            };
            let url = match base_url.join(href) {
                Ok(url) => url.to_string(),
                Err(e) => {
                    log::warn!("Skipping row with unresolvable link '{}': {}", href, e);
                    continue;
                }
            };
            refs.push(MunicipalityRef {
                code: elem_text(cells[0]),
                name: elem_text(cells[1]),
                url,
            });
        }
    }

    Ok(refs)
}

/// Splits a municipality detail page into its turnout summary and the
/// combined party tally of every remaining results table.
pub fn parse_municipality_page(html: &str) -> Result<(SummaryStats, PartyTally), ParseError> {
    let document = Html::parse_document(html);
    let table_selector = Selector::parse("table.table").unwrap();

    let tables: Vec<_> = document.select(&table_selector).collect();
    if tables.len() < 2 {
        return Err(ParseError::InsufficientTables(tables.len()));
    }

    let summary = parse_summary_table(tables[0])?;
    let parties = parse_party_tables(&tables[1..]);
    Ok((summary, parties))
}

/// Reads the positionally-addressed turnout cells of the summary table.
/// Unlike the party tables, these counts are parsed strictly: an
/// unparsable summary value fails the whole municipality.
fn parse_summary_table(table: ElementRef) -> Result<SummaryStats, ParseError> {
    let cell_selector = Selector::parse("td").unwrap();
    let cells: Vec<String> = table.select(&cell_selector).map(elem_text).collect();

    if cells.len() < MIN_SUMMARY_CELLS {
        return Err(ParseError::MalformedSummary(cells.len()));
    }

    Ok(SummaryStats {
        registered: parse_count(&cells[SUMMARY_REGISTERED_CELL])?,
        envelopes: parse_count(&cells[SUMMARY_ENVELOPES_CELL])?,
        valid_votes: parse_count(&cells[SUMMARY_VALID_CELL])?,
    })
}

/// Collects party vote counts from the second and later results tables
/// (the site splits parties across two side-by-side tables).
///
/// Footer and annotation rows share the table structure, so an
/// unparsable count defaults to 0 instead of failing the page. A party
/// name repeated across tables overwrites the earlier count
/// (last-write-wins); this loses data if the site ever legitimately
/// splits one party's votes across tables.
fn parse_party_tables(tables: &[ElementRef]) -> HashMap<String, u32> {
    let row_selector = Selector::parse("tr").unwrap();
    let cell_selector = Selector::parse("td").unwrap();

    let mut parties = HashMap::new();
    for table in tables {
        for row in table.select(&row_selector).skip(HEADER_ROWS) {
            let cells: Vec<_> = row.select(&cell_selector).collect();
            if cells.len() <= PARTY_VOTES_CELL {
                continue;
            }
            let name = elem_text(cells[PARTY_NAME_CELL]);
            let votes = parse_count(&elem_text(cells[PARTY_VOTES_CELL])).unwrap_or(0);
            parties.insert(name, votes);
        }
    }
    parties
}
