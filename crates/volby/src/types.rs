use std::collections::HashMap;
use std::fmt::Display;

/// Party name to vote count, scoped to a single municipality page.
pub type PartyTally = HashMap<String, u32>;

/// One municipality row discovered on a territorial-unit index page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MunicipalityRef {
    /// Numeric municipality code, unique within the territorial unit.
    pub code: String,
    pub name: String,
    /// Absolute URL of the municipality's detail page.
    pub url: String,
}

impl Display for MunicipalityRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} - {}", self.code, self.name)
    }
}

/// Turnout counts from the first results table on a municipality page.
///
/// Well-formed source data satisfies `envelopes <= registered` and
/// `valid_votes <= envelopes`; this is not enforced here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummaryStats {
    pub registered: u32,
    pub envelopes: u32,
    pub valid_votes: u32,
}

/// Everything scraped from one municipality detail page.
#[derive(Debug, Clone)]
pub struct MunicipalityResult {
    pub summary: SummaryStats,
    pub parties: PartyTally,
}
