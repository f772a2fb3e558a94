//! Field extractor - Root Cause and Long Term Solutions from document text
//!
//! Sections are located by matching lines against a configurable header
//! synonym table. A section body runs from its header to the next
//! recognized header (of any kind) or the end of the document. Missing
//! sections are reported as data, never as errors.
//!
//! Header matching uses the canonical (normalized) form of each line while
//! the returned statements keep the source casing, so extraction works on
//! the decoded document text rather than on its normalized form.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::LazyLock;

use crate::core::normalize::canonical_line;

/// Leading numbered-list marker: `1.`, `2)`, `(3)`
static NUMBERED_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:\((\d{1,3})\)|(\d{1,3})[.)])(?:\s+|$)").expect("valid numbered marker regex")
});

/// Leading bullet marker
static BULLET_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[-*+](?:\s+|$)|[•·▪◦–—]\s*)").expect("valid bullet marker regex")
});

/// Section numbering in front of a header, e.g. "3." or "4.1"
static HEADER_NUMBERING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*\d+(?:\.\d+)*[.)]?\s+").expect("valid header numbering regex")
});

/// Bullet glyphs that also separate statements in the middle of a line
const INLINE_BULLETS: &[char] = &['•', '▪', '◦'];

/// Dashes that separate a header from its text, as in "Root Cause - worn seal"
const HEADER_DASHES: &[&str] = &[" - ", " – ", " — "];

/// Words allowed after a synonym when the header has a separator
const MAX_SEPARATED_TRAILING_WORDS: usize = 3;

/// Words allowed after a synonym on a bare title-cased header line
const MAX_TITLE_TRAILING_WORDS: usize = 2;

const TITLE_CONNECTIVES: &[&str] = &["of", "and", "the", "for", "to", "in", "on", "a"];

/// Kinds of sections the extractor recognizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    RootCause,
    LongTermSolutions,
    Workaround,
    ContributingFactors,
    IncidentDate,
    ServicesAffected,
    /// Headers that only terminate the preceding section
    Other,
}

impl SectionKind {
    pub fn all() -> &'static [SectionKind] {
        &[
            SectionKind::RootCause,
            SectionKind::LongTermSolutions,
            SectionKind::Workaround,
            SectionKind::ContributingFactors,
            SectionKind::IncidentDate,
            SectionKind::ServicesAffected,
            SectionKind::Other,
        ]
    }

    /// Built-in header synonyms
    pub fn default_synonyms(&self) -> &'static [&'static str] {
        match self {
            SectionKind::RootCause => &["root cause", "root-cause", "primary cause"],
            SectionKind::LongTermSolutions => &[
                "long term solution",
                "long term solutions",
                "long-term solution",
                "long-term solutions",
                "corrective action",
                "corrective actions",
                "preventive action",
                "preventive actions",
            ],
            SectionKind::Workaround => &[
                "workaround",
                "work around",
                "immediate action",
                "immediate actions",
                "containment action",
            ],
            SectionKind::ContributingFactors => &[
                "contributing factors",
                "contributing factor",
                "contributing process factors",
            ],
            SectionKind::IncidentDate => &["incident date", "date of incident"],
            SectionKind::ServicesAffected => &[
                "services affected",
                "service affected",
                "affected services",
                "affected service",
            ],
            SectionKind::Other => &[
                "description",
                "summary",
                "customer impact",
                "impact",
                "timeline",
                "lessons learned",
                "conclusion",
            ],
        }
    }
}

impl std::fmt::Display for SectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SectionKind::RootCause => write!(f, "root_cause"),
            SectionKind::LongTermSolutions => write!(f, "long_term_solutions"),
            SectionKind::Workaround => write!(f, "workaround"),
            SectionKind::ContributingFactors => write!(f, "contributing_factors"),
            SectionKind::IncidentDate => write!(f, "incident_date"),
            SectionKind::ServicesAffected => write!(f, "services_affected"),
            SectionKind::Other => write!(f, "other"),
        }
    }
}

impl std::str::FromStr for SectionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "root_cause" => Ok(SectionKind::RootCause),
            "long_term_solutions" | "long_term_solution" => Ok(SectionKind::LongTermSolutions),
            "workaround" => Ok(SectionKind::Workaround),
            "contributing_factors" => Ok(SectionKind::ContributingFactors),
            "incident_date" => Ok(SectionKind::IncidentDate),
            "services_affected" => Ok(SectionKind::ServicesAffected),
            "other" => Ok(SectionKind::Other),
            _ => Err(format!(
                "Unknown section: {}. Use root_cause, long_term_solutions, workaround, \
                 contributing_factors, incident_date, services_affected, or other",
                s
            )),
        }
    }
}

/// Header synonym table, keyed by canonical header text
#[derive(Debug, Clone)]
pub struct SectionTable {
    headers: BTreeMap<String, SectionKind>,
}

impl Default for SectionTable {
    fn default() -> Self {
        Self::with_overrides(&BTreeMap::new())
    }
}

impl SectionTable {
    /// Build a table from the built-in synonyms, replacing the synonym set of
    /// every section named in `overrides`
    pub fn with_overrides(overrides: &BTreeMap<SectionKind, Vec<String>>) -> Self {
        let mut headers = BTreeMap::new();
        for kind in SectionKind::all() {
            let synonyms: Vec<String> = match overrides.get(kind) {
                Some(custom) => custom.clone(),
                None => kind.default_synonyms().iter().map(|s| s.to_string()).collect(),
            };
            for synonym in synonyms {
                let key = header_key(&synonym);
                if !key.is_empty() {
                    // First kind to claim a synonym keeps it
                    headers.entry(key).or_insert(*kind);
                }
            }
        }
        Self { headers }
    }

    /// Classify a line; returns the section kind and any text after the
    /// header separator (`:` or a spaced dash)
    ///
    /// A header may carry a few words after its synonym ("Root cause of
    /// failure: worn seal", "Root Cause Analysis"). Without a separator those
    /// words are only accepted on a title-cased line, so prose such as "Root
    /// cause unknown" stays body text.
    pub fn match_header<'a>(&self, line: &'a str) -> Option<(SectionKind, Option<&'a str>)> {
        let trimmed = line.trim();
        if trimmed.is_empty() || BULLET_MARKER.is_match(trimmed) {
            return None;
        }

        let (head, inline) = match split_header(trimmed) {
            Some((head, rest)) => (head, Some(rest.trim())),
            None => (trimmed, None),
        };
        let separated = inline.is_some();
        let inline = inline.filter(|rest| !rest.is_empty());

        // "Long Term Solutions (Actions to prevent recurrence)"
        let head = head.split('(').next().unwrap_or(head);
        let head = head.trim_start_matches(['#', '*', ' ']);
        let head = HEADER_NUMBERING.replace(head, "");

        let key = header_key(&head);
        let words: Vec<&str> = key.split(' ').collect();
        // Longest synonym the header starts with
        let (kind, trailing) = (1..=words.len()).rev().find_map(|n| {
            self.headers
                .get(&words[..n].join(" "))
                .map(|kind| (*kind, words.len() - n))
        })?;

        let accepted = trailing == 0
            || (separated && trailing <= MAX_SEPARATED_TRAILING_WORDS)
            || (trailing <= MAX_TITLE_TRAILING_WORDS && is_title_case(&head));
        accepted.then_some((kind, inline))
    }

    /// Number of distinct header keys
    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }
}

/// Split a header line at `:`, or failing that at the first spaced dash
fn split_header(line: &str) -> Option<(&str, &str)> {
    if let Some(split) = line.split_once(':') {
        return Some(split);
    }
    HEADER_DASHES
        .iter()
        .filter_map(|dash| line.find(dash).map(|at| (at, dash.len())))
        .min()
        .map(|(at, len)| (&line[..at], &line[at + len..]))
}

/// Every word starts with a capital, apart from short connectives
fn is_title_case(text: &str) -> bool {
    text.split_whitespace().all(|word| {
        TITLE_CONNECTIVES.contains(&word.to_lowercase().as_str())
            || word
                .chars()
                .find(|c| c.is_alphanumeric())
                .map_or(true, |c| !c.is_alphabetic() || c.is_uppercase())
    })
}

fn header_key(text: &str) -> String {
    canonical_line(text)
        .trim_end_matches(['.', '!', '?'])
        .trim()
        .to_string()
}

/// Fields extracted from one document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedFields {
    /// Stated root cause; absent when no root cause header was found
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_cause: Option<String>,

    /// Long term solution statements in document order
    #[serde(default)]
    pub long_term_solutions: Vec<String>,

    /// Workaround (actions taken to restore service)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workaround: Option<String>,

    /// Contributing factors
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contributing_factors: Option<String>,

    /// Incident date as written in the document
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub incident_date: Option<String>,

    /// Services affected by the incident
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub services_affected: Option<String>,

    /// Root cause missing; a person must review the document
    #[serde(default)]
    pub needs_review: bool,

    /// The document had a long term solutions header
    #[serde(default)]
    pub solutions_section_found: bool,
}

/// Section-header based field extractor
#[derive(Debug, Clone, Default)]
pub struct FieldExtractor {
    table: SectionTable,
}

impl FieldExtractor {
    pub fn new(table: SectionTable) -> Self {
        Self { table }
    }

    /// Extract Root Cause, Long Term Solutions and the supplementary sections
    pub fn extract(&self, document: &str) -> ExtractedFields {
        let mut bodies: BTreeMap<SectionKind, Vec<String>> = BTreeMap::new();
        let mut seen: HashSet<SectionKind> = HashSet::new();
        // Section currently collecting lines; None while outside a wanted section
        let mut current: Option<SectionKind> = None;

        for line in document.lines() {
            if let Some((kind, inline)) = self.table.match_header(line) {
                if kind == SectionKind::Other || !seen.insert(kind) {
                    if kind != SectionKind::Other {
                        tracing::debug!(section = %kind, "ignoring repeated section header");
                    }
                    current = None;
                    continue;
                }
                let body = bodies.entry(kind).or_default();
                if let Some(text) = inline {
                    body.push(text.to_string());
                }
                current = Some(kind);
                continue;
            }

            if let Some(kind) = current {
                bodies.entry(kind).or_default().push(line.to_string());
            }
        }

        let root_cause = bodies.get(&SectionKind::RootCause).and_then(|b| join_prose(b));
        let long_term_solutions = bodies
            .get(&SectionKind::LongTermSolutions)
            .map(|b| split_statements(b))
            .unwrap_or_default();

        let fields = ExtractedFields {
            needs_review: root_cause.is_none(),
            solutions_section_found: seen.contains(&SectionKind::LongTermSolutions),
            root_cause,
            long_term_solutions,
            workaround: bodies.get(&SectionKind::Workaround).and_then(|b| join_prose(b)),
            contributing_factors: bodies
                .get(&SectionKind::ContributingFactors)
                .and_then(|b| join_prose(b)),
            incident_date: bodies.get(&SectionKind::IncidentDate).and_then(|b| join_prose(b)),
            services_affected: bodies
                .get(&SectionKind::ServicesAffected)
                .and_then(|b| join_prose(b)),
        };

        tracing::debug!(
            root_cause = fields.root_cause.is_some(),
            solutions = fields.long_term_solutions.len(),
            "extracted fields"
        );
        fields
    }
}

/// Collapse whitespace inside a line
fn collapse(line: &str) -> String {
    line.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Remove one leading list marker
fn strip_marker(line: &str) -> &str {
    if let Some(m) = NUMBERED_MARKER.find(line) {
        return line[m.end()..].trim_start();
    }
    if let Some(m) = BULLET_MARKER.find(line) {
        return line[m.end()..].trim_start();
    }
    line
}

/// Join prose lines into one paragraph; None when nothing remains
fn join_prose(lines: &[String]) -> Option<String> {
    let parts: Vec<String> = lines
        .iter()
        .map(|l| collapse(strip_marker(&collapse(l))))
        .filter(|l| !l.is_empty())
        .collect();
    (!parts.is_empty()).then(|| parts.join(" "))
}

/// Split a solutions body into discrete statements
fn split_statements(lines: &[String]) -> Vec<String> {
    let mut statements = Vec::new();
    for line in lines {
        for piece in line.split(INLINE_BULLETS) {
            for statement in split_numbered_run(&collapse(piece)) {
                let cleaned = collapse(strip_marker(&statement));
                let cleaned = cleaned.trim_end_matches([';', ',']).trim();
                if !cleaned.is_empty() {
                    statements.push(cleaned.to_string());
                }
            }
        }
    }
    statements
}

/// Split "1. first 2. second" into its items. Only consecutive numbers split
/// a line, so figures inside a sentence stay put.
fn split_numbered_run(line: &str) -> Vec<String> {
    let Some(caps) = NUMBERED_MARKER.captures(line) else {
        return vec![line.to_string()];
    };
    let Some(mut number) = caps
        .get(1)
        .or_else(|| caps.get(2))
        .and_then(|m| m.as_str().parse::<u32>().ok())
    else {
        return vec![line.to_string()];
    };

    let mut items = Vec::new();
    let mut rest = line;
    loop {
        number += 1;
        match find_marker(rest, number) {
            Some(at) => {
                items.push(rest[..at].to_string());
                rest = rest[at..].trim_start();
            }
            None => {
                items.push(rest.to_string());
                break;
            }
        }
    }
    items
}

/// Position of the list marker for `number` preceded by a space
fn find_marker(text: &str, number: u32) -> Option<usize> {
    [
        format!(" {}. ", number),
        format!(" {}) ", number),
        format!(" ({}) ", number),
    ]
    .iter()
    .filter_map(|marker| text.find(marker.as_str()))
    .min()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(doc: &str) -> ExtractedFields {
        FieldExtractor::default().extract(doc)
    }

    #[test]
    fn test_inline_headers_and_numbered_run() {
        let doc = "Root Cause: Bearing seal failure due to contamination\n\
                   Long Term Solutions: 1. Install inline filter 2. Revise maintenance interval";
        let fields = extract(doc);
        assert_eq!(
            fields.root_cause.as_deref(),
            Some("Bearing seal failure due to contamination")
        );
        assert_eq!(
            fields.long_term_solutions,
            vec!["Install inline filter", "Revise maintenance interval"]
        );
        assert!(!fields.needs_review);
    }

    #[test]
    fn test_bullets_preserve_order() {
        let doc = "Root Cause\nWorn gasket\nCorrective Actions\n- A\n* B\n• C\n";
        let fields = extract(doc);
        assert_eq!(fields.long_term_solutions, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_section_ends_at_next_header() {
        let doc = "Root Cause\n\
                   The issue was caused by a flag in HSS/HLR.\n\
                   This behaviour is specific to E&.\n\
                   Contributing Process Factors\n\
                   Re-test was never triggered.\n\
                   Workaround (Actions to restore service)\n\
                   Flag disabled.\n\
                   Long Term Solutions (Actions to prevent recurrence)\n\
                   Validate end-to-end connectivity before joint testing.\n\
                   Customer Testing Gates:\n\
                   Formal sign-off by all departments.";
        let fields = extract(doc);
        assert_eq!(
            fields.root_cause.as_deref(),
            Some("The issue was caused by a flag in HSS/HLR. This behaviour is specific to E&.")
        );
        assert_eq!(
            fields.contributing_factors.as_deref(),
            Some("Re-test was never triggered.")
        );
        assert_eq!(fields.workaround.as_deref(), Some("Flag disabled."));
        assert_eq!(
            fields.long_term_solutions,
            vec![
                "Validate end-to-end connectivity before joint testing.",
                "Customer Testing Gates:",
                "Formal sign-off by all departments.",
            ]
        );
    }

    #[test]
    fn test_missing_root_cause_flags_review() {
        let fields = extract("Description\nPump tripped twice.\nCorrective action\n1. Replace pump");
        assert!(fields.root_cause.is_none());
        assert!(fields.needs_review);
        assert_eq!(fields.long_term_solutions, vec!["Replace pump"]);
    }

    #[test]
    fn test_empty_solutions_section() {
        let fields = extract("Root cause: operator error\nLong term solution:\n\n  \n- \n");
        assert!(fields.solutions_section_found);
        assert!(fields.long_term_solutions.is_empty());
        assert_eq!(fields.root_cause.as_deref(), Some("operator error"));
    }

    #[test]
    fn test_no_sections_at_all() {
        let fields = extract("Just some notes about the outage.");
        assert_eq!(fields.root_cause, None);
        assert!(fields.long_term_solutions.is_empty());
        assert!(!fields.solutions_section_found);
        assert!(fields.needs_review);
    }

    #[test]
    fn test_first_root_cause_header_wins() {
        let doc = "Root Cause: first explanation\nDescription\nx\nRoot Cause: second explanation";
        assert_eq!(extract(doc).root_cause.as_deref(), Some("first explanation"));
    }

    #[test]
    fn test_repeated_header_stops_previous_section() {
        let doc = "Root Cause: valve stuck\nLong Term Solutions\n- Replace valve\nRoot Cause\nignored text";
        let fields = extract(doc);
        assert_eq!(fields.long_term_solutions, vec!["Replace valve"]);
        assert_eq!(fields.root_cause.as_deref(), Some("valve stuck"));
    }

    #[test]
    fn test_header_decorations() {
        let doc = "## 3. ROOT-CAUSE\nLoose wiring\n**Preventive Actions**\n1) Torque check\n2) Add audit";
        let fields = extract(doc);
        assert_eq!(fields.root_cause.as_deref(), Some("Loose wiring"));
        assert_eq!(fields.long_term_solutions, vec!["Torque check", "Add audit"]);
    }

    #[test]
    fn test_figures_inside_statement_do_not_split() {
        let doc = "Long term solutions\n1. Keep pressure below 5. Then recheck the 3. seal";
        let fields = extract(doc);
        assert_eq!(
            fields.long_term_solutions,
            vec!["Keep pressure below 5. Then recheck the 3. seal"]
        );
    }

    #[test]
    fn test_sentence_starting_with_synonym_is_not_header() {
        let doc = "Long term solutions\n- Corrective actions must be reviewed monthly\n- Add owner";
        let fields = extract(doc);
        assert_eq!(
            fields.long_term_solutions,
            vec!["Corrective actions must be reviewed monthly", "Add owner"]
        );
    }

    #[test]
    fn test_custom_synonyms_replace_defaults() {
        let mut overrides = BTreeMap::new();
        overrides.insert(SectionKind::RootCause, vec!["Cause Analysis".to_string()]);
        let extractor = FieldExtractor::new(SectionTable::with_overrides(&overrides));

        let fields = extractor.extract("Cause Analysis: corroded terminal\nRoot Cause: not a header");
        assert_eq!(
            fields.root_cause.as_deref(),
            Some("corroded terminal Root Cause: not a header")
        );
    }

    #[test]
    fn test_section_kind_from_str() {
        assert_eq!("root_cause".parse::<SectionKind>().unwrap(), SectionKind::RootCause);
        assert_eq!(
            "long-term-solutions".parse::<SectionKind>().unwrap(),
            SectionKind::LongTermSolutions
        );
        assert!("symptoms".parse::<SectionKind>().is_err());
    }
    #[test]
    fn test_incident_date_and_services_affected() {
        let doc = "Incident Date\n\
                   09/02/2026\n\
                   Services Affected\n\
                   Mobile Data Service (Nissan APN) in UAE – Etisalat (E&)\n\
                   Customer Impact\n\
                   No data sessions.\n\
                   Root Cause\n\
                   Flag set in HSS.";
        let fields = extract(doc);
        assert_eq!(fields.incident_date.as_deref(), Some("09/02/2026"));
        assert_eq!(
            fields.services_affected.as_deref(),
            Some("Mobile Data Service (Nissan APN) in UAE – Etisalat (E&)")
        );
        assert_eq!(fields.root_cause.as_deref(), Some("Flag set in HSS."));
    }

    #[test]
    fn test_old_extraction_without_metadata_loads() {
        let yaml = "root_cause: worn seal\nlong_term_solutions: [Replace seal]\n";
        let fields: ExtractedFields = serde_yml::from_str(yaml).unwrap();
        assert_eq!(fields.incident_date, None);
        assert_eq!(fields.services_affected, None);
        assert!(!serde_yml::to_string(&fields).unwrap().contains("incident_date"));
    }

    #[test]
    fn test_dash_separated_header() {
        let fields = extract("Root Cause - worn seal\nCorrective Actions – 1. Replace seal");
        assert_eq!(fields.root_cause.as_deref(), Some("worn seal"));
        assert_eq!(fields.long_term_solutions, vec!["Replace seal"]);
    }

    #[test]
    fn test_header_with_trailing_words() {
        let fields = extract("Root cause of failure: worn seal\nLong Term Solutions\n- Replace seal");
        assert_eq!(fields.root_cause.as_deref(), Some("worn seal"));

        let fields = extract("Root Cause Analysis\nThe seal was worn.\nCorrective Actions Taken\n- Replace seal");
        assert_eq!(fields.root_cause.as_deref(), Some("The seal was worn."));
        assert_eq!(fields.long_term_solutions, vec!["Replace seal"]);
    }

    #[test]
    fn test_prose_starting_with_synonym_stays_body() {
        let doc = "Root Cause\nWorn seal.\nRoot cause unknown until teardown.\nRoot cause was confirmed later";
        let fields = extract(doc);
        assert_eq!(
            fields.root_cause.as_deref(),
            Some("Worn seal. Root cause unknown until teardown. Root cause was confirmed later")
        );
    }

    #[test]
    fn test_body_dash_is_not_a_separator() {
        let doc = "Workaround\nPump - restarted manually\nRoot Cause: seal";
        let fields = extract(doc);
        assert_eq!(fields.workaround.as_deref(), Some("Pump - restarted manually"));
        assert_eq!(fields.root_cause.as_deref(), Some("seal"));
    }
}
