//! Column header normalization.
//!
//! Raw headers become canonical identifiers: lower-case, runs of
//! non-alphanumeric characters collapsed to one underscore, reserved SQL
//! keywords suffixed, duplicates disambiguated in column order. The output of
//! [`ColumnNormalizer::normalize`] is a fixed point: feeding the canonical
//! names back in returns them unchanged.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

/// Keywords that may not be used verbatim as a column name.
pub const SQL_RESERVED: &[&str] = &[
    "select", "from", "where", "insert", "update", "delete", "create", "drop", "table", "index",
    "join", "order", "group",
];

/// Suffix appended to names that collide with a reserved keyword.
pub const RESERVED_SUFFIX: &str = "_col";

/// Name used when a header has no alphanumeric characters at all.
pub const EMPTY_NAME: &str = "col";

/// Why a column ended up with a name different from its canonical form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenameReason {
    ReservedKeyword,
    Duplicate,
}

/// Result of normalizing a single header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedColumn {
    pub original_name: String,
    pub normalized_name: String,
    /// The name collided with a reserved keyword or with an earlier column.
    pub was_reserved: bool,
    pub rename_reason: Option<RenameReason>,
}

/// Turns raw headers into canonical, unique, SQL-safe identifiers.
#[derive(Debug, Clone, Default)]
pub struct ColumnNormalizer;

impl ColumnNormalizer {
    pub fn new() -> Self {
        Self
    }

    /// Normalizes an ordered list of headers.
    pub fn normalize<S: AsRef<str>>(&self, headers: &[S]) -> Vec<NormalizedColumn> {
        let mut used: HashSet<String> = HashSet::with_capacity(headers.len());
        let mut next_suffix: HashMap<String, usize> = HashMap::new();
        let mut out = Vec::with_capacity(headers.len());

        for header in headers {
            let original = header.as_ref();
            let canonical = canonicalize(original);

            let (base, reserved) = if is_reserved(&canonical) {
                (format!("{canonical}{RESERVED_SUFFIX}"), true)
            } else {
                (canonical, false)
            };

            let (name, duplicate) = if used.contains(&base) {
                let counter = next_suffix.entry(base.clone()).or_insert(0);
                let mut candidate;
                loop {
                    *counter += 1;
                    candidate = format!("{base}_{counter}");
                    if !used.contains(&candidate) {
                        break;
                    }
                }
                (candidate, true)
            } else {
                (base, false)
            };

            used.insert(name.clone());
            let rename_reason = match (reserved, duplicate) {
                (_, true) => Some(RenameReason::Duplicate),
                (true, false) => Some(RenameReason::ReservedKeyword),
                (false, false) => None,
            };
            out.push(NormalizedColumn {
                original_name: original.to_string(),
                normalized_name: name,
                was_reserved: reserved || duplicate,
                rename_reason,
            });
        }

        out
    }

    /// Convenience wrapper returning only the canonical names.
    pub fn normalize_names<S: AsRef<str>>(&self, headers: &[S]) -> Vec<String> {
        self.normalize(headers)
            .into_iter()
            .map(|c| c.normalized_name)
            .collect()
    }
}

/// Canonical form of a single identifier, without reserved-word or
/// duplicate handling.
pub fn canonicalize(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    let mut name = String::with_capacity(lowered.len());
    let mut pending_sep = false;

    for ch in lowered.chars() {
        if ch.is_alphanumeric() {
            if pending_sep && !name.is_empty() {
                name.push('_');
            }
            pending_sep = false;
            name.push(ch);
        } else {
            pending_sep = true;
        }
    }

    if name.is_empty() {
        return EMPTY_NAME.to_string();
    }
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        return format!("{EMPTY_NAME}_{name}");
    }
    name
}

/// Normalizes a table name (file stem or rename request).
///
/// Reserved table names get a `_tbl` suffix so they never need quoting.
pub fn normalize_table_name(raw: &str) -> String {
    let canonical = canonicalize(raw);
    if SQL_RESERVED.contains(&canonical.as_str()) {
        format!("{canonical}_tbl")
    } else {
        canonical
    }
}

/// Reserved when the name is a keyword, or its leading `_`-separated token is
/// a keyword and no token marks it as already fixed up (`col`) or as a key
/// reference (`id`). Key references stay untouched so the link heuristics
/// still see them.
pub fn is_reserved(name: &str) -> bool {
    if SQL_RESERVED.contains(&name) {
        return true;
    }
    let mut tokens = name.split('_');
    let leading = tokens.next().unwrap_or_default();
    SQL_RESERVED.contains(&leading) && tokens.all(|t| t != "col" && t != "id")
}
