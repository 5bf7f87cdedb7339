//! Pattern-based refinement of string columns.
//!
//! The Arrow readers only recognise a handful of literal formats. String
//! columns are sampled here and re-tagged when enough values look like dates,
//! times, booleans or numbers.

use arrow::array::{Array, ArrayRef, AsArray};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::schema::SemanticType;

struct TypePatterns {
    integer: Regex,
    float: Regex,
    date_iso: Regex,
    date_us: Regex,
    date_eu: Regex,
    datetime_iso: Regex,
    time: Regex,
    boolean: Regex,
}

// Hard-coded patterns; compilation cannot fail.
#[allow(clippy::expect_used)]
static PATTERNS: Lazy<TypePatterns> = Lazy::new(|| TypePatterns {
    integer: Regex::new(r"^[+-]?\d+$").expect("valid integer pattern"),
    float: Regex::new(r"^[+-]?(\d+\.?\d*|\.\d+)([eE][+-]?\d+)?$").expect("valid float pattern"),
    date_iso: Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid date pattern"),
    date_us: Regex::new(r"^\d{1,2}/\d{1,2}/\d{4}$").expect("valid date pattern"),
    date_eu: Regex::new(r"^\d{1,2}\.\d{1,2}\.\d{4}$").expect("valid date pattern"),
    datetime_iso: Regex::new(r"^\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}(:\d{2})?").expect("valid datetime pattern"),
    time: Regex::new(r"^\d{1,2}:\d{2}(:\d{2})?(\s?(AM|PM|am|pm))?$").expect("valid time pattern"),
    boolean: Regex::new(r"(?i)^(true|false|yes|no|y|n|t|f)$").expect("valid boolean pattern"),
});

#[derive(Debug, Default)]
struct TypeStats {
    samples: usize,
    integer: usize,
    float: usize,
    temporal: usize,
    boolean: usize,
}

impl TypeStats {
    fn observe(&mut self, value: &str) {
        let p = &*PATTERNS;
        self.samples += 1;

        if p.integer.is_match(value) {
            self.integer += 1;
        } else if p.float.is_match(value) {
            self.float += 1;
        }

        if p.datetime_iso.is_match(value)
            || p.date_iso.is_match(value)
            || p.date_us.is_match(value)
            || p.date_eu.is_match(value)
            || p.time.is_match(value)
        {
            self.temporal += 1;
        }

        if p.boolean.is_match(value) {
            self.boolean += 1;
        }
    }

    fn share(&self, matches: usize) -> f64 {
        matches as f64 / self.samples as f64
    }

    /// Priority: temporal > boolean > integer > float > text.
    fn decide(&self, threshold: f64) -> SemanticType {
        if self.samples == 0 {
            return SemanticType::Text;
        }
        if self.share(self.temporal) >= threshold {
            SemanticType::Datetime
        } else if self.share(self.boolean) >= threshold {
            SemanticType::Boolean
        } else if self.share(self.integer) >= threshold {
            SemanticType::Integer
        } else if self.share(self.integer + self.float) >= threshold {
            SemanticType::Float
        } else {
            SemanticType::Text
        }
    }
}

/// Classifies a string sample.
pub fn classify_values<'a, I>(values: I, threshold: f64) -> SemanticType
where
    I: IntoIterator<Item = &'a str>,
{
    let mut stats = TypeStats::default();
    for value in values {
        let trimmed = value.trim();
        if !trimmed.is_empty() {
            stats.observe(trimmed);
        }
    }
    stats.decide(threshold)
}

/// Refines a string column spread over several arrays, looking at no more
/// than `sample_size` non-null values. Non-string arrays yield `None`.
pub fn refine_string_column(
    arrays: &[ArrayRef],
    sample_size: usize,
    threshold: f64,
) -> Option<SemanticType> {
    let mut sample: Vec<&str> = Vec::with_capacity(sample_size.min(1024));

    for array in arrays {
        if sample.len() >= sample_size {
            break;
        }
        let remaining = sample_size - sample.len();
        if let Some(strings) = array.as_string_opt::<i32>() {
            sample.extend(strings.iter().flatten().take(remaining));
        } else if let Some(strings) = array.as_string_opt::<i64>() {
            sample.extend(strings.iter().flatten().take(remaining));
        } else if let Some(strings) = array.as_string_view_opt() {
            sample.extend(strings.iter().flatten().take(remaining));
        } else {
            return None;
        }
    }

    Some(classify_values(sample, threshold))
}

/// True when any of the arrays holds a null.
pub fn has_nulls(arrays: &[ArrayRef]) -> bool {
    arrays.iter().any(|a| a.null_count() > 0)
}
