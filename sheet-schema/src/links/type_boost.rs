use tracing::{debug, instrument};

use super::{ColumnRef, LinkSuggestion};
use crate::config::LinkConfig;
use crate::schema::{SemanticType, Table};

/// Raises the confidence of every suggestion whose two endpoints have the
/// same inferred type. Suggestions with an endpoint that cannot be resolved
/// in `tables` pass through unchanged.
#[instrument(skip_all, fields(suggestions = suggestions.len()))]
pub fn boost_links_by_type(
    mut suggestions: Vec<LinkSuggestion>,
    tables: &[Table],
    config: &LinkConfig,
) -> Vec<LinkSuggestion> {
    for suggestion in &mut suggestions {
        let from = suggestion.from_ref().ok().and_then(|r| resolve_type(tables, &r));
        let to = suggestion.to_ref().ok().and_then(|r| resolve_type(tables, &r));

        match (from, to) {
            (Some(a), Some(b)) if a == b => {
                suggestion.raise(config.type_match_boost, config.clamp_confidence);
                debug!(
                    from = %suggestion.from,
                    to = %suggestion.to,
                    semantic_type = %a,
                    confidence = suggestion.confidence,
                    "Type match boost"
                );
            }
            (Some(_), Some(_)) => {}
            _ => debug!(
                from = %suggestion.from,
                to = %suggestion.to,
                "Endpoint type unresolved, passing through"
            ),
        }
    }
    suggestions
}

fn resolve_type(tables: &[Table], reference: &ColumnRef) -> Option<SemanticType> {
    tables
        .iter()
        .filter(|t| t.name == reference.table)
        .find_map(|t| t.column(&reference.column))
        .map(|c| c.inferred_type)
}
