use tracing::{debug, instrument};

use super::{ColumnRef, LinkSuggestion};
use crate::config::LinkConfig;
use crate::schema::Table;

/// Proposes `new_table.c -> t.pk` for each key-like column `c` of the new
/// table and each primary key `pk` of every other table `t`.
///
/// A column is key-like when its lower-cased name is `id` or ends in `_id`.
/// It matches `t` when it equals `{t}_id`, or when trimming trailing `_`,
/// `i` and `d` characters from it gives `t` with trailing `s` characters
/// trimmed. The trim is character based, not linguistic.
///
/// Output order: new-table column order, then table order, then key order.
#[instrument(skip_all, fields(table = %new_table.name))]
pub fn suggest_links_by_name(
    new_table: &Table,
    tables: &[Table],
    config: &LinkConfig,
) -> Vec<LinkSuggestion> {
    let mut suggestions = Vec::new();

    for column in &new_table.columns {
        let name = column.name.to_lowercase();
        if !(name == "id" || name.ends_with("_id")) {
            continue;
        }
        let stem = name.trim_end_matches(['_', 'i', 'd']);

        for table in tables.iter().filter(|t| t.name != new_table.name) {
            let matches = name == format!("{}_id", table.name)
                || stem == table.name.trim_end_matches('s');
            if !matches {
                continue;
            }
            for key in table.primary_keys() {
                let from = ColumnRef::new(&new_table.name, &column.name);
                let to = ColumnRef::new(&table.name, &key.name);
                debug!(%from, %to, "Name heuristic match");
                suggestions.push(LinkSuggestion::new(&from, &to, config.base_confidence));
            }
        }
    }

    suggestions
}
