use std::collections::{HashMap, HashSet};

use super::outgoing_links;
use crate::error::Result;
use crate::session::Session;

const PYTHON_KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class", "continue",
    "def", "del", "elif", "else", "except", "finally", "for", "from", "global", "if", "import",
    "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return", "try", "while",
    "with", "yield",
];

const HEADER: &[&str] = &[
    "from sqlalchemy import Column, Integer, String, Float, Boolean, DateTime, ForeignKey",
    "from sqlalchemy.orm import declarative_base, relationship",
    "",
    "Base = declarative_base()",
    "",
];

/// SQLAlchemy declarative classes, one per table.
pub fn generate_orm(session: &Session) -> Result<Vec<String>> {
    let mut lines: Vec<String> = HEADER.iter().map(|l| l.to_string()).collect();

    for table in &session.tables {
        let foreign_keys: HashMap<String, String> = outgoing_links(session, &table.name)
            .map(|(from, to)| (from.column, to.to_string()))
            .collect();
        let mut taken: HashSet<String> = table.columns.iter().map(|c| attribute_name(&c.name)).collect();

        lines.push(format!("class {}(Base):", class_name(&table.name)));
        lines.push(format!("    __tablename__ = '{}'", table.name));

        for column in &table.columns {
            let attribute = attribute_name(&column.name);
            let mut args = Vec::new();
            if attribute != column.name {
                args.push(format!("'{}'", column.name));
            }
            args.push(column.inferred_type.orm_type().to_string());
            if let Some(target) = foreign_keys.get(&column.name) {
                args.push(format!("ForeignKey('{target}')"));
            }
            if column.is_primary_key {
                args.push("primary_key=True".to_string());
            }
            if !column.nullable {
                args.push("nullable=False".to_string());
            }
            lines.push(format!("    {attribute} = Column({})", args.join(", ")));
        }

        for (from, to) in outgoing_links(session, &table.name) {
            let name = relationship_name(&from.column, &to.table, &taken);
            lines.push(format!(
                "    {name} = relationship('{}', foreign_keys=[{}])",
                class_name(&to.table),
                attribute_name(&from.column)
            ));
            taken.insert(name);
        }

        lines.push(String::new());
    }

    Ok(lines)
}

/// `order_items` becomes `OrderItems`.
pub(crate) fn class_name(table: &str) -> String {
    let name: String = table
        .split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect();
    match name.chars().next() {
        Some(c) if c.is_ascii_alphabetic() => name,
        _ => format!("Table{name}"),
    }
}

fn attribute_name(column: &str) -> String {
    if PYTHON_KEYWORDS.contains(&column) {
        format!("{column}_")
    } else {
        column.to_string()
    }
}

/// `customer_id` becomes `customer`; falls back to `<column>_<table>` when
/// that is taken.
fn relationship_name(column: &str, target_table: &str, taken: &HashSet<String>) -> String {
    let base = attribute_name(column.strip_suffix("_id").unwrap_or(column));
    if !base.is_empty() && !taken.contains(&base) {
        return base;
    }
    let mut candidate = format!("{column}_{target_table}");
    let mut n = 1;
    while taken.contains(&candidate) {
        n += 1;
        candidate = format!("{column}_{target_table}_{n}");
    }
    candidate
}
