use super::outgoing_links;
use crate::error::Result;
use crate::security::SqlSecurity;
use crate::session::Session;

/// One `CREATE TABLE` per table, followed by a blank line.
pub fn generate_sql(session: &Session) -> Result<Vec<String>> {
    let mut lines = Vec::new();

    for table in &session.tables {
        let mut defs = Vec::with_capacity(table.columns.len());
        for column in &table.columns {
            let mut def = format!(
                "{} {}",
                SqlSecurity::ddl_identifier(&column.name)?,
                column.inferred_type.sql_type()
            );
            if !column.nullable {
                def.push_str(" NOT NULL");
            }
            if column.is_primary_key {
                def.push_str(" PRIMARY KEY");
            }
            defs.push(def);
        }

        for (from, to) in outgoing_links(session, &table.name) {
            defs.push(format!(
                "FOREIGN KEY ({}) REFERENCES {}({})",
                SqlSecurity::ddl_identifier(&from.column)?,
                SqlSecurity::ddl_identifier(&to.table)?,
                SqlSecurity::ddl_identifier(&to.column)?
            ));
        }

        lines.push(format!(
            "CREATE TABLE {} (",
            SqlSecurity::ddl_identifier(&table.name)?
        ));
        let last = defs.len().saturating_sub(1);
        for (idx, def) in defs.into_iter().enumerate() {
            if idx == last {
                lines.push(format!("  {def}"));
            } else {
                lines.push(format!("  {def},"));
            }
        }
        lines.push(");".to_string());
        lines.push(String::new());
    }

    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaInferencer;
    use crate::sources::{decode, DecodeOptions};

    fn session() -> Session {
        let mut session = Session::new("s");
        for (file, csv) in [
            ("customers.csv", "id,name\n1,Ada\n"),
            ("orders.csv", "order_id,customer_id,Order\n1,1,x\n2,,y\n"),
        ] {
            let data = decode(file, csv.as_bytes(), true, &DecodeOptions::default()).unwrap();
            let table = SchemaInferencer::default().infer(data.name(), data.columns());
            session.add_table(table, &data).unwrap();
        }
        session
    }

    #[test]
    fn test_create_tables_with_foreign_key() {
        let mut session = session();
        session.add_link("orders.customer_id", "customers.id").unwrap();

        let sql = generate_sql(&session).unwrap().join("\n");
        assert_eq!(
            sql,
            "CREATE TABLE customers (\n  \
             id INTEGER NOT NULL PRIMARY KEY,\n  \
             name TEXT NOT NULL\n\
             );\n\
             \n\
             CREATE TABLE orders (\n  \
             order_id INTEGER NOT NULL PRIMARY KEY,\n  \
             customer_id INTEGER,\n  \
             order_col TEXT NOT NULL,\n  \
             FOREIGN KEY (customer_id) REFERENCES customers(id)\n\
             );\n"
        );
    }

    #[test]
    fn test_dangling_links_are_skipped() {
        let mut session = session();
        session.add_link("orders.customer_id", "customers.id").unwrap();
        session.tables.retain(|t| t.name != "customers");

        let sql = generate_sql(&session).unwrap();
        assert!(!sql.iter().any(|l| l.contains("FOREIGN KEY")));
    }

    #[test]
    fn test_empty_session() {
        assert!(generate_sql(&Session::new("s")).unwrap().is_empty());
    }
}
