//! # sheet-schema - Schema inference and relationship suggestion
//!
//! sheet-schema turns uploaded tabular files (CSV, JSON) into relational table
//! schemas, proposes foreign-key style links between tables uploaded into the
//! same working session, and emits SQL DDL or SQLAlchemy models once links
//! are confirmed. Decoded data lives in a per-session DataFusion
//! `SessionContext`, which is what the optional value-overlap check queries.
//!
//! ## Quick Start
//!
//! ```rust
//! use sheet_schema::prelude::*;
//!
//! # async fn example() -> sheet_schema::error::Result<()> {
//! let service = SchemaService::default();
//!
//! let customers = service
//!     .upload("customers.csv", b"id,name\n1,Ada\n2,Grace\n", &UploadOptions::default())
//!     .await?;
//! let orders = service
//!     .upload(
//!         "orders.csv",
//!         b"order_id,customer_id\n10,1\n11,2\n",
//!         &UploadOptions::default()
//!             .with_session(&customers.session_id)
//!             .with_deep_check(true),
//!     )
//!     .await?;
//!
//! // orders.customer_id -> customers.id: name match, same type, values overlap
//! let link = &orders.suggested_links[0];
//! service
//!     .accept_link(&orders.session_id, &link.from, &link.to)
//!     .await?;
//!
//! let ddl = service.generate(&orders.session_id, ArtifactFormat::Sql).await?;
//! println!("{}", ddl.text());
//! # Ok(())
//! # }
//! ```
//!
//! ## Pipeline
//!
//! 1. **Decode** ([`sources`]): bytes to Arrow record batches, headers run
//!    through the [`ColumnNormalizer`](schema::ColumnNormalizer), per-column
//!    semantic type and nullability.
//! 2. **Infer** ([`schema`]): column list with exactly one primary key and
//!    non-blocking validation warnings.
//! 3. **Suggest** ([`links`]): name heuristic, type boost, optional overlap
//!    validation.
//! 4. **Review** ([`session`]): pending suggestions are accepted or rejected;
//!    links can also be added by hand.
//! 5. **Generate** ([`codegen`]): SQL or ORM text from tables and confirmed
//!    links.
//!
//! ## Architecture
//!
//! - **`schema`**: table/column model, normalizer, inferencer, type mapping
//! - **`sources`**: CSV/JSON decoding and string-type refinement
//! - **`links`**: the three suggestion stages and `LinkSuggester`
//! - **`session`**: per-session state and the concurrent `SessionRegistry`
//! - **`service`**: transport-independent operations
//! - **`codegen`**: SQL and SQLAlchemy emitters
//! - **`api`**: axum router over the service
//! - **`config`**, **`logging`**, **`error`**, **`security`**: ambient support

pub mod api;
pub mod codegen;
pub mod config;
pub mod error;
pub mod links;
pub mod logging;
pub mod prelude;
pub mod schema;
pub mod security;
pub mod service;
pub mod session;
pub mod sources;
