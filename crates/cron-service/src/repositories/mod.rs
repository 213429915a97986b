//! Repository layer for the cron service.
//!
//! Handler -> Service -> Repository. Repositories are unit structs whose
//! associated functions take the shared `PgPool`; queries are runtime-checked
//! and parameterized.

pub mod api_tokens;
pub mod crons;
pub mod schema;

pub use api_tokens::ApiTokensRepository;
pub use crons::CronsRepository;
pub use schema::SchemaRepository;
