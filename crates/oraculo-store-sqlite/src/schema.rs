//! SQL schema for the Oráculo SQLite store.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- One row per named collection; the payload is the whole JSON array.
CREATE TABLE IF NOT EXISTS collections (
    key     TEXT PRIMARY KEY,
    payload TEXT NOT NULL
);

PRAGMA user_version = 1;
";

/// Fixed collection keys. These are data: existing installations migrated
/// from the browser build carry the same names.
pub mod keys {
  pub const BIDS: &str = "@kits-vital:bids";
  pub const DOCS: &str = "@kits-vital:docs";
  pub const PRODUCTS: &str = "@kits-vital:products";
  pub const ACTIVITIES: &str = "@kits-vital:activities-v1";
  pub const LOGS: &str = "@kits-vital:audit-logs";
  pub const KNOWLEDGE: &str = "@kits-vital:knowledge";
}
