pub mod backfill;
pub mod import;
pub mod status;
