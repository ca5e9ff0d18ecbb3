pub mod header_ops;
pub mod migration;
pub mod row_ops;
