pub mod mount_table;
pub mod routes;
