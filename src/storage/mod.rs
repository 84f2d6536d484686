pub mod database_file;

pub use database_file::{DatabaseSnapshot, DatabaseStore, FileStamp};
