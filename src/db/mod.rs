// 数据库抽象层模块

pub mod factory;
pub mod sqlite;
pub mod traits;

pub use factory::{create_database, DatabaseConfig, DatabaseType, SqliteConfig};
pub use sqlite::SqliteDatabase;
pub use traits::*;
