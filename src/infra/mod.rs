pub mod http_client;
pub mod sqlite_warehouse;

pub use http_client::ReqwestHttp;
pub use sqlite_warehouse::{ColumnType, SqliteWarehouse, WarehouseSchema};
