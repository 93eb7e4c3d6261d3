pub mod db;

pub use db::{RocksDbStore, StoreError};
