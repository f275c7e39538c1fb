pub mod admins;
pub mod create;
pub mod store;
pub mod utils;

pub use admins::SqliteAdminStore;
pub use store::{AdminStore, StoreError};
