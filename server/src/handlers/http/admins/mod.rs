pub mod manage;

pub use manage::{handle_create_admin, handle_get_admin, handle_update_admin};
