pub mod login;
pub mod logout;
pub mod profile;
pub mod refresh;

use hyper::header::HeaderMap;

use crate::AppState;
use crate::handlers::http::utils::is_https;

pub use login::handle_login;
pub use logout::handle_logout;
pub use profile::{handle_change_password, handle_me, handle_update_profile};
pub use refresh::handle_refresh;

pub const REFRESH_COOKIE_NAME: &str = "refreshToken";
pub const REFRESH_COOKIE_PATH: &str = "/api/auth";

/// The refresh cookie is marked `Secure` over HTTPS and always in production.
fn secure_cookies(headers: &HeaderMap, state: &AppState) -> bool {
    is_https(headers) || state.config.server.is_production()
}
