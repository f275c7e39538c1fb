pub mod admin;
pub mod json_error;
pub mod jwt;
pub mod login;
pub mod role;
pub mod server_config;

pub use self::admin::{
    AdminProfile, AdminRecord, AdminUpdate, ChangePasswordRequest, CreateAdminRequest, NewAdmin,
    UpdateAdminRequest, UpdateProfileRequest,
};
pub use self::json_error::ErrorResponse;
pub use self::jwt::{AccessClaims, RefreshClaims, TokenPair};
pub use self::login::{LoginData, LoginResponse, RefreshRequest, RefreshResponse};
pub use self::role::{AdminRole, UnknownRole, WILDCARD_PERMISSION};
