pub mod credentials;
pub mod extractors;
pub mod middleware;
pub mod password;
pub mod token;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use validator::Validate;

// Re-export necessary items
pub use credentials::CredentialService;
pub use extractors::AuthenticatedUser;
pub use middleware::{AuthMiddleware, SESSION_COOKIE};
pub use password::{hash_password, verify_password};
pub use token::{Claims, TokenService};

lazy_static! {
    // Regex for display names: letters first, then letters, spaces, dots, apostrophes or hyphens
    static ref NAME_REGEX: regex::Regex =
        regex::Regex::new(r"^\p{L}[\p{L} .'-]*$").expect("name regex is valid");
}

/// Represents the payload for a user login request.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// User's email address.
    /// Must be a valid email format.
    #[validate(email)]
    pub email: String,
    /// User's password. Must not be empty.
    #[validate(length(min = 1))]
    pub password: String,
}

/// Represents the payload for a new user registration request.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Email address for the new account.
    /// Must be a valid email format.
    #[validate(email)]
    pub email: String,
    /// Password for the new account. Must not be empty.
    #[validate(length(min = 1, max = 72))]
    pub password: String,
    /// Display name embedded in session tokens.
    /// Between 1 and 100 characters, starting with a letter.
    #[validate(
        length(min = 1, max = 100),
        regex(
            path = "NAME_REGEX",
            message = "Name must start with a letter and contain only letters, spaces, dots, apostrophes or hyphens"
        )
    )]
    pub name: String,
}

/// Response body for a successful registration.
#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub message: String,
}

/// Response structure after a successful login.
/// Contains the JWT session token and the ID of the authenticated user.
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub message: String,
    /// The JWT (JSON Web Token) for session authentication.
    pub token: String,
    /// The unique identifier of the authenticated user.
    pub user_id: i64,
}
