use crate::{
    auth::{
        AuthenticatedUser, LoginRequest, LoginResponse, RegisterRequest, RegisterResponse,
        SESSION_COOKIE,
    },
    error::AppError,
    models::NewUser,
    state::AppState,
    store::StoreError,
};
use actix_web::{
    cookie::{time::Duration, Cookie, SameSite},
    get, post, web, HttpResponse, Responder,
};
use validator::Validate;

/// Register a new user
///
/// Hashes the password and stores the account. The response carries no token;
/// the client logs in separately.
#[post("/register")]
pub async fn register(
    state: web::Data<AppState>,
    register_data: web::Json<RegisterRequest>,
) -> Result<impl Responder, AppError> {
    register_data.validate()?;
    let RegisterRequest {
        email,
        password,
        name,
    } = register_data.into_inner();

    let password_hash = state.credentials.hash_password(password).await?;

    let user = state
        .users
        .create_user(NewUser {
            email,
            name,
            password_hash,
        })
        .await
        .map_err(|e| match e {
            StoreError::Conflict(_) => AppError::BadRequest("Email already registered".into()),
            other => other.into(),
        })?;
    log::info!("registered user {}", user.id);

    Ok(HttpResponse::Ok().json(RegisterResponse {
        message: "Create User Successful".into(),
    }))
}

/// Login user
///
/// Verifies the credentials and opens a session. The token is returned in the
/// body and also set as an HttpOnly `jwt` cookie with the same lifetime.
#[post("/login")]
pub async fn login(
    state: web::Data<AppState>,
    login_data: web::Json<LoginRequest>,
) -> Result<impl Responder, AppError> {
    login_data.validate()?;
    let LoginRequest { email, password } = login_data.into_inner();

    // Unknown email and wrong password are indistinguishable to the caller.
    let invalid = || AppError::Unauthorized("Invalid credentials".into());

    let user = match state.users.find_user_by_email(&email).await {
        Ok(user) => user,
        Err(StoreError::NotFound) => return Err(invalid()),
        Err(e) => return Err(e.into()),
    };

    if !state
        .credentials
        .verify_password(password, user.password_hash.clone())
        .await?
    {
        log::debug!("failed login for user {}", user.id);
        return Err(invalid());
    }

    let token = state.credentials.issue_token(user.id, &user.name)?;
    let cookie = Cookie::build(SESSION_COOKIE, token.clone())
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(Duration::seconds(state.credentials.token_ttl().num_seconds()))
        .finish();

    Ok(HttpResponse::Ok().cookie(cookie).json(LoginResponse {
        message: "Login success".into(),
        token,
        user_id: user.id,
    }))
}

/// Returns the caller resolved from the session token.
#[get("")]
pub async fn get_me(user: AuthenticatedUser) -> impl Responder {
    HttpResponse::Ok().json(user)
}
