use super::error::{ApiError, ApiErrorCode};
use crate::application_port::{
    AuthService, AuthTokens, CartChange, CartService, FavoriteChange, FavoritesService,
    LoginInput, NewPromocode, ProfileChange, ProfileService, PromocodeChange, PromocodeService,
    SignupInput,
};
use crate::domain_model::{ProfileFieldKey, PromocodeCode, UserId};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use warp::{self, reject};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ApiError>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(code: ApiErrorCode, message: impl Into<String>) -> Self {
        ApiResponse {
            success: false,
            data: None,
            error: Some(ApiError {
                code,
                message: message.into(),
            }),
        }
    }
}

fn ok_json<T: Serialize>(data: T) -> warp::reply::Json {
    warp::reply::json(&ApiResponse::ok(data))
}

#[derive(Debug, Deserialize)]
pub struct BatchRequest<C> {
    pub changes: Vec<C>,
}

/// Comma-separated ids for the status endpoints, e.g. `?ids=a,b,c`.
#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub ids: String,
}

fn parse_ids<T: FromStr>(raw: &str) -> Result<Vec<T>, warp::Rejection> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<T>()
                .map_err(|_| reject::custom(ApiErrorCode::InvalidArgument))
        })
        .collect()
}

#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub count: u64,
}

// region auth

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SignupResponse {
    pub user_id: UserId,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub user_id: Option<UserId>,
    pub tokens: AuthTokens,
}

pub async fn signup(
    body: SignupRequest,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let user_id = auth_service
        .signup(SignupInput {
            username: body.username,
            password: body.password,
        })
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    Ok(ok_json(SignupResponse { user_id }))
}

pub async fn login(
    body: LoginRequest,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let login_result = auth_service
        .login(LoginInput {
            username: body.username,
            password: body.password,
        })
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    Ok(ok_json(SessionResponse {
        user_id: Some(login_result.user_id),
        tokens: login_result.tokens,
    }))
}

/// The refresh credential arrives on the transport credential channel
/// (Authorization header), never in the body.
pub async fn refresh_token(
    refresh_credential: String,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let tokens = auth_service
        .refresh_token(&refresh_credential)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    Ok(ok_json(SessionResponse {
        user_id: None,
        tokens,
    }))
}

pub async fn logout(
    refresh_credential: String,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    auth_service
        .logout(&refresh_credential)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    Ok(ok_json(()))
}

// endregion

// region cart

pub async fn cart_list(
    user_id: UserId,
    cart_service: Arc<dyn CartService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let entries = cart_service
        .read(user_id)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;
    Ok(ok_json(entries))
}

pub async fn cart_mutate(
    body: CartChange,
    user_id: UserId,
    cart_service: Arc<dyn CartService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    cart_service
        .mutate(user_id, body)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;
    Ok(ok_json(()))
}

pub async fn cart_batch(
    body: BatchRequest<CartChange>,
    user_id: UserId,
    cart_service: Arc<dyn CartService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    cart_service
        .batch_mutate(user_id, body.changes)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;
    Ok(ok_json(()))
}

pub async fn cart_status(
    query: StatusQuery,
    user_id: UserId,
    cart_service: Arc<dyn CartService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let ids = parse_ids(&query.ids)?;
    let status = cart_service
        .status(user_id, &ids)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;
    Ok(ok_json(status))
}

pub async fn cart_count(
    user_id: UserId,
    cart_service: Arc<dyn CartService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let count = cart_service
        .count(user_id)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;
    Ok(ok_json(CountResponse { count }))
}

// endregion

// region favorites

pub async fn favorites_list(
    user_id: UserId,
    favorites_service: Arc<dyn FavoritesService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let entries = favorites_service
        .read(user_id)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;
    Ok(ok_json(entries))
}

pub async fn favorites_mutate(
    body: FavoriteChange,
    user_id: UserId,
    favorites_service: Arc<dyn FavoritesService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    favorites_service
        .mutate(user_id, body)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;
    Ok(ok_json(()))
}

pub async fn favorites_batch(
    body: BatchRequest<FavoriteChange>,
    user_id: UserId,
    favorites_service: Arc<dyn FavoritesService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    favorites_service
        .batch_mutate(user_id, body.changes)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;
    Ok(ok_json(()))
}

pub async fn favorites_status(
    query: StatusQuery,
    user_id: UserId,
    favorites_service: Arc<dyn FavoritesService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let ids = parse_ids(&query.ids)?;
    let status = favorites_service
        .status(user_id, &ids)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;
    Ok(ok_json(status))
}

pub async fn favorites_count(
    user_id: UserId,
    favorites_service: Arc<dyn FavoritesService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let count = favorites_service
        .count(user_id)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;
    Ok(ok_json(CountResponse { count }))
}

// endregion

// region profile

pub async fn profile_list(
    user_id: UserId,
    profile_service: Arc<dyn ProfileService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let fields = profile_service
        .read(user_id)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;
    Ok(ok_json(fields))
}

pub async fn profile_mutate(
    body: ProfileChange,
    user_id: UserId,
    profile_service: Arc<dyn ProfileService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    profile_service
        .mutate(user_id, body)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;
    Ok(ok_json(()))
}

pub async fn profile_batch(
    body: BatchRequest<ProfileChange>,
    user_id: UserId,
    profile_service: Arc<dyn ProfileService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    profile_service
        .batch_mutate(user_id, body.changes)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;
    Ok(ok_json(()))
}

pub async fn profile_status(
    query: StatusQuery,
    user_id: UserId,
    profile_service: Arc<dyn ProfileService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let keys = parse_ids::<ProfileFieldKey>(&query.ids)?;
    let status = profile_service
        .status(user_id, &keys)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;
    Ok(ok_json(status))
}

// endregion

// region promocodes

#[derive(Debug, Deserialize)]
pub struct RetireRequest {
    pub code: PromocodeCode,
}

pub async fn promocode_list(
    user_id: UserId,
    promocode_service: Arc<dyn PromocodeService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let applied = promocode_service
        .read(user_id)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;
    Ok(ok_json(applied))
}

pub async fn promocode_mutate(
    body: PromocodeChange,
    user_id: UserId,
    promocode_service: Arc<dyn PromocodeService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    promocode_service
        .mutate(user_id, body)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;
    Ok(ok_json(()))
}

pub async fn promocode_batch(
    body: BatchRequest<PromocodeChange>,
    user_id: UserId,
    promocode_service: Arc<dyn PromocodeService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    promocode_service
        .batch_mutate(user_id, body.changes)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;
    Ok(ok_json(()))
}

pub async fn promocode_status(
    query: StatusQuery,
    user_id: UserId,
    promocode_service: Arc<dyn PromocodeService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let codes: Vec<PromocodeCode> = query
        .ids
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(PromocodeCode::new)
        .collect();
    let status = promocode_service
        .status(user_id, &codes)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;
    Ok(ok_json(status))
}

pub async fn promocode_create(
    body: NewPromocode,
    _admin: UserId,
    promocode_service: Arc<dyn PromocodeService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    promocode_service
        .create_code(body)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;
    Ok(ok_json(()))
}

pub async fn promocode_retire(
    body: RetireRequest,
    _admin: UserId,
    promocode_service: Arc<dyn PromocodeService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    promocode_service
        .retire_code(&body.code)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;
    Ok(ok_json(()))
}

pub async fn promocode_codes(
    _admin: UserId,
    promocode_service: Arc<dyn PromocodeService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let codes = promocode_service
        .list_codes()
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;
    Ok(ok_json(codes))
}

// endregion
