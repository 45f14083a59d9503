use super::error::*;
use super::handler;
use crate::api::v1::handler::StatusQuery;
use crate::application_port::AuthService;
use crate::domain_model::UserId;
use crate::server::Server;
use std::convert::Infallible;
use std::sync::Arc;
use warp::{Filter, http, reject};

pub fn routes(
    server: Arc<Server>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let signup = warp::post()
        .and(warp::path("signup"))
        .and(warp::path::end())
        .and(warp::body::json())
        .and(with(server.auth_service.clone()))
        .and_then(handler::signup);

    let login = warp::post()
        .and(warp::path("login"))
        .and(warp::path::end())
        .and(warp::body::json())
        .and(with(server.auth_service.clone()))
        .and_then(handler::login);

    let refresh_token = warp::post()
        .and(warp::path("refresh_token"))
        .and(warp::path::end())
        .and(with_bearer())
        .and(with(server.auth_service.clone()))
        .and_then(handler::refresh_token);

    let logout = warp::post()
        .and(warp::path("logout"))
        .and(warp::path::end())
        .and(with_bearer())
        .and(with(server.auth_service.clone()))
        .and_then(handler::logout);

    let auth = signup.or(login).or(refresh_token).or(logout);

    let cart_list = warp::get()
        .and(warp::path("cart"))
        .and(warp::path::end())
        .and(with_verification(server.auth_service.clone()))
        .and(with(server.cart_service.clone()))
        .and_then(handler::cart_list);

    let cart_mutate = warp::post()
        .and(warp::path("cart_mutate"))
        .and(warp::path::end())
        .and(warp::body::json())
        .and(with_verification(server.auth_service.clone()))
        .and(with(server.cart_service.clone()))
        .and_then(handler::cart_mutate);

    let cart_batch = warp::post()
        .and(warp::path("cart_batch"))
        .and(warp::path::end())
        .and(warp::body::json())
        .and(with_verification(server.auth_service.clone()))
        .and(with(server.cart_service.clone()))
        .and_then(handler::cart_batch);

    let cart_status = warp::get()
        .and(warp::path("cart_status"))
        .and(warp::path::end())
        .and(warp::query::<StatusQuery>())
        .and(with_verification(server.auth_service.clone()))
        .and(with(server.cart_service.clone()))
        .and_then(handler::cart_status);

    let cart_count = warp::get()
        .and(warp::path("cart_count"))
        .and(warp::path::end())
        .and(with_verification(server.auth_service.clone()))
        .and(with(server.cart_service.clone()))
        .and_then(handler::cart_count);

    let cart = cart_list
        .or(cart_mutate)
        .or(cart_batch)
        .or(cart_status)
        .or(cart_count);

    let favorites_list = warp::get()
        .and(warp::path("favorites"))
        .and(warp::path::end())
        .and(with_verification(server.auth_service.clone()))
        .and(with(server.favorites_service.clone()))
        .and_then(handler::favorites_list);

    let favorites_mutate = warp::post()
        .and(warp::path("favorites_mutate"))
        .and(warp::path::end())
        .and(warp::body::json())
        .and(with_verification(server.auth_service.clone()))
        .and(with(server.favorites_service.clone()))
        .and_then(handler::favorites_mutate);

    let favorites_batch = warp::post()
        .and(warp::path("favorites_batch"))
        .and(warp::path::end())
        .and(warp::body::json())
        .and(with_verification(server.auth_service.clone()))
        .and(with(server.favorites_service.clone()))
        .and_then(handler::favorites_batch);

    let favorites_status = warp::get()
        .and(warp::path("favorites_status"))
        .and(warp::path::end())
        .and(warp::query::<StatusQuery>())
        .and(with_verification(server.auth_service.clone()))
        .and(with(server.favorites_service.clone()))
        .and_then(handler::favorites_status);

    let favorites_count = warp::get()
        .and(warp::path("favorites_count"))
        .and(warp::path::end())
        .and(with_verification(server.auth_service.clone()))
        .and(with(server.favorites_service.clone()))
        .and_then(handler::favorites_count);

    let favorites = favorites_list
        .or(favorites_mutate)
        .or(favorites_batch)
        .or(favorites_status)
        .or(favorites_count);

    let profile_list = warp::get()
        .and(warp::path("profile"))
        .and(warp::path::end())
        .and(with_verification(server.auth_service.clone()))
        .and(with(server.profile_service.clone()))
        .and_then(handler::profile_list);

    let profile_mutate = warp::post()
        .and(warp::path("profile_mutate"))
        .and(warp::path::end())
        .and(warp::body::json())
        .and(with_verification(server.auth_service.clone()))
        .and(with(server.profile_service.clone()))
        .and_then(handler::profile_mutate);

    let profile_batch = warp::post()
        .and(warp::path("profile_batch"))
        .and(warp::path::end())
        .and(warp::body::json())
        .and(with_verification(server.auth_service.clone()))
        .and(with(server.profile_service.clone()))
        .and_then(handler::profile_batch);

    let profile_status = warp::get()
        .and(warp::path("profile_status"))
        .and(warp::path::end())
        .and(warp::query::<StatusQuery>())
        .and(with_verification(server.auth_service.clone()))
        .and(with(server.profile_service.clone()))
        .and_then(handler::profile_status);

    let profile = profile_list
        .or(profile_mutate)
        .or(profile_batch)
        .or(profile_status);

    let promocode_list = warp::get()
        .and(warp::path("promocodes"))
        .and(warp::path::end())
        .and(with_verification(server.auth_service.clone()))
        .and(with(server.promocode_service.clone()))
        .and_then(handler::promocode_list);

    let promocode_mutate = warp::post()
        .and(warp::path("promocode_mutate"))
        .and(warp::path::end())
        .and(warp::body::json())
        .and(with_verification(server.auth_service.clone()))
        .and(with(server.promocode_service.clone()))
        .and_then(handler::promocode_mutate);

    let promocode_batch = warp::post()
        .and(warp::path("promocode_batch"))
        .and(warp::path::end())
        .and(warp::body::json())
        .and(with_verification(server.auth_service.clone()))
        .and(with(server.promocode_service.clone()))
        .and_then(handler::promocode_batch);

    let promocode_status = warp::get()
        .and(warp::path("promocode_status"))
        .and(warp::path::end())
        .and(warp::query::<StatusQuery>())
        .and(with_verification(server.auth_service.clone()))
        .and(with(server.promocode_service.clone()))
        .and_then(handler::promocode_status);

    let promocode_create = warp::post()
        .and(warp::path("promocode_create"))
        .and(warp::path::end())
        .and(warp::body::json())
        .and(with_verification(server.auth_service.clone()))
        .and(with(server.promocode_service.clone()))
        .and_then(handler::promocode_create);

    let promocode_retire = warp::post()
        .and(warp::path("promocode_retire"))
        .and(warp::path::end())
        .and(warp::body::json())
        .and(with_verification(server.auth_service.clone()))
        .and(with(server.promocode_service.clone()))
        .and_then(handler::promocode_retire);

    let promocode_codes = warp::get()
        .and(warp::path("promocode_codes"))
        .and(warp::path::end())
        .and(with_verification(server.auth_service.clone()))
        .and(with(server.promocode_service.clone()))
        .and_then(handler::promocode_codes);

    let promocodes = promocode_list
        .or(promocode_mutate)
        .or(promocode_batch)
        .or(promocode_status)
        .or(promocode_create)
        .or(promocode_retire)
        .or(promocode_codes);

    auth.or(cart).or(favorites).or(profile).or(promocodes)
}

fn with<ServiceType>(
    service: Arc<ServiceType>,
) -> impl Filter<Extract = (Arc<ServiceType>,), Error = Infallible> + Clone
where
    ServiceType: Send + Sync + ?Sized,
{
    warp::any().map(move || service.clone())
}

/// Extract the raw bearer credential without verifying it; the refresh and
/// logout endpoints hand it to the credential store themselves.
fn with_bearer() -> impl Filter<Extract = (String,), Error = warp::Rejection> + Clone {
    warp::header::<String>(http::header::AUTHORIZATION.as_ref()).and_then(
        |token: String| async move {
            match token.strip_prefix("Bearer ") {
                Some(token) => Ok(token.to_string()),
                None => Err(reject::custom(ApiErrorCode::InvalidToken)),
            }
        },
    )
}

fn with_verification(
    auth_service: Arc<dyn AuthService>,
) -> impl Filter<Extract = (UserId,), Error = warp::Rejection> + Clone {
    warp::header::<String>(http::header::AUTHORIZATION.as_ref()).and_then(move |token: String| {
        let auth_service = auth_service.clone();
        async move {
            if let Some(token) = token.strip_prefix("Bearer ") {
                let user_id = auth_service
                    .verify_token(token)
                    .await
                    .map_err(ApiErrorCode::from)
                    .map_err(reject::custom)?;
                Ok(user_id)
            } else {
                Err(reject::custom(ApiErrorCode::InvalidToken))
            }
        }
    })
}
