use service_core::{
    axum::{extract::State, Json},
    error::AppError,
};

use crate::{middleware::AuthUser, models::PublicUser, AppState};

/// Profile of the user behind the access cookie
#[utoipa::path(
    get,
    path = "/private/users/me",
    responses(
        (status = 200, description = "Current user", body = PublicUser),
        (status = 401, description = "Missing or invalid access cookie", body = crate::dtos::ErrorResponse)
    ),
    tag = "User"
)]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<Json<PublicUser>, AppError> {
    let user = state.auth_service.current_user(claims.id).await?;
    Ok(Json(user))
}
