use chrono::Utc;
use uuid::Uuid;

use crate::{
    audit,
    dto::reviews::{ReviewForm, ReviewResponse},
    entity::reviews::Model as ReviewModel,
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    repository::{self, is_unique_violation},
    state::AppState,
};

const ALREADY_REVIEWED: &str = "You have already reviewed this product";

/// Reviews are open only to users holding a COD or PAID order for the product,
/// and only once per product.
pub async fn add_review(
    state: &AppState,
    user: &AuthUser,
    payload: ReviewForm,
) -> AppResult<ReviewModel> {
    let ReviewForm {
        product_id,
        rating,
        comment,
    } = payload;

    if !(1..=5).contains(&rating) {
        return Err(AppError::Validation("Rating must be between 1 and 5".into()));
    }

    // Unknown products have no settled purchase either.
    if !repository::orders::has_settled_purchase(&state.orm, user.user_id, product_id).await? {
        return Err(AppError::Forbidden(
            "You can only review products you have purchased".into(),
        ));
    }

    if repository::reviews::exists(&state.orm, user.user_id, product_id).await? {
        return Err(AppError::Conflict(ALREADY_REVIEWED.into()));
    }

    let comment = comment
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty());
    let review =
        match repository::reviews::insert(&state.orm, user.user_id, product_id, rating, comment)
            .await
        {
            Ok(review) => review,
            Err(err) if is_unique_violation(&err) => {
                return Err(AppError::Conflict(ALREADY_REVIEWED.into()));
            }
            Err(err) => return Err(err.into()),
        };

    tracing::info!(review_id = %review.id, user_id = %user.user_id, %product_id, rating, "review created");
    audit::record(
        &state.orm,
        Some(user.user_id),
        "review_create",
        "reviews",
        serde_json::json!({ "review_id": review.id, "product_id": product_id, "rating": rating }),
    )
    .await;

    Ok(review)
}

pub async fn list_reviews(state: &AppState, product_id: Uuid) -> AppResult<Vec<ReviewResponse>> {
    if repository::products::find_by_id(&state.orm, product_id)
        .await?
        .is_none()
    {
        return Err(AppError::not_found("Product"));
    }

    let rows = repository::reviews::list_for_product(&state.orm, product_id).await?;
    Ok(rows
        .into_iter()
        .map(|(review, author)| ReviewResponse {
            user_email: author.map(|u| u.email).unwrap_or_default(),
            rating: review.rating,
            comment: review.comment,
            created_at: review.created_at.with_timezone(&Utc),
        })
        .collect())
}
