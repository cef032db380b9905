use sea_orm::{
    ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
    sea_query::{Expr, Func, extension::postgres::PgExpr},
};
use uuid::Uuid;

use crate::{
    audit,
    dto::products::{NewProduct, ProductList, UpdateDiscountForm},
    entity::products::{Column, Entity as Products},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::Product,
    pricing,
    repository::{self, is_unique_violation, products::NewProductRow},
    response::{ApiResponse, Meta},
    routes::params::{ProductQuery, ProductSortBy, SortOrder},
    state::AppState,
};

pub const DEFAULT_STOCK: i32 = 100;

const DUPLICATE_TITLE: &str = "Product with this name already exists";

/// Every product, newest first, for the storefront page.
pub async fn storefront(state: &AppState) -> AppResult<Vec<Product>> {
    let items = Products::find()
        .order_by_desc(Column::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Product::from)
        .collect();
    Ok(items)
}

pub async fn list_products(
    state: &AppState,
    query: ProductQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let mut condition = Condition::all();

    if let Some(search) = query.q.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        condition = condition.add(
            Condition::any()
                .add(Expr::col(Column::Title).ilike(pattern.clone()))
                .add(Expr::col(Column::Description).ilike(pattern)),
        );
    }

    if let Some(category) = query.category.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        condition = condition
            .add(Expr::expr(Func::lower(Expr::col(Column::Category))).eq(category.to_lowercase()));
    }

    if let Some(min_price) = query.min_price {
        condition = condition.add(Column::Price.gte(min_price));
    }

    if let Some(max_price) = query.max_price {
        condition = condition.add(Column::Price.lte(max_price));
    }

    let sort_by = query.sort_by.unwrap_or(ProductSortBy::CreatedAt);
    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);
    let sort_col = match sort_by {
        ProductSortBy::CreatedAt => Column::CreatedAt,
        ProductSortBy::Price => Column::Price,
        ProductSortBy::Title => Column::Title,
        ProductSortBy::Discount => Column::Discount,
    };

    let mut finder = Products::find().filter(condition);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(sort_col),
        SortOrder::Desc => finder.order_by_desc(sort_col),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Product::from)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Products", ProductList { items }, Some(meta)))
}

pub async fn get_product(state: &AppState, id: Uuid) -> AppResult<Product> {
    repository::products::find_by_id(&state.orm, id)
        .await?
        .map(Product::from)
        .ok_or_else(|| AppError::not_found("Product"))
}

pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    payload: NewProduct,
) -> AppResult<Product> {
    let NewProduct {
        title,
        description,
        price,
        discount,
        category,
        stock_quantity,
        image_name,
        image,
    } = payload;

    let title = required(title)?;
    let description = required(description)?;
    let category = required(category)?;
    let (Some(price), Some(discount), Some(image)) = (price, discount, image) else {
        return Err(AppError::Validation("All fields are required".into()));
    };

    if !pricing::price_in_range(price) {
        return Err(AppError::Validation(format!(
            "Price must be between 1 and {}",
            pricing::MAX_PRICE
        )));
    }
    if !pricing::discount_in_range(discount) {
        return Err(discount_out_of_range());
    }
    let stock_quantity = match stock_quantity {
        None => DEFAULT_STOCK,
        Some(stock) if stock > 0 => stock,
        Some(_) => {
            return Err(AppError::Validation(
                "Stock quantity must be greater than zero".into(),
            ));
        }
    };

    if repository::products::find_by_title_ci(&state.orm, &title)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict(DUPLICATE_TITLE.into()));
    }

    let image = state
        .images
        .store(image_name.as_deref().unwrap_or_default(), &image)
        .await?;

    let row = NewProductRow {
        title,
        description,
        price,
        discount,
        image,
        category,
        stock_quantity,
    };
    let stored = row.image.clone();
    let product = match repository::products::insert(&state.orm, row).await {
        Ok(product) => product,
        Err(err) => {
            state.images.discard(&stored).await;
            if is_unique_violation(&err) {
                return Err(AppError::Conflict(DUPLICATE_TITLE.into()));
            }
            return Err(err.into());
        }
    };

    tracing::info!(product_id = %product.id, user_id = %user.user_id, "product created");
    audit::record(
        &state.orm,
        Some(user.user_id),
        "product_create",
        "products",
        serde_json::json!({ "product_id": product.id, "title": product.title }),
    )
    .await;

    Ok(Product::from(product))
}

pub async fn update_discount(
    state: &AppState,
    user: &AuthUser,
    payload: UpdateDiscountForm,
) -> AppResult<Product> {
    if !pricing::discount_in_range(payload.discount) {
        return Err(discount_out_of_range());
    }

    let product = repository::products::find_by_id(&state.orm, payload.product_id)
        .await?
        .ok_or_else(|| AppError::not_found("Product"))?;
    let previous = product.discount;
    let product = repository::products::set_discount(&state.orm, product, payload.discount).await?;

    tracing::info!(
        product_id = %product.id,
        user_id = %user.user_id,
        previous,
        discount = product.discount,
        "discount updated"
    );
    audit::record(
        &state.orm,
        Some(user.user_id),
        "discount_update",
        "products",
        serde_json::json!({
            "product_id": product.id,
            "previous": previous,
            "discount": product.discount,
        }),
    )
    .await;

    Ok(Product::from(product))
}

fn required(value: Option<String>) -> AppResult<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::Validation("All fields are required".into()))
}

fn discount_out_of_range() -> AppError {
    AppError::Validation(format!(
        "Discount must be at least {}% and below {}%",
        pricing::MIN_DISCOUNT,
        pricing::MAX_DISCOUNT_EXCLUSIVE
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_fields_count_as_missing() {
        assert!(matches!(required(None), Err(AppError::Validation(_))));
        assert!(matches!(
            required(Some("   ".into())),
            Err(AppError::Validation(_))
        ));
        assert_eq!(required(Some("  Mug ".into())).unwrap(), "Mug");
    }

    #[test]
    fn discount_message_names_the_bounds() {
        let AppError::Validation(msg) = discount_out_of_range() else {
            panic!("expected a validation error");
        };
        assert!(msg.contains("10%"));
        assert!(msg.contains("90%"));
    }
}
