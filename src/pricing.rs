//! Money arithmetic. Amounts are integer minor units, discounts whole percent.

pub const MIN_DISCOUNT: i32 = 10;
pub const MAX_DISCOUNT_EXCLUSIVE: i32 = 90;

/// Largest unit price accepted for a product.
pub const MAX_PRICE: i64 = 100_000_000_000;

pub fn discount_in_range(discount: i32) -> bool {
    (MIN_DISCOUNT..MAX_DISCOUNT_EXCLUSIVE).contains(&discount)
}

pub fn price_in_range(price: i64) -> bool {
    (1..=MAX_PRICE).contains(&price)
}

/// Unit price after discount, rounded half-up to the nearest minor unit.
/// `None` when the amount does not fit in an `i64`.
pub fn discounted_unit_price(price: i64, discount: i32) -> Option<i64> {
    let scaled = price.checked_mul(i64::from(100 - discount))?;
    Some(scaled.checked_add(50)?.div_euclid(100))
}

/// Line total frozen on the order at creation time.
pub fn line_total(price: i64, discount: i32, quantity: i32) -> Option<i64> {
    discounted_unit_price(price, discount)?.checked_mul(i64::from(quantity))
}

/// Sum of several amounts, `None` on overflow.
pub fn sum<I: IntoIterator<Item = i64>>(amounts: I) -> Option<i64> {
    amounts
        .into_iter()
        .try_fold(0i64, |acc, amount| acc.checked_add(amount))
}
