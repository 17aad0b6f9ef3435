// Monetary amounts: non-negative decimals with two fractional digits
//
// Stored as canonical text ("1234.50") and summed as Decimal, never as floats.

use crate::error::{AppError, AppResult};
use rust_decimal::Decimal;
use std::str::FromStr;

pub const SCALE: u32 = 2;

/// Largest storable amount: 13 integer digits, 2 fractional
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(2_764_472_319, 232_830, 0, false, SCALE);

/// Validate an incoming amount and bring it to the stored scale
pub fn validate_amount(field: &str, value: Decimal) -> AppResult<Decimal> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(AppError::validation(format!(
            "Invalid {}: amount must not be negative",
            field
        )));
    }

    if value.normalize().scale() > SCALE {
        return Err(AppError::validation(format!(
            "Invalid {}: at most {} decimal places allowed, got {}",
            field, SCALE, value
        )));
    }

    if value > MAX_AMOUNT {
        return Err(AppError::validation(format!(
            "Invalid {}: amount must not exceed {}",
            field, MAX_AMOUNT
        )));
    }

    let mut amount = value.abs();
    amount.rescale(SCALE);
    Ok(amount)
}

/// Text form used in the database
pub fn to_db(value: &Decimal) -> String {
    let mut amount = *value;
    amount.rescale(SCALE);
    amount.to_string()
}

pub fn from_db(value: &str) -> Result<Decimal, rust_decimal::Error> {
    Decimal::from_str(value.trim())
}

/// Sum with zero as the empty total
pub fn sum<'a, I>(amounts: I) -> Decimal
where
    I: IntoIterator<Item = &'a Decimal>,
{
    let mut total = amounts.into_iter().fold(Decimal::ZERO, |acc, a| acc + a);
    total.rescale(SCALE);
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_validate_amount_accepts_two_places() {
        assert_eq!(validate_amount("amount", dec!(10.5)).unwrap(), dec!(10.50));
        assert_eq!(validate_amount("amount", dec!(0)).unwrap(), dec!(0.00));
        assert_eq!(validate_amount("amount", dec!(12.340)).unwrap(), dec!(12.34));
    }

    #[test]
    fn test_validate_amount_rejects_negative_and_fractions_of_cents() {
        assert!(matches!(
            validate_amount("amount", dec!(-1.00)),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            validate_amount("amount", dec!(1.005)),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_validate_amount_caps_at_thirteen_integer_digits() {
        assert_eq!(MAX_AMOUNT, dec!(9999999999999.99));
        assert_eq!(
            validate_amount("amount", dec!(9999999999999.99)).unwrap(),
            MAX_AMOUNT
        );

        let err = validate_amount("amount", dec!(12345678901234567.89)).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(
            err.to_string(),
            "Invalid amount: amount must not exceed 9999999999999.99"
        );
        assert!(validate_amount("cash", dec!(10000000000000.00)).is_err());
    }

    #[test]
    fn test_db_text_is_canonical() {
        assert_eq!(to_db(&dec!(250)), "250.00");
        assert_eq!(to_db(&dec!(0.1)), "0.10");
        assert_eq!(from_db("250.00").unwrap(), dec!(250.00));
    }

    #[test]
    fn test_sum_has_no_drift() {
        let amounts = vec![dec!(0.10); 1000];
        assert_eq!(sum(&amounts), dec!(100.00));
        assert_eq!(sum(&Vec::<Decimal>::new()), dec!(0.00));
    }
}
