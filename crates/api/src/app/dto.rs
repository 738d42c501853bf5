use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use bankcore_core::money::{check_digits, check_positive};
use bankcore_core::{AccountId, CustomerId};
use bankcore_infra::services::{AccountDetails, OpenAccount};
use bankcore_ledger::{
    AccountStatus, validate_condition_code, validate_condition_codes, validate_rate_value,
};

use crate::app::errors;

/// Integer digits allowed in a money amount (NUMERIC(18,2) columns).
const AMOUNT_INTEGER_DIGITS: u32 = 16;
const AMOUNT_FRACTION_DIGITS: u32 = 2;

type Rejection = axum::response::Response;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CreateAccountRequest {
    pub customer_id: i64,
    pub product_code: String,
    pub maturity_date: Option<NaiveDate>,
}

impl CreateAccountRequest {
    pub fn into_command(self) -> Result<OpenAccount, Rejection> {
        let customer_id = CustomerId::positive(self.customer_id)
            .map_err(|e| errors::bad_request(e.to_string()))?;
        let product_code = non_blank("product_code", &self.product_code)?;
        Ok(OpenAccount {
            customer_id,
            product_code,
            maturity_date: self.maturity_date,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct AmountRequest {
    pub amount: Decimal,
}

impl AmountRequest {
    pub fn validated(&self) -> Result<Decimal, Rejection> {
        validate_amount(self.amount)
    }
}

#[derive(Debug, Deserialize)]
pub struct TransferRequest {
    pub from_account_id: i64,
    pub to_account_id: i64,
    pub amount: Decimal,
}

impl TransferRequest {
    pub fn validated(&self) -> Result<(AccountId, AccountId, Decimal), Rejection> {
        let from = account_id(self.from_account_id)?;
        let to = account_id(self.to_account_id)?;
        Ok((from, to, validate_amount(self.amount)?))
    }
}

#[derive(Debug, Deserialize)]
pub struct DailyAccrualRequest {
    pub business_date: NaiveDate,
    #[serde(default)]
    pub condition_codes: Vec<String>,
}

impl DailyAccrualRequest {
    pub fn validate(&self, today: NaiveDate) -> Result<(), Rejection> {
        not_in_future("business_date", self.business_date, today)?;
        validate_condition_codes(&self.condition_codes)
            .map_err(|e| errors::bad_request(e.to_string()))
    }
}

#[derive(Debug, Deserialize)]
pub struct BaseRateRequest {
    pub business_date: NaiveDate,
    pub rate: Decimal,
}

impl BaseRateRequest {
    pub fn validate(&self, today: NaiveDate) -> Result<(), Rejection> {
        not_in_future("business_date", self.business_date, today)?;
        validate_rate(self.rate)
    }
}

#[derive(Debug, Deserialize)]
pub struct SpreadRateRequest {
    pub product_code: String,
    pub business_date: NaiveDate,
    pub rate: Decimal,
}

impl SpreadRateRequest {
    pub fn validate(&self, today: NaiveDate) -> Result<String, Rejection> {
        let code = non_blank("product_code", &self.product_code)?;
        not_in_future("business_date", self.business_date, today)?;
        validate_rate(self.rate)?;
        Ok(code)
    }
}

#[derive(Debug, Deserialize)]
pub struct PreferentialRateRequest {
    pub product_code: String,
    pub condition_code: String,
    pub business_date: NaiveDate,
    pub rate: Decimal,
}

impl PreferentialRateRequest {
    pub fn validate(&self, today: NaiveDate) -> Result<(String, String), Rejection> {
        let product_code = non_blank("product_code", &self.product_code)?;
        let condition_code = non_blank("condition_code", &self.condition_code)?;
        validate_condition_code(&condition_code).map_err(|e| errors::bad_request(e.to_string()))?;
        not_in_future("business_date", self.business_date, today)?;
        validate_rate(self.rate)?;
        Ok((product_code, condition_code))
    }
}

/// `GET /api/rates/composed` query; `condition_codes` is comma separated.
#[derive(Debug, Deserialize)]
pub struct ComposedRateQuery {
    pub product_code: String,
    pub business_date: NaiveDate,
    pub condition_codes: Option<String>,
}

impl ComposedRateQuery {
    pub fn validated(&self) -> Result<(String, Vec<String>), Rejection> {
        let product_code = non_blank("product_code", &self.product_code)?;
        let codes: Vec<String> = self
            .condition_codes
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .collect();
        validate_condition_codes(&codes).map_err(|e| errors::bad_request(e.to_string()))?;
        Ok((product_code, codes))
    }
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub id: AccountId,
    pub account_number: String,
    pub customer_id: CustomerId,
    pub product_code: String,
    pub product_name: String,
    pub balance: Decimal,
    pub status: AccountStatus,
    pub opened_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub maturity_date: Option<NaiveDate>,
}

impl From<AccountDetails> for AccountResponse {
    fn from(details: AccountDetails) -> Self {
        let AccountDetails {
            account,
            product_name,
        } = details;
        Self {
            id: account.id,
            account_number: account.account_number,
            customer_id: account.customer_id,
            product_code: account.product_code,
            product_name,
            balance: account.balance,
            status: account.status,
            opened_at: account.opened_at,
            closed_at: account.closed_at,
            maturity_date: account.maturity_date,
        }
    }
}

// -------------------------
// Validation helpers
// -------------------------

pub fn account_id(raw: i64) -> Result<AccountId, Rejection> {
    AccountId::positive(raw).map_err(|e| errors::bad_request(e.to_string()))
}

fn validate_amount(amount: Decimal) -> Result<Decimal, Rejection> {
    check_positive("amount", amount)
        .and_then(|_| {
            check_digits(
                "amount",
                amount,
                AMOUNT_INTEGER_DIGITS,
                AMOUNT_FRACTION_DIGITS,
            )
        })
        .map_err(|e| errors::bad_request(e.to_string()))?;
    Ok(amount)
}

fn validate_rate(rate: Decimal) -> Result<(), Rejection> {
    validate_rate_value(rate).map_err(|e| errors::bad_request(e.to_string()))
}

fn non_blank(field: &str, value: &str) -> Result<String, Rejection> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(errors::bad_request(format!("{field} cannot be blank")));
    }
    Ok(trimmed.to_string())
}

fn not_in_future(field: &str, date: NaiveDate, today: NaiveDate) -> Result<(), Rejection> {
    if date > today {
        return Err(errors::bad_request(format!(
            "{field} {date} is in the future"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use rust_decimal_macros::dec;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
    }

    #[test]
    fn amount_must_be_positive_with_two_fraction_digits() {
        assert!(validate_amount(dec!(1000.50)).is_ok());
        assert!(validate_amount(dec!(9999999999999999.99)).is_ok());
        for bad in [dec!(0), dec!(-1), dec!(0.001), dec!(10000000000000000)] {
            let rejection = validate_amount(bad).unwrap_err();
            assert_eq!(rejection.status(), StatusCode::BAD_REQUEST);
        }
    }

    #[test]
    fn accrual_request_rejects_future_dates_and_bad_codes() {
        let mut req = DailyAccrualRequest {
            business_date: today(),
            condition_codes: vec!["VIP".into(), " SALARY_TRANSFER ".into()],
        };
        assert!(req.validate(today()).is_ok());

        req.condition_codes = vec!["vip".into()];
        assert!(req.validate(today()).is_err());

        req.condition_codes = vec!["VIP".into(), "VIP ".into()];
        assert!(req.validate(today()).is_err());

        req.condition_codes.clear();
        req.business_date = today().succ_opt().unwrap();
        assert!(req.validate(today()).is_err());
    }

    #[test]
    fn rate_requests_require_small_positive_rates() {
        let ok = BaseRateRequest {
            business_date: today(),
            rate: dec!(0.0300),
        };
        assert!(ok.validate(today()).is_ok());

        for rate in [dec!(0), dec!(10.0), dec!(0.00001)] {
            let req = BaseRateRequest {
                business_date: today(),
                rate,
            };
            assert!(req.validate(today()).is_err(), "{rate} should be rejected");
        }
    }

    #[test]
    fn composed_query_splits_and_trims_codes() {
        let query = ComposedRateQuery {
            product_code: " SAV001 ".into(),
            business_date: today(),
            condition_codes: Some("VIP, SALARY_TRANSFER,".into()),
        };
        let (code, codes) = query.validated().unwrap();
        assert_eq!(code, "SAV001");
        assert_eq!(codes, vec!["VIP".to_string(), "SALARY_TRANSFER".to_string()]);
    }

    #[test]
    fn create_account_requires_positive_customer_and_product() {
        let req = CreateAccountRequest {
            customer_id: 0,
            product_code: "SAV001".into(),
            maturity_date: None,
        };
        assert!(req.into_command().is_err());

        let req = CreateAccountRequest {
            customer_id: 7,
            product_code: "  ".into(),
            maturity_date: None,
        };
        assert!(req.into_command().is_err());
    }
}
