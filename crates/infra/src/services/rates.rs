//! Base, spread and preferential rate registration plus composed-rate lookup.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, instrument};

use bankcore_core::money;
use bankcore_ledger::{
    BaseRate, PreferentialRate, Product, SpreadRate, normalize_condition_codes,
    validate_condition_code, validate_rate_value,
};

use crate::store::StoreError;

use super::error::{LedgerError, LedgerResult};
use super::LedgerContext;

/// Rate components in effect for a product on a date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComposedRate {
    pub product_code: String,
    pub business_date: NaiveDate,
    pub condition_codes: Vec<String>,
    pub base_rate: Decimal,
    pub spread_rate: Decimal,
    pub preferential_rate: Decimal,
    pub applied_rate: Decimal,
}

#[derive(Clone)]
pub struct RateService {
    ctx: LedgerContext,
}

impl RateService {
    pub fn new(ctx: LedgerContext) -> Self {
        Self { ctx }
    }

    /// Register a product in the catalogue.
    pub fn register_product(&self, product: Product) -> LedgerResult<()> {
        product.validate()?;
        self.ctx
            .store
            .insert_product(product)
            .map_err(|e| duplicate_as_conflict(e, "product already exists"))
    }

    #[instrument(skip(self), fields(business_date = %business_date, rate = %rate), err)]
    pub fn register_base_rate(&self, business_date: NaiveDate, rate: Decimal) -> LedgerResult<BaseRate> {
        validate_rate_value(rate)?;
        if self.ctx.store.find_base_rate(business_date)?.is_some() {
            return Err(LedgerError::conflict(format!(
                "base rate already registered for {business_date}"
            )));
        }
        let base = BaseRate {
            business_date,
            rate: money::rate(rate),
        };
        self.ctx.store.insert_base_rate(base.clone()).map_err(|e| {
            duplicate_as_conflict(e, &format!("base rate already registered for {business_date}"))
        })?;
        info!("base rate registered");
        Ok(base)
    }

    #[instrument(skip(self), fields(business_date = %business_date, rate = %rate), err)]
    pub fn register_spread_rate(
        &self,
        product_code: &str,
        business_date: NaiveDate,
        rate: Decimal,
    ) -> LedgerResult<SpreadRate> {
        validate_rate_value(rate)?;
        let product = self.require_product(product_code)?;
        let duplicate = format!(
            "spread rate already registered for {} on {business_date}",
            product.code
        );
        if self
            .ctx
            .store
            .find_active_spread_rate(&product.code, business_date)?
            .is_some()
        {
            return Err(LedgerError::conflict(duplicate));
        }
        let spread = SpreadRate {
            product_code: product.code,
            business_date,
            rate: money::rate(rate),
            active: true,
        };
        self.ctx
            .store
            .insert_spread_rate(spread.clone())
            .map_err(|e| duplicate_as_conflict(e, &duplicate))?;
        Ok(spread)
    }

    #[instrument(skip(self), fields(business_date = %business_date, rate = %rate), err)]
    pub fn register_preferential_rate(
        &self,
        product_code: &str,
        condition_code: &str,
        business_date: NaiveDate,
        rate: Decimal,
    ) -> LedgerResult<PreferentialRate> {
        validate_rate_value(rate)?;
        let condition_code = condition_code.trim();
        validate_condition_code(condition_code)?;
        let product = self.require_product(product_code)?;

        let preferential = PreferentialRate {
            product_code: product.code,
            condition_code: condition_code.to_string(),
            business_date,
            rate: money::rate(rate),
            active: true,
        };
        self.ctx
            .store
            .insert_preferential_rate(preferential.clone())
            .map_err(|e| {
                duplicate_as_conflict(
                    e,
                    &format!(
                        "preferential rate already registered for {}/{} on {business_date}",
                        preferential.product_code, preferential.condition_code
                    ),
                )
            })?;
        Ok(preferential)
    }

    /// Rates that would apply to `product_code` on `business_date`.
    ///
    /// Unlike accrual, a missing spread reads as zero here; a missing base rate
    /// is reported as not found.
    pub fn composed_rate(
        &self,
        product_code: &str,
        business_date: NaiveDate,
        condition_codes: &[String],
    ) -> LedgerResult<ComposedRate> {
        let product = self.require_product(product_code)?;
        let base = self
            .ctx
            .store
            .find_base_rate(business_date)?
            .ok_or_else(|| {
                LedgerError::not_found(format!("base rate is not registered for {business_date}"))
            })?;
        let spread = self
            .ctx
            .store
            .find_active_spread_rate(&product.code, business_date)?
            .map(|s| s.rate)
            .unwrap_or_else(money::zero_rate);

        let codes = normalize_condition_codes(condition_codes);
        let preferential =
            self.ctx
                .store
                .sum_active_preferential_rates(&product.code, &codes, business_date)?;

        Ok(ComposedRate {
            product_code: product.code,
            business_date,
            condition_codes: codes,
            base_rate: base.rate,
            spread_rate: spread,
            preferential_rate: preferential,
            applied_rate: money::rate(base.rate + spread + preferential),
        })
    }

    fn require_product(&self, product_code: &str) -> LedgerResult<Product> {
        let code = product_code.trim();
        if code.is_empty() {
            return Err(LedgerError::validation("product code cannot be blank"));
        }
        self.ctx
            .store
            .find_product(code)?
            .ok_or_else(|| LedgerError::not_found(format!("product {code} not found")))
    }
}

fn duplicate_as_conflict(err: StoreError, message: &str) -> LedgerError {
    match err {
        StoreError::UniqueViolation(_) => LedgerError::conflict(message),
        other => other.into(),
    }
}
