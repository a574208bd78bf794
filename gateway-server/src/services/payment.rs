//! Payment authorization
//!
//! A payment names its customer either directly (session-authenticated call)
//! or through a redeemed proof token. Either way the customer and the partner
//! reference must resolve before a record is written.

use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::proof_token::Redemption;
use crate::error::{GatewayError, Result};
use crate::store::Store;
use crate::types::{AdditionalInfo, Amount, CustomerRecord, PaymentRecord};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CustomerRef {
    AccountNumber(String),
    Id(String),
}

impl CustomerRef {
    /// Account number wins when both are present.
    pub fn from_fields(customer_number: &str, customer_id: &str) -> Self {
        if customer_number.is_empty() {
            CustomerRef::Id(customer_id.to_string())
        } else {
            CustomerRef::AccountNumber(customer_number.to_string())
        }
    }
}

/// How the caller established which customer is paying
#[derive(Debug, Clone)]
pub enum IdentitySource {
    Session {
        partner_id: String,
        customer: CustomerRef,
    },
    Proof(Redemption),
}

#[derive(Debug, Clone)]
pub struct PaymentOrder {
    pub partner_reference_no: String,
    pub amount: Amount,
    pub additional_info: AdditionalInfo,
}

pub struct PaymentAuthorizer {
    store: Arc<dyn Store>,
}

impl PaymentAuthorizer {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    #[instrument(skip_all, fields(partner_reference_no = %order.partner_reference_no))]
    pub async fn authorize(&self, source: IdentitySource, order: PaymentOrder) -> Result<String> {
        let customer_ref = match source {
            IdentitySource::Session {
                partner_id,
                customer,
            } => {
                info!(%partner_id, "Payment on session identity");
                customer
            }
            IdentitySource::Proof(redemption) => {
                if !redemption.valid {
                    warn!("Payment with an invalid proof token");
                    return Err(GatewayError::Unauthorized("proof not valid".into()));
                }
                CustomerRef::Id(redemption.customer_id)
            }
        };

        let customer = self.resolve_customer(&customer_ref).await?;

        let partner = self
            .store
            .partner_by_reference_no(&order.partner_reference_no)
            .await?
            .ok_or_else(|| {
                GatewayError::NotFound(format!("partner {}", order.partner_reference_no))
            })?;

        if order.amount.value.is_empty() || order.amount.currency.is_empty() {
            return Err(GatewayError::InvalidInput(
                "amount value and currency are required".into(),
            ));
        }

        let payment = PaymentRecord {
            id: uuid::Uuid::new_v4().to_string(),
            partner_id: partner.id,
            consumer_id: customer.id,
            amount: order.amount.value,
            currency: order.amount.currency,
            additional_info: order.additional_info,
            created_at: chrono::Utc::now(),
        };
        let id = payment.id.clone();
        self.store.insert_payment(payment).await?;

        info!(payment_id = %id, "Payment recorded");
        Ok(id)
    }

    async fn resolve_customer(&self, customer_ref: &CustomerRef) -> Result<CustomerRecord> {
        let found = match customer_ref {
            CustomerRef::AccountNumber(account) => self.store.customer_by_account(account).await?,
            CustomerRef::Id(id) if id.is_empty() => {
                return Err(GatewayError::InvalidInput(
                    "customer number or customer id is required".into(),
                ))
            }
            CustomerRef::Id(id) => self.store.customer_by_id(id).await?,
        };
        found.ok_or_else(|| GatewayError::NotFound("customer".into()))
    }
}
