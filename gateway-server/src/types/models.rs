//! Stored records

use serde::{Deserialize, Serialize};

/// A bank customer a partner may transact on behalf of
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerRecord {
    pub id: String,
    /// National identity number
    pub ktp: String,
    /// Account number
    pub account: String,
    pub name: String,
    pub branch: String,
    pub mother_name: String,
}

/// An authenticated partner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartnerIdentity {
    pub id: String,
    pub reference_no: String,
    pub username: String,
    /// Argon2 PHC string
    #[serde(skip_serializing)]
    pub password_hash: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdditionalInfo {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub device_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub channel: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    pub id: String,
    pub partner_id: String,
    pub consumer_id: String,
    /// Decimal amount, kept as the partner sent it
    pub amount: String,
    pub currency: String,
    pub additional_info: AdditionalInfo,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Store seed file layout
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SeedData {
    #[serde(default)]
    pub customers: Vec<CustomerRecord>,
    #[serde(default)]
    pub partners: Vec<SeedPartner>,
}

/// Partner entry in a seed file, with a plaintext password hashed on load
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedPartner {
    pub id: Option<String>,
    pub reference_no: String,
    pub username: String,
    pub password: String,
}
