//! Canonical sales-order entity types and the extraction schema contract.

use serde::{Deserialize, Serialize};

/// The main purpose of a sales-order email.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    PlaceOrder,
    InquireAvailability,
    RequestInvoice,
    ConfirmDeliveryDate,
    ChangeOrder,
    CancelOrder,
    InquireShippingStatus,
    UpdateShippingInfo,
    FollowUp,
    GeneralInquiry,
    Complaint,
    RequestQuote,
    SendPaymentConfirmation,
    SubmitDocuments,
}

impl Intent {
    /// Wire/database string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PlaceOrder => "place_order",
            Self::InquireAvailability => "inquire_availability",
            Self::RequestInvoice => "request_invoice",
            Self::ConfirmDeliveryDate => "confirm_delivery_date",
            Self::ChangeOrder => "change_order",
            Self::CancelOrder => "cancel_order",
            Self::InquireShippingStatus => "inquire_shipping_status",
            Self::UpdateShippingInfo => "update_shipping_info",
            Self::FollowUp => "follow_up",
            Self::GeneralInquiry => "general_inquiry",
            Self::Complaint => "complaint",
            Self::RequestQuote => "request_quote",
            Self::SendPaymentConfirmation => "send_payment_confirmation",
            Self::SubmitDocuments => "submit_documents",
        }
    }
}

/// A product mentioned in the email.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub product_name: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub quantity: Option<f64>,
}

/// The shape the extraction capability must return, per the schema contract.
/// The contract yields at most one phone number.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SalesOrderWire {
    pub intent: Intent,
    pub customer_organization: String,
    pub producer_organization: String,
    #[serde(default)]
    pub people: Vec<String>,
    #[serde(default)]
    pub date_time: Option<String>,
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(default)]
    pub monetary_values: Vec<String>,
    #[serde(default)]
    pub addresses: Vec<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub email_addresses: Vec<String>,
}

/// Canonical extraction result for one email. Either fully present or the
/// message is dropped from persistence — never partial.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityRecord {
    pub intent: Intent,
    pub customer_organization: String,
    pub producer_organization: String,
    pub people: Vec<String>,
    /// Normalized to `YYYY-MM-DD`; omitted when the email carries no date.
    pub date_time: Option<String>,
    pub products: Vec<Product>,
    pub monetary_values: Vec<String>,
    pub addresses: Vec<String>,
    pub phone_numbers: Vec<String>,
    pub email_addresses: Vec<String>,
}

/// The fixed JSON-schema contract sent with every extraction call.
/// Strict mode: every property required, no additional properties.
pub fn extraction_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "intent": {
                "type": "string",
                "enum": [
                    "place_order",
                    "inquire_availability",
                    "request_invoice",
                    "confirm_delivery_date",
                    "change_order",
                    "cancel_order",
                    "inquire_shipping_status",
                    "update_shipping_info",
                    "follow_up",
                    "general_inquiry",
                    "complaint",
                    "request_quote",
                    "send_payment_confirmation",
                    "submit_documents"
                ],
                "description": "The main purpose of the email."
            },
            "customer_organization": {
                "type": "string",
                "description": "The sender's company or organization."
            },
            "producer_organization": {
                "type": "string",
                "description": "The company or organization the sender is contacting."
            },
            "people": {
                "type": "array",
                "items": { "type": "string" },
                "description": "Names of individuals mentioned in the email."
            },
            "date_time": {
                "type": ["string", "null"],
                "description": "Last delivery date, if mentioned."
            },
            "products": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "product_name": { "type": "string", "description": "The name of the product." },
                        "model": { "type": ["string", "null"], "description": "The model of the product, if provided." },
                        "quantity": { "type": ["number", "null"], "description": "The quantity of the product, if provided." }
                    },
                    "required": ["product_name", "model", "quantity"],
                    "additionalProperties": false
                },
                "description": "Products mentioned in the email."
            },
            "monetary_values": {
                "type": "array",
                "items": { "type": "string" },
                "description": "Prices, invoice amounts, or cost references."
            },
            "addresses": {
                "type": "array",
                "items": { "type": "string" },
                "description": "Shipping or billing addresses."
            },
            "phone_number": {
                "type": ["string", "null"],
                "description": "A contact number mentioned, if any."
            },
            "email_addresses": {
                "type": "array",
                "items": { "type": "string" },
                "description": "Contact emails mentioned."
            }
        },
        "required": [
            "intent",
            "customer_organization",
            "producer_organization",
            "people",
            "date_time",
            "products",
            "monetary_values",
            "addresses",
            "phone_number",
            "email_addresses"
        ],
        "additionalProperties": false
    })
}
