//! Checkout details validation and the checkout state machine.
//!
//! A visitor moves through the flow in order:
//!
//! ```text
//! FillingDetails -> SelectingPayment -> Submitting -> Success
//!                                                  -> Redirect
//!                                                  -> Failure -> SelectingPayment
//! ```
//!
//! The flow is plain data so the storefront can keep it in the session
//! between requests.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    Cart, CartItem, CityId, CountryId, Email, OrderId, PaymentMethodId, PhoneNumber,
};

/// Minimum length of the customer's full name, in characters.
pub const MIN_NAME_LENGTH: usize = 3;

/// Minimum length of the detailed address, in characters.
pub const MIN_ADDRESS_LENGTH: usize = 10;

// =============================================================================
// Form input
// =============================================================================

/// Raw checkout details as submitted by the form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckoutForm {
    pub full_name: String,
    pub country_id: String,
    pub city_id: String,
    /// ISO code picked in the dialing-code select (e.g. "SA").
    pub phone_country: String,
    pub phone: String,
    pub email: String,
    pub additional_phone: String,
    pub address: String,
    pub notes: String,
}

/// A checkout form field that can carry a validation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutField {
    FullName,
    Country,
    City,
    Phone,
    Email,
    AdditionalPhone,
    Address,
}

impl CheckoutField {
    /// Name of the HTML input for this field.
    #[must_use]
    pub const fn input_name(self) -> &'static str {
        match self {
            Self::FullName => "full_name",
            Self::Country => "country_id",
            Self::City => "city_id",
            Self::Phone => "phone",
            Self::Email => "email",
            Self::AdditionalPhone => "additional_phone",
            Self::Address => "address",
        }
    }
}

/// Field-level validation messages, in Arabic.
#[derive(thiserror::Error, Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[error("checkout details are invalid ({} field(s))", .0.len())]
pub struct ValidationErrors(BTreeMap<CheckoutField, String>);

impl ValidationErrors {
    fn insert(&mut self, field: CheckoutField, message: impl Into<String>) {
        self.0.entry(field).or_insert_with(|| message.into());
    }

    /// Message for a field, if it failed validation.
    #[must_use]
    pub fn get(&self, field: CheckoutField) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    /// Whether every field passed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of fields with a message.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Failed fields with their messages, in form order.
    pub fn iter(&self) -> impl Iterator<Item = (CheckoutField, &str)> {
        self.0.iter().map(|(field, message)| (*field, message.as_str()))
    }
}

/// Customer details that passed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerDetails {
    pub full_name: String,
    pub country_id: CountryId,
    pub city_id: CityId,
    pub phone: Option<PhoneNumber>,
    pub email: Option<Email>,
    pub additional_phone: Option<PhoneNumber>,
    pub address: String,
    pub notes: Option<String>,
}

fn non_blank(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

impl CheckoutForm {
    /// Validate the form, collecting a message for every failing field.
    ///
    /// # Errors
    ///
    /// Returns `ValidationErrors` when any field is invalid.
    pub fn validate(&self) -> Result<CustomerDetails, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        let full_name = self.full_name.trim();
        if full_name.chars().count() < MIN_NAME_LENGTH {
            errors.insert(CheckoutField::FullName, "الاسم الكامل مطلوب");
        }

        let country_id = non_blank(&self.country_id).and_then(|id| id.parse::<CountryId>().ok());
        if country_id.is_none() {
            errors.insert(CheckoutField::Country, "الدولة مطلوبة");
        }

        let city_id = non_blank(&self.city_id).and_then(|id| id.parse::<CityId>().ok());
        if city_id.is_none() {
            errors.insert(CheckoutField::City, "المدينة مطلوبة");
        }

        let phone_country = non_blank(&self.phone_country);
        let phone = match non_blank(&self.phone).map(|p| PhoneNumber::parse(p, phone_country)) {
            Some(Ok(phone)) => Some(phone),
            Some(Err(e)) => {
                errors.insert(CheckoutField::Phone, e.user_message());
                None
            }
            None => None,
        };

        let email = match non_blank(&self.email).map(Email::parse) {
            Some(Ok(email)) => Some(email),
            Some(Err(_)) => {
                errors.insert(CheckoutField::Email, "البريد الإلكتروني غير صالح");
                None
            }
            None => None,
        };

        if non_blank(&self.phone).is_none() && non_blank(&self.email).is_none() {
            errors.insert(
                CheckoutField::Phone,
                "يرجى إدخال رقم الهاتف أو البريد الإلكتروني",
            );
        }

        let additional_phone = match non_blank(&self.additional_phone)
            .map(|p| PhoneNumber::parse(p, phone_country))
        {
            Some(Ok(phone)) => Some(phone),
            Some(Err(e)) => {
                errors.insert(CheckoutField::AdditionalPhone, e.user_message());
                None
            }
            None => None,
        };

        let address = self.address.trim();
        if address.chars().count() < MIN_ADDRESS_LENGTH {
            errors.insert(CheckoutField::Address, "العنوان التفصيلي مطلوب");
        }

        match (country_id, city_id) {
            (Some(country_id), Some(city_id)) if errors.is_empty() => Ok(CustomerDetails {
                full_name: full_name.to_string(),
                country_id,
                city_id,
                phone,
                email,
                additional_phone,
                address: address.to_string(),
                notes: non_blank(&self.notes).map(str::to_string),
            }),
            _ => Err(errors),
        }
    }
}

impl From<&CustomerDetails> for CheckoutForm {
    fn from(details: &CustomerDetails) -> Self {
        Self {
            full_name: details.full_name.clone(),
            country_id: details.country_id.to_string(),
            city_id: details.city_id.to_string(),
            phone_country: details
                .phone
                .as_ref()
                .map(|p| p.country_code().to_string())
                .unwrap_or_default(),
            phone: details
                .phone
                .as_ref()
                .map(|p| p.subscriber().to_string())
                .unwrap_or_default(),
            email: details
                .email
                .as_ref()
                .map(|e| e.as_str().to_string())
                .unwrap_or_default(),
            additional_phone: details
                .additional_phone
                .as_ref()
                .map(|p| p.international().to_string())
                .unwrap_or_default(),
            address: details.address.clone(),
            notes: details.notes.clone().unwrap_or_default(),
        }
    }
}

// =============================================================================
// API payloads
// =============================================================================

/// Order submission sent to the store API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutRequest {
    pub items: Vec<CartItem>,
    pub customer_name: String,
    pub country_id: CountryId,
    pub city_id: CityId,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub additional_phone: Option<String>,
    pub address: String,
    pub notes: Option<String>,
    pub payment_method_id: PaymentMethodId,
}

/// How the store API answered an order submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutOutcome {
    /// Payment continues on an external gateway.
    Redirect(String),
    /// The order was created.
    Confirmed { reference: String },
    /// The submission failed; the message is shown to the visitor.
    Failed(String),
}

/// Status of a placed order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Processing,
    Cancelled,
    #[default]
    #[serde(other)]
    Pending,
}

impl OrderStatus {
    /// Arabic label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "قيد الانتظار",
            Self::Processing => "قيد المعالجة",
            Self::Cancelled => "ملغي",
        }
    }
}

/// What the visitor sees on the orders page after a successful checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderConfirmation {
    pub order_id: Option<OrderId>,
    pub reference: String,
    pub status: OrderStatus,
    pub payment_method_id: PaymentMethodId,
    pub payment_method_name: String,
    pub customer: CustomerDetails,
    pub items: Vec<CartItem>,
    pub total_in_usd: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    /// Set once the confirmation has been shown after checkout.
    #[serde(default)]
    pub announced: bool,
}

impl OrderConfirmation {
    /// Mark the order as announced. Returns `true` only the first time.
    pub fn announce(&mut self) -> bool {
        !core::mem::replace(&mut self.announced, true)
    }

    /// Whether the visitor can still cancel the order.
    #[must_use]
    pub const fn is_cancellable(&self) -> bool {
        matches!(self.status, OrderStatus::Pending | OrderStatus::Processing)
    }

    /// Mark the order cancelled. Returns `false` if it already was.
    pub fn cancel(&mut self) -> bool {
        if !self.is_cancellable() {
            return false;
        }
        self.status = OrderStatus::Cancelled;
        true
    }
}

// =============================================================================
// State machine
// =============================================================================

/// Where the visitor is in the checkout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum CheckoutStep {
    #[default]
    FillingDetails,
    SelectingPayment,
    Submitting,
    Success { reference: String },
    Redirect { url: String },
    Failure { message: String },
}

impl CheckoutStep {
    const fn name(&self) -> &'static str {
        match self {
            Self::FillingDetails => "filling_details",
            Self::SelectingPayment => "selecting_payment",
            Self::Submitting => "submitting",
            Self::Success { .. } => "success",
            Self::Redirect { .. } => "redirect",
            Self::Failure { .. } => "failure",
        }
    }
}

/// Errors from driving the checkout flow out of order.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CheckoutError {
    #[error("checkout is at {actual}, expected {expected}")]
    InvalidStep {
        expected: &'static str,
        actual: &'static str,
    },
    #[error("cart is empty")]
    EmptyCart,
    #[error("no payment method selected")]
    NoPaymentMethod,
    #[error("customer details missing")]
    MissingDetails,
}

impl CheckoutError {
    /// Arabic message for the payment page.
    #[must_use]
    pub const fn user_message(&self) -> &'static str {
        match self {
            Self::InvalidStep { .. } | Self::MissingDetails => "يرجى إكمال بيانات الطلب أولاً",
            Self::EmptyCart => "السلة فارغة",
            Self::NoPaymentMethod => "يرجى اختيار طريقة الدفع",
        }
    }
}

/// The checkout state machine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutFlow {
    step: CheckoutStep,
    details: Option<CustomerDetails>,
    payment_method_id: Option<PaymentMethodId>,
}

impl CheckoutFlow {
    /// Start a new checkout.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current step.
    #[must_use]
    pub const fn step(&self) -> &CheckoutStep {
        &self.step
    }

    /// Validated customer details, once submitted.
    #[must_use]
    pub const fn details(&self) -> Option<&CustomerDetails> {
        self.details.as_ref()
    }

    /// Selected payment method.
    #[must_use]
    pub const fn payment_method_id(&self) -> Option<PaymentMethodId> {
        self.payment_method_id
    }

    /// Validate details and move on to payment selection.
    ///
    /// Details can be edited from any step. On failure the flow is left
    /// unchanged.
    ///
    /// # Errors
    ///
    /// Returns `ValidationErrors` if the form is invalid.
    pub fn submit_details(&mut self, form: &CheckoutForm) -> Result<(), ValidationErrors> {
        let details = form.validate()?;
        self.details = Some(details);
        self.step = CheckoutStep::SelectingPayment;
        Ok(())
    }

    /// Choose a payment method.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::InvalidStep` outside `SelectingPayment`.
    pub fn select_payment(&mut self, method_id: PaymentMethodId) -> Result<(), CheckoutError> {
        self.expect_step(&CheckoutStep::SelectingPayment)?;
        self.payment_method_id = Some(method_id);
        Ok(())
    }

    /// Move to `Submitting` and build the order for the store API.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError` if not selecting payment, the cart is empty,
    /// or no payment method was chosen.
    pub fn begin_submission(&mut self, cart: &Cart) -> Result<CheckoutRequest, CheckoutError> {
        self.expect_step(&CheckoutStep::SelectingPayment)?;
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        let payment_method_id = self
            .payment_method_id
            .ok_or(CheckoutError::NoPaymentMethod)?;
        let details = self.details.as_ref().ok_or(CheckoutError::MissingDetails)?;

        let request = CheckoutRequest {
            items: cart.items().to_vec(),
            customer_name: details.full_name.clone(),
            country_id: details.country_id,
            city_id: details.city_id,
            phone: details.phone.as_ref().map(|p| p.international().to_string()),
            email: details.email.as_ref().map(|e| e.as_str().to_string()),
            additional_phone: details
                .additional_phone
                .as_ref()
                .map(|p| p.international().to_string()),
            address: details.address.clone(),
            notes: details.notes.clone(),
            payment_method_id,
        };
        self.step = CheckoutStep::Submitting;
        Ok(request)
    }

    /// Record the API's answer to the submission.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::InvalidStep` unless currently `Submitting`.
    pub fn complete(&mut self, outcome: CheckoutOutcome) -> Result<&CheckoutStep, CheckoutError> {
        self.expect_step(&CheckoutStep::Submitting)?;
        self.step = match outcome {
            CheckoutOutcome::Redirect(url) => CheckoutStep::Redirect { url },
            CheckoutOutcome::Confirmed { reference } => CheckoutStep::Success { reference },
            CheckoutOutcome::Failed(message) => CheckoutStep::Failure { message },
        };
        Ok(&self.step)
    }

    /// Return from `Failure` to payment selection, keeping details and the
    /// chosen method. Returns the failure message.
    pub fn retry(&mut self) -> Option<String> {
        match std::mem::take(&mut self.step) {
            CheckoutStep::Failure { message } => {
                self.step = CheckoutStep::SelectingPayment;
                Some(message)
            }
            other => {
                self.step = other;
                None
            }
        }
    }

    /// Abandon an in-flight submission that never completed.
    pub fn abort_submission(&mut self) {
        if self.step == CheckoutStep::Submitting {
            self.step = CheckoutStep::SelectingPayment;
        }
    }

    fn expect_step(&self, expected: &CheckoutStep) -> Result<(), CheckoutError> {
        if std::mem::discriminant(&self.step) == std::mem::discriminant(expected) {
            Ok(())
        } else {
            Err(CheckoutError::InvalidStep {
                expected: expected.name(),
                actual: self.step.name(),
            })
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::ProductId;

    fn valid_form() -> CheckoutForm {
        CheckoutForm {
            full_name: "أحمد علي".to_string(),
            country_id: "1".to_string(),
            city_id: "12".to_string(),
            phone_country: "SA".to_string(),
            phone: "512345678".to_string(),
            email: String::new(),
            additional_phone: String::new(),
            address: "حي النخيل، شارع الملك فهد، مبنى 4".to_string(),
            notes: String::new(),
        }
    }

    fn cart() -> Cart {
        let mut cart = Cart::new();
        cart.add_to_cart(ProductId::new(5), 2);
        cart
    }

    #[test]
    fn test_valid_form() {
        let details = valid_form().validate().unwrap();
        assert_eq!(details.country_id, CountryId::new(1));
        assert_eq!(details.phone.unwrap().international(), "+966512345678");
        assert!(details.email.is_none());
        assert!(details.notes.is_none());
    }

    #[test]
    fn test_empty_address_is_rejected() {
        let form = CheckoutForm {
            address: String::new(),
            ..valid_form()
        };
        let errors = form.validate().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors.get(CheckoutField::Address),
            Some("العنوان التفصيلي مطلوب")
        );
    }

    #[test]
    fn test_phone_or_email_required() {
        let form = CheckoutForm {
            phone: String::new(),
            ..valid_form()
        };
        let errors = form.validate().unwrap_err();
        assert!(errors.get(CheckoutField::Phone).is_some());

        let form = CheckoutForm {
            phone: String::new(),
            email: "buyer@example.com".to_string(),
            ..valid_form()
        };
        assert!(form.validate().is_ok());
    }

    #[test]
    fn test_collects_every_failing_field() {
        let errors = CheckoutForm::default().validate().unwrap_err();
        let fields: Vec<_> = errors.iter().map(|(field, _)| field).collect();
        assert_eq!(
            fields,
            vec![
                CheckoutField::FullName,
                CheckoutField::Country,
                CheckoutField::City,
                CheckoutField::Phone,
                CheckoutField::Address,
            ]
        );
    }

    #[test]
    fn test_bad_email_and_short_phone() {
        let form = CheckoutForm {
            phone: "5123".to_string(),
            email: "not-an-email".to_string(),
            ..valid_form()
        };
        let errors = form.validate().unwrap_err();
        assert!(errors.get(CheckoutField::Phone).is_some());
        assert_eq!(
            errors.get(CheckoutField::Email),
            Some("البريد الإلكتروني غير صالح")
        );
    }

    #[test]
    fn test_invalid_details_leave_flow_untouched() {
        let mut flow = CheckoutFlow::new();
        let form = CheckoutForm {
            address: String::new(),
            ..valid_form()
        };
        assert!(flow.submit_details(&form).is_err());
        assert_eq!(flow.step(), &CheckoutStep::FillingDetails);
        assert!(flow.details().is_none());
    }

    #[test]
    fn test_happy_path_to_success() {
        let mut flow = CheckoutFlow::new();
        flow.submit_details(&valid_form()).unwrap();
        flow.select_payment(PaymentMethodId::new(1)).unwrap();

        let request = flow.begin_submission(&cart()).unwrap();
        assert_eq!(request.items.len(), 1);
        assert_eq!(request.phone.as_deref(), Some("+966512345678"));
        assert_eq!(flow.step(), &CheckoutStep::Submitting);

        let step = flow
            .complete(CheckoutOutcome::Confirmed {
                reference: "ORD-1".to_string(),
            })
            .unwrap();
        assert_eq!(
            step,
            &CheckoutStep::Success {
                reference: "ORD-1".to_string()
            }
        );
    }

    #[test]
    fn test_redirect_outcome() {
        let mut flow = CheckoutFlow::new();
        flow.submit_details(&valid_form()).unwrap();
        flow.select_payment(PaymentMethodId::new(2)).unwrap();
        flow.begin_submission(&cart()).unwrap();
        let step = flow
            .complete(CheckoutOutcome::Redirect("https://pay.example/x".to_string()))
            .unwrap();
        assert!(matches!(step, CheckoutStep::Redirect { .. }));
    }

    #[test]
    fn test_failure_returns_to_payment_selection() {
        let mut flow = CheckoutFlow::new();
        flow.submit_details(&valid_form()).unwrap();
        flow.select_payment(PaymentMethodId::new(1)).unwrap();
        flow.begin_submission(&cart()).unwrap();
        flow.complete(CheckoutOutcome::Failed("declined".to_string()))
            .unwrap();

        assert_eq!(flow.retry().as_deref(), Some("declined"));
        assert_eq!(flow.step(), &CheckoutStep::SelectingPayment);
        assert_eq!(flow.payment_method_id(), Some(PaymentMethodId::new(1)));
        assert!(flow.details().is_some());
    }

    #[test]
    fn test_select_payment_requires_details() {
        let mut flow = CheckoutFlow::new();
        assert_eq!(
            flow.select_payment(PaymentMethodId::new(1)),
            Err(CheckoutError::InvalidStep {
                expected: "selecting_payment",
                actual: "filling_details",
            })
        );
    }

    #[test]
    fn test_begin_submission_guards() {
        let mut flow = CheckoutFlow::new();
        flow.submit_details(&valid_form()).unwrap();
        assert_eq!(
            flow.begin_submission(&Cart::new()),
            Err(CheckoutError::EmptyCart)
        );
        assert_eq!(
            flow.begin_submission(&cart()),
            Err(CheckoutError::NoPaymentMethod)
        );
        assert_eq!(flow.step(), &CheckoutStep::SelectingPayment);
    }

    #[test]
    fn test_complete_outside_submitting_fails() {
        let mut flow = CheckoutFlow::new();
        assert!(
            flow.complete(CheckoutOutcome::Failed("x".to_string()))
                .is_err()
        );
    }

    #[test]
    fn test_flow_survives_serialization() {
        let mut flow = CheckoutFlow::new();
        flow.submit_details(&valid_form()).unwrap();
        let json = serde_json::to_value(&flow).unwrap();
        assert_eq!(json["step"]["step"], "selecting_payment");
        let restored: CheckoutFlow = serde_json::from_value(json).unwrap();
        assert_eq!(restored, flow);
    }

    #[test]
    fn test_form_prefill_from_details() {
        let details = valid_form().validate().unwrap();
        let form = CheckoutForm::from(&details);
        assert_eq!(form.phone_country, "SA");
        assert_eq!(form.validate().unwrap(), details);
    }

    #[test]
    fn test_unknown_order_status_defaults_to_pending() {
        let status: OrderStatus = serde_json::from_str("\"shipped\"").unwrap();
        assert_eq!(status, OrderStatus::Pending);
    }

    fn confirmation(status: OrderStatus) -> OrderConfirmation {
        OrderConfirmation {
            order_id: Some(OrderId::new(7)),
            reference: "ORD-7".to_string(),
            status,
            payment_method_id: PaymentMethodId::new(1),
            payment_method_name: "الدفع عند الاستلام".to_string(),
            customer: valid_form().validate().unwrap(),
            items: cart().items().to_vec(),
            total_in_usd: None,
            created_at: Utc::now(),
            announced: false,
        }
    }

    #[test]
    fn test_cancel_order_once() {
        let mut order = confirmation(OrderStatus::Processing);
        assert!(order.cancel());
        assert_eq!(order.status, OrderStatus::Cancelled);
        assert!(!order.is_cancellable());
        assert!(!order.cancel());
    }

    #[test]
    fn test_announce_only_once() {
        let mut order = confirmation(OrderStatus::Pending);
        assert!(order.announce());
        assert!(!order.announce());

        let stored = serde_json::to_string(&order).unwrap();
        let mut reloaded: OrderConfirmation = serde_json::from_str(&stored).unwrap();
        assert!(!reloaded.announce());
    }

    #[test]
    fn test_confirmation_without_announced_flag_loads() {
        let mut value = serde_json::to_value(confirmation(OrderStatus::Pending)).unwrap();
        value.as_object_mut().unwrap().remove("announced");
        let order: OrderConfirmation = serde_json::from_value(value).unwrap();
        assert!(!order.announced);
    }
}
