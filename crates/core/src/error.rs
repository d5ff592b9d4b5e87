//! Failure categories shared by every layer of the storefront.

use core::fmt;

use serde::{Deserialize, Serialize};

/// The category of a failure, independent of where it happened.
///
/// Fetch errors, form errors and missing resources all collapse into one of
/// these kinds so pages can pick a fallback without inspecting the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The remote API could not be reached or answered with a failure status.
    Network,
    /// The request was cancelled because it exceeded the client timeout.
    Timeout,
    /// User input failed validation.
    Validation,
    /// The requested product, category or order does not exist.
    NotFound,
}

impl ErrorKind {
    /// Arabic message shown to visitors for this kind of failure.
    #[must_use]
    pub const fn user_message(self) -> &'static str {
        match self {
            Self::Network => "تعذر الاتصال بالمتجر، حاول مرة أخرى",
            Self::Timeout => "انتهت مهلة الطلب، حاول مرة أخرى",
            Self::Validation => "يرجى مراجعة البيانات المدخلة",
            Self::NotFound => "الصفحة غير موجودة",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Network => "network",
            Self::Timeout => "timeout",
            Self::Validation => "validation",
            Self::NotFound => "not_found",
        };
        f.write_str(label)
    }
}
