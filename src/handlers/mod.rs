/// Handler Module Index
///
/// One module per resource. Handlers validate input, read or write records through the
/// `Repository` in the shared `AppState`, and shape the JSON response. Role checks are
/// done here, against the `AuthUser` resolved by the extractor.
pub mod articles;
pub mod categories;
pub mod session;
pub mod stats;
pub mod users;

use crate::error::{AppError, AppResult};

/// Upper bound for a staff member's display name.
pub(crate) const MAX_PERSON_NAME_CHARS: usize = 100;

/// Trims `value` and rejects it when blank or longer than `max_chars`.
pub(crate) fn required_text(field: &str, value: &str, max_chars: usize) -> AppResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::Validation(format!("{field} is required")));
    }
    if value.chars().count() > max_chars {
        return Err(AppError::Validation(format!(
            "{field} must be at most {max_chars} characters"
        )));
    }
    Ok(value.to_string())
}

/// Trims an optional text field; blank means absent.
pub(crate) fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
