//! Field constraints for thread input.

use domains::{DomainError, DomainResult};

pub const TITLE_MAX_CHARS: usize = 200;
pub const DESCRIPTION_MAX_CHARS: usize = 500;

/// Trims and checks a title. Length is counted in characters, not bytes.
pub fn title(raw: &str) -> DomainResult<String> {
    let title = raw.trim();
    if title.is_empty() {
        return Err(DomainError::InvalidArgument("Title is required".into()));
    }
    if title.chars().count() > TITLE_MAX_CHARS {
        return Err(DomainError::InvalidArgument(format!(
            "Title must be at most {TITLE_MAX_CHARS} characters"
        )));
    }
    Ok(title.to_owned())
}

/// Blank descriptions are stored as absent.
pub fn description(raw: Option<String>) -> DomainResult<Option<String>> {
    let Some(description) = raw else {
        return Ok(None);
    };
    if description.chars().count() > DESCRIPTION_MAX_CHARS {
        return Err(DomainError::InvalidArgument(format!(
            "Description must be at most {DESCRIPTION_MAX_CHARS} characters"
        )));
    }
    if description.trim().is_empty() {
        Ok(None)
    } else {
        Ok(Some(description))
    }
}
