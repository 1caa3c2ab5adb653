use thiserror::Error;

pub const MAX_DESCRIPTION_CHARS: usize = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InvalidContent {
    #[error("Description must be at least one character long.")]
    Empty,

    #[error("Description must be no more than {} characters.", MAX_DESCRIPTION_CHARS)]
    TooLong,
}

/// Non-blank and at most 300 characters (not bytes). The stored text is the
/// caller's input as given; trimming only decides emptiness.
pub fn validate_description(description: &str) -> Result<(), InvalidContent> {
    if description.trim().is_empty() {
        return Err(InvalidContent::Empty);
    }
    if description.chars().count() > MAX_DESCRIPTION_CHARS {
        return Err(InvalidContent::TooLong);
    }
    Ok(())
}
