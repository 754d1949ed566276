//! Validation helpers for outbound DTOs.

use validator::ValidationError;

/// Seeds are rendered by the authority as at least three lowercase words separated by spaces.
///
/// # Examples
///
/// ```ignore
/// validate_seed_phrase("apple orbit tunnel") // Ok
/// validate_seed_phrase("Apple orbit tunnel") // Err - uppercase
/// validate_seed_phrase("apple")              // Err - too short
/// ```
pub fn validate_seed_phrase(seed: &str) -> Result<(), ValidationError> {
    let words: Vec<&str> = seed.split_whitespace().collect();
    if words.len() < 3 {
        let mut err = ValidationError::new("seed_length");
        err.message = Some(format!("Seed must have at least 3 words (got {})", words.len()).into());
        return Err(err);
    }

    if !words
        .iter()
        .all(|word| word.chars().all(|c| c.is_ascii_lowercase()))
    {
        let mut err = ValidationError::new("seed_format");
        err.message = Some("Seed words must contain only lowercase letters".into());
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_seed_phrase_valid() {
        assert!(validate_seed_phrase("apple orbit tunnel").is_ok());
        assert!(validate_seed_phrase("  apple   orbit tunnel lemon ").is_ok());
    }

    #[test]
    fn test_validate_seed_phrase_invalid() {
        assert!(validate_seed_phrase("").is_err());
        assert!(validate_seed_phrase("apple orbit").is_err()); // too short
        assert!(validate_seed_phrase("Apple orbit tunnel").is_err()); // uppercase
        assert!(validate_seed_phrase("apple orb1t tunnel").is_err()); // digit
    }
}
