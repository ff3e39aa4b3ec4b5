//! Short code generation and custom code validation.

use rand::RngExt;

/// Length of generated short codes.
pub const CODE_LENGTH: usize = 6;

/// Longest custom code accepted.
pub const MAX_CUSTOM_CODE_LENGTH: usize = 64;

/// URL-safe alphabet shared by generated and custom codes.
pub const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789_-";

/// Path segments that would shadow service routes.
const RESERVED_CODES: &[&str] = &["api", "health"];

/// Source of candidate short codes. Collisions are the caller's problem.
pub trait CodeGenerator: Send + Sync {
    fn generate(&self) -> String;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct RandomCodeGenerator;

impl CodeGenerator for RandomCodeGenerator {
    fn generate(&self) -> String {
        let mut rng = rand::rng();
        (0..CODE_LENGTH)
            .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
            .collect()
    }
}

pub fn is_alphabet_char(c: char) -> bool {
    c.is_ascii() && ALPHABET.contains(&(c as u8))
}

/// Check a caller-chosen code. Returns the reason on failure.
pub fn validate_custom_code(code: &str) -> Result<(), String> {
    if code.is_empty() || code.len() > MAX_CUSTOM_CODE_LENGTH {
        return Err(format!(
            "Custom code must be 1-{MAX_CUSTOM_CODE_LENGTH} characters"
        ));
    }

    if !code.chars().all(is_alphabet_char) {
        return Err("Custom code may only contain letters, digits, '_' and '-'".to_string());
    }

    if RESERVED_CODES
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(code))
    {
        return Err(format!("Custom code '{code}' is reserved"));
    }

    Ok(())
}
