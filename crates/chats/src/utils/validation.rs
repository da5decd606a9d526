//! Validation utilities.

use courier_database::ChatError;

const USER_NAME_MIN: usize = 3;
const USER_NAME_MAX: usize = 16;
const GROUP_NAME_MAX: usize = 32;
/// Base emoji plus skin tone modifiers, variation selectors and ZWJ joins.
const EMOJI_MAX_SCALARS: usize = 8;

/// Validation utilities
pub struct Validator;

impl Validator {
    /// Validate a user name: 3 to 16 characters, no surrounding whitespace
    pub fn user_name(name: &str) -> Result<(), ChatError> {
        let length = name.chars().count();
        if !(USER_NAME_MIN..=USER_NAME_MAX).contains(&length) {
            return Err(ChatError::validation(format!(
                "User name must be between {USER_NAME_MIN} and {USER_NAME_MAX} characters"
            )));
        }

        if name.trim() != name {
            return Err(ChatError::validation(
                "User name cannot start or end with whitespace",
            ));
        }

        Ok(())
    }

    /// Validate a group name: 1 to 32 characters, not blank
    pub fn group_name(name: &str) -> Result<(), ChatError> {
        if name.trim().is_empty() {
            return Err(ChatError::validation("Group name cannot be empty"));
        }

        if name.chars().count() > GROUP_NAME_MAX {
            return Err(ChatError::validation(format!(
                "Group name too long (max {GROUP_NAME_MAX} characters)"
            )));
        }

        Ok(())
    }

    /// Validate comment content: a single emoji.
    ///
    /// The first scalar must come from the emoticon, pictograph, transport or
    /// alchemical blocks (U+1F300 to U+1F77F).
    pub fn emoji(content: &str) -> Result<(), ChatError> {
        let Some(first) = content.chars().next() else {
            return Err(ChatError::validation("Comment cannot be empty"));
        };

        if !('\u{1F300}'..='\u{1F77F}').contains(&first) {
            return Err(ChatError::validation("Comment must be an emoji"));
        }

        if content.chars().any(char::is_whitespace) {
            return Err(ChatError::validation("Comment must be a single emoji"));
        }

        if content.chars().count() > EMOJI_MAX_SCALARS {
            return Err(ChatError::validation("Comment must be a single emoji"));
        }

        Ok(())
    }

    /// Validate uploaded photo bytes
    pub fn photo(bytes: &[u8]) -> Result<(), ChatError> {
        if bytes.is_empty() {
            return Err(ChatError::validation("Photo cannot be empty"));
        }
        Ok(())
    }
}
