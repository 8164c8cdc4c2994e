use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{SocialError, SocialResult};

pub const MAX_TITLE_CHARS: usize = 255;
pub const MAX_POST_CHARS: usize = 10_000;
pub const MAX_COMMENT_CHARS: usize = 2_000;
pub const MAX_GROUP_NAME_CHARS: usize = 100;
pub const MAX_GROUP_DESCRIPTION_CHARS: usize = 1_000;

static USERNAME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9_]{3,30}$").expect("Failed to compile username regex")
});

static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("Failed to compile email regex")
});

fn invalid(message: String) -> SocialError {
    SocialError::Validation(message)
}

/// Non-blank text of at most `max` characters
fn check_text(field: &str, value: &str, max: usize) -> SocialResult<()> {
    if value.trim().is_empty() {
        return Err(invalid(format!("{} cannot be empty", field)));
    }
    let len = value.chars().count();
    if len > max {
        return Err(invalid(format!(
            "{} exceeds {} character limit (current: {})",
            field, max, len
        )));
    }
    Ok(())
}

pub fn validate_username(username: &str) -> SocialResult<()> {
    if USERNAME_REGEX.is_match(username) {
        Ok(())
    } else {
        Err(invalid(
            "Username must be 3-30 characters of letters, digits or underscores".to_string(),
        ))
    }
}

pub fn validate_email(email: &str) -> SocialResult<()> {
    if EMAIL_REGEX.is_match(email) {
        Ok(())
    } else {
        Err(invalid("Enter a valid email address".to_string()))
    }
}

pub fn validate_title(title: &str) -> SocialResult<()> {
    check_text("Title", title, MAX_TITLE_CHARS)
}

pub fn validate_post_content(content: &str) -> SocialResult<()> {
    check_text("Post content", content, MAX_POST_CHARS)
}

pub fn validate_comment(content: &str) -> SocialResult<()> {
    check_text("Comment", content, MAX_COMMENT_CHARS)
}

pub fn validate_group_name(name: &str) -> SocialResult<()> {
    check_text("Group name", name, MAX_GROUP_NAME_CHARS)
}

/// Descriptions may be empty
pub fn validate_group_description(description: &str) -> SocialResult<()> {
    let len = description.chars().count();
    if len > MAX_GROUP_DESCRIPTION_CHARS {
        return Err(invalid(format!(
            "Group description exceeds {} character limit (current: {})",
            MAX_GROUP_DESCRIPTION_CHARS, len
        )));
    }
    Ok(())
}
