// Copyright (c) MySocial Team
// SPDX-License-Identifier: Apache-2.0

//! Request body validation.
//!
//! Every check records a [`ValidationIssue`] instead of failing fast, so a
//! client gets the full list of problems in one 400 response.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

static URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^https?://[^\s/$.?#][^\s]*$").expect("valid url regex"));

static MARKUP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[<>{}]").expect("valid markup regex"));

const PASSWORD_SPECIALS: &str = "@$!%*?&";

pub const BIO_MAX_CHARS: usize = 500;
pub const BIO_MAX_WORDS: usize = 100;

/// A single field-level problem
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    pub path: String,
    pub message: String,
}

/// Collects issues for one request body
#[derive(Debug, Default)]
pub struct Validator {
    issues: Vec<ValidationIssue>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&mut self, path: &str, message: impl Into<String>) {
        self.issues.push(ValidationIssue {
            path: path.to_string(),
            message: message.into(),
        });
    }

    /// Record `message` for `path` unless `ok` holds
    pub fn check(&mut self, ok: bool, path: &str, message: impl Into<String>) -> &mut Self {
        if !ok {
            self.issue(path, message);
        }
        self
    }

    pub fn length(&mut self, value: &str, path: &str, min: usize, max: usize, label: &str) -> &mut Self {
        let len = value.chars().count();
        if len < min {
            self.issue(path, format!("{} must be at least {} characters", label, min));
        } else if len > max {
            self.issue(path, format!("{} must be less than {} characters", label, max));
        }
        self
    }

    pub fn name(&mut self, value: &str, path: &str) -> &mut Self {
        self.length(value.trim(), path, 2, 50, "Name")
    }

    pub fn email(&mut self, value: &str, path: &str) -> &mut Self {
        self.check(is_valid_email(value), path, "Invalid email address")
    }

    pub fn url(&mut self, value: &str, path: &str) -> &mut Self {
        self.check(is_valid_url(value), path, "Must be a valid http(s) URL")
    }

    pub fn bio(&mut self, value: &str, path: &str) -> &mut Self {
        for message in bio_problems(value) {
            self.issue(path, message);
        }
        self
    }

    pub fn password(&mut self, value: &str, path: &str) -> &mut Self {
        for message in password_problems(value) {
            self.issue(path, message);
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn finish(self) -> Result<(), Vec<ValidationIssue>> {
        if self.issues.is_empty() {
            Ok(())
        } else {
            Err(self.issues)
        }
    }
}

pub fn is_valid_email(value: &str) -> bool {
    EMAIL_RE.is_match(value.trim())
}

pub fn is_valid_url(value: &str) -> bool {
    URL_RE.is_match(value)
}

/// Content policy for profile bios
pub fn bio_problems(bio: &str) -> Vec<&'static str> {
    let mut problems = Vec::new();
    if bio.chars().count() > BIO_MAX_CHARS {
        problems.push("Bio must be less than 500 characters");
    }
    if bio.split_whitespace().count() > BIO_MAX_WORDS {
        problems.push("Bio cannot exceed 100 words");
    }
    if bio.contains("http") || bio.contains("www.") {
        problems.push("Bio cannot contain URLs");
    }
    if MARKUP_RE.is_match(bio) {
        problems.push("Bio cannot contain HTML or special characters");
    }
    problems
}

/// Complexity rules for new passwords
pub fn password_problems(password: &str) -> Vec<&'static str> {
    let mut problems = Vec::new();
    let len = password.chars().count();
    if len < 8 {
        problems.push("Password must be at least 8 characters");
    }
    if len > 100 {
        problems.push("Password must be less than 100 characters");
    }

    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_special = password.chars().any(|c| PASSWORD_SPECIALS.contains(c));
    let allowed = password
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || PASSWORD_SPECIALS.contains(c));

    if !(has_lower && has_upper && has_digit && has_special && allowed) {
        problems.push(
            "Password must contain at least one uppercase letter, one lowercase letter, one number, and one special character",
        );
    }
    problems
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bio_rejects_links_and_markup() {
        assert!(bio_problems("I love cooking pasta").is_empty());
        assert_eq!(bio_problems("see http://example.com"), vec!["Bio cannot contain URLs"]);
        assert_eq!(bio_problems("visit www.food.io"), vec!["Bio cannot contain URLs"]);
        for ch in ["<", ">", "{", "}"] {
            let bio = format!("chef {} baker", ch);
            assert_eq!(
                bio_problems(&bio),
                vec!["Bio cannot contain HTML or special characters"],
                "{}",
                bio
            );
        }
    }

    #[test]
    fn bio_enforces_length_and_word_count() {
        let long = "a".repeat(501);
        assert!(bio_problems(&long).contains(&"Bio must be less than 500 characters"));

        let wordy = vec!["word"; 101].join(" ");
        assert_eq!(bio_problems(&wordy), vec!["Bio cannot exceed 100 words"]);

        let exactly = vec!["word"; 100].join(" ");
        assert!(bio_problems(&exactly).is_empty());
    }

    #[test]
    fn password_complexity() {
        assert!(password_problems("Sup3r$ecret").is_empty());
        assert!(!password_problems("short1!").is_empty());
        assert!(!password_problems("alllowercase1!").is_empty());
        assert!(!password_problems("NoDigits!!").is_empty());
        assert!(!password_problems("NoSpecial123").is_empty());
        // characters outside the allowed set
        assert!(!password_problems("Sup3r$ecret#").is_empty());
    }

    #[test]
    fn validator_collects_every_issue() {
        let mut v = Validator::new();
        v.name("A", "name").email("not-an-email", "email").url("ftp://x", "image");
        let issues = v.finish().unwrap_err();
        let paths: Vec<_> = issues.iter().map(|i| i.path.as_str()).collect();
        assert_eq!(paths, vec!["name", "email", "image"]);
    }

    #[test]
    fn emails_and_urls() {
        assert!(is_valid_email("cook@example.com"));
        assert!(!is_valid_email("cook@example"));
        assert!(is_valid_url("https://cdn.example.com/a.png"));
        assert!(!is_valid_url("javascript:alert(1)"));
    }
}
