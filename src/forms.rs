//! Request body shapes and their validation rules.
//!
//! Every form is built from a [`FormInput`] so the same rules apply whether
//! the client sent JSON, urlencoded or multipart. Text values are trimmed and
//! blank values count as missing; passwords are taken verbatim.

use std::path::Path;

use validator::Validate;

use crate::error::FieldErrors;
use crate::extractors::{FormInput, UploadedFile};

fn trimmed(input: &mut FormInput, name: &str) -> Option<String> {
    input
        .take_text(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn verbatim(input: &mut FormInput, name: &str) -> Option<String> {
    input.take_text(name).filter(|v| !v.is_empty())
}

#[derive(Debug, Validate)]
pub struct SignupForm {
    #[validate(
        required(message = "The name field is required."),
        length(max = 255, message = "The name may not be greater than 255 characters.")
    )]
    pub name: Option<String>,

    #[validate(
        required(message = "The email field is required."),
        email(message = "The email must be a valid email address."),
        length(max = 255, message = "The email may not be greater than 255 characters.")
    )]
    pub email: Option<String>,

    #[validate(
        required(message = "The password field is required."),
        length(
            min = 8,
            max = 255,
            message = "The password must be between 8 and 255 characters."
        )
    )]
    pub password: Option<String>,
}

impl SignupForm {
    pub fn from_input(input: &mut FormInput) -> Self {
        Self {
            name: trimmed(input, "name"),
            email: trimmed(input, "email"),
            password: verbatim(input, "password"),
        }
    }
}

#[derive(Debug, Validate)]
pub struct LoginForm {
    #[validate(
        required(message = "The email field is required."),
        email(message = "The email must be a valid email address.")
    )]
    pub email: Option<String>,

    #[validate(
        required(message = "The password field is required."),
        length(
            min = 8,
            max = 255,
            message = "The password must be between 8 and 255 characters."
        )
    )]
    pub password: Option<String>,
}

impl LoginForm {
    pub fn from_input(input: &mut FormInput) -> Self {
        Self {
            email: trimmed(input, "email"),
            password: verbatim(input, "password"),
        }
    }
}

#[derive(Debug, Validate)]
pub struct PostForm {
    #[validate(required(message = "The content field is required."))]
    pub content: Option<String>,
}

impl PostForm {
    pub fn from_input(input: &mut FormInput) -> Self {
        Self {
            content: trimmed(input, "content"),
        }
    }
}

#[derive(Debug, Validate)]
pub struct CommentForm {
    #[validate(
        required(message = "The comment text field is required."),
        length(
            max = 1000,
            message = "The comment text may not be greater than 1000 characters."
        )
    )]
    pub comment_text: Option<String>,
}

impl CommentForm {
    pub fn from_input(input: &mut FormInput) -> Self {
        Self {
            comment_text: trimmed(input, "comment_text"),
        }
    }
}

/// Accepted types and size cap for one upload field.
#[derive(Debug, Clone, Copy)]
pub struct UploadRule {
    pub field: &'static str,
    pub extensions: &'static [&'static str],
    pub max_kb: u64,
}

pub const PROFILE_PHOTO: UploadRule = UploadRule {
    field: "profile_photo",
    extensions: &["jpeg", "png", "jpg"],
    max_kb: 5048,
};

const MEDIA_EXTENSIONS: &[&str] = &["jpeg", "png", "jpg", "gif", "mp4", "mov", "avi"];

/// Post attachments, capped at `max_kb` from configuration.
pub fn post_media(max_kb: u64) -> UploadRule {
    UploadRule {
        field: "media_file",
        extensions: MEDIA_EXTENSIONS,
        max_kb,
    }
}

impl UploadRule {
    /// Check `file` and return the lowercase extension to store it under.
    ///
    /// The file name's extension wins; without a usable one the declared
    /// content type is mapped back to an extension.
    pub fn check(&self, file: &UploadedFile) -> Result<String, FieldErrors> {
        let mut errors = FieldErrors::new();

        let ext = self.extension_of(file);
        if ext.is_none() {
            errors.add(
                self.field,
                format!(
                    "The {} must be a file of type: {}.",
                    self.label(),
                    self.extensions.join(", ")
                ),
            );
        }

        if file.bytes.len() as u64 > self.max_kb.saturating_mul(1024) {
            errors.add(
                self.field,
                format!(
                    "The {} may not be greater than {} kilobytes.",
                    self.label(),
                    self.max_kb
                ),
            );
        }

        match ext {
            Some(ext) if errors.is_empty() => Ok(ext),
            _ => Err(errors),
        }
    }

    /// Error for a field that arrived as text instead of a file.
    pub fn not_a_file(&self) -> FieldErrors {
        FieldErrors::single(self.field, format!("The {} must be a file.", self.label()))
    }

    fn label(&self) -> String {
        self.field.replace('_', " ")
    }

    fn extension_of(&self, file: &UploadedFile) -> Option<String> {
        let from_name = file
            .file_name
            .as_deref()
            .and_then(|name| Path::new(name).extension())
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .filter(|ext| self.extensions.contains(&ext.as_str()));
        if from_name.is_some() {
            return from_name;
        }

        let content_type = file.content_type.as_deref()?;
        mime_guess::get_mime_extensions_str(content_type)?
            .iter()
            .find(|ext| self.extensions.contains(ext))
            .map(|ext| ext.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn file(name: Option<&str>, content_type: Option<&str>, size: usize) -> UploadedFile {
        UploadedFile {
            file_name: name.map(String::from),
            content_type: content_type.map(String::from),
            bytes: Bytes::from(vec![0u8; size]),
        }
    }

    #[test]
    fn signup_requires_all_fields() {
        let mut input = FormInput::from_fields(&[("name", "   ")]);
        let form = SignupForm::from_input(&mut input);
        let errors: FieldErrors = form.validate().unwrap_err().into();
        assert_eq!(
            errors.get("name").unwrap(),
            &["The name field is required.".to_string()]
        );
        assert!(errors.get("email").is_some());
        assert!(errors.get("password").is_some());
    }

    #[test]
    fn signup_checks_email_and_password_length() {
        let mut input = FormInput::from_fields(&[
            ("name", "Alice"),
            ("email", "not-an-email"),
            ("password", "short"),
        ]);
        let errors: FieldErrors = SignupForm::from_input(&mut input)
            .validate()
            .unwrap_err()
            .into();
        assert!(errors.get("name").is_none());
        assert_eq!(
            errors.get("email").unwrap(),
            &["The email must be a valid email address.".to_string()]
        );
        assert!(errors.get("password").is_some());
    }

    #[test]
    fn signup_accepts_valid_input_and_trims() {
        let mut input = FormInput::from_fields(&[
            ("name", "  Alice "),
            ("email", "alice@example.com"),
            ("password", " password123 "),
        ]);
        let form = SignupForm::from_input(&mut input);
        assert!(form.validate().is_ok());
        assert_eq!(form.name.as_deref(), Some("Alice"));
        assert_eq!(form.password.as_deref(), Some(" password123 "));
    }

    #[test]
    fn comment_text_is_capped() {
        let long = "x".repeat(1001);
        let mut input = FormInput::from_fields(&[("comment_text", long.as_str())]);
        let errors: FieldErrors = CommentForm::from_input(&mut input)
            .validate()
            .unwrap_err()
            .into();
        assert!(errors.get("comment_text").is_some());

        let ok = "x".repeat(1000);
        let mut input = FormInput::from_fields(&[("comment_text", ok.as_str())]);
        assert!(CommentForm::from_input(&mut input).validate().is_ok());
    }

    #[test]
    fn post_content_is_required() {
        let mut input = FormInput::from_fields(&[]);
        assert!(PostForm::from_input(&mut input).validate().is_err());
    }

    #[test]
    fn upload_extension_comes_from_file_name() {
        let ext = PROFILE_PHOTO
            .check(&file(Some("Me.JPG"), None, 10))
            .unwrap();
        assert_eq!(ext, "jpg");
    }

    #[test]
    fn upload_falls_back_to_content_type() {
        let ext = post_media(20480)
            .check(&file(Some("blob"), Some("image/gif"), 10))
            .unwrap();
        assert_eq!(ext, "gif");
    }

    #[test]
    fn upload_rejects_wrong_type() {
        let errors = PROFILE_PHOTO
            .check(&file(Some("clip.mp4"), Some("video/mp4"), 10))
            .unwrap_err();
        assert_eq!(
            errors.get("profile_photo").unwrap(),
            &["The profile photo must be a file of type: jpeg, png, jpg.".to_string()]
        );
    }

    #[test]
    fn upload_rejects_oversized_file() {
        let rule = post_media(1);
        assert!(rule.check(&file(Some("a.png"), None, 1024)).is_ok());
        let errors = rule.check(&file(Some("a.png"), None, 1025)).unwrap_err();
        assert_eq!(
            errors.get("media_file").unwrap(),
            &["The media file may not be greater than 1 kilobytes.".to_string()]
        );
    }
}
