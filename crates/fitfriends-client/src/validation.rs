//! Registration form rules
//!
//! Every field is checked and all violations are reported together, one
//! message per field, so a front end can show them inline.

use std::fmt;
use std::path::Path;
use std::sync::LazyLock;

use chrono::NaiveDate;
use common::Secret;
use regex::Regex;

use crate::models::{ClientProfile, CreateUserDto, Gender, Location, TrainerProfile, UserRole};

const NAME_MAX_CHARS: usize = 15;
const PASSWORD_MIN_CHARS: usize = 6;
const PASSWORD_MAX_CHARS: usize = 12;
const AVATAR_MAX_BYTES: usize = 1_000_000;
const AVATAR_EXTENSIONS: [&str; 3] = ["jpg", "png", "jpeg"];

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles"));

fn earliest_birth_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(1900, 1, 1).unwrap_or(NaiveDate::MIN)
}

/// One rule violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// All violations found in one form submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.errors.push(FieldError {
            field,
            message: message.into(),
        });
    }

    /// Append all of `other`'s violations.
    pub fn merge(&mut self, other: ValidationErrors) {
        self.errors.extend(other.errors);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// Message for `field`, if it failed.
    pub fn field(&self, field: &str) -> Option<&str> {
        self.errors
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, e) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", e.field, e.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Raw registration form input.
#[derive(Debug, Clone, Default)]
pub struct RegisterForm {
    pub name: String,
    pub email: String,
    /// `YYYY-MM-DD`
    pub birth_date: String,
    pub location: String,
    pub password: String,
    pub gender: String,
    pub role: String,
    pub terms: bool,
}

impl RegisterForm {
    /// Check every field against the registration rules and build the
    /// request body. `today` bounds the birth date.
    pub fn validate(&self, today: NaiveDate) -> Result<CreateUserDto, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        let name_len = self.name.chars().count();
        if name_len == 0 {
            errors.push("name", "name is required");
        } else if name_len > NAME_MAX_CHARS {
            errors.push(
                "name",
                format!("name must be at most {NAME_MAX_CHARS} characters"),
            );
        }

        if !EMAIL_RE.is_match(&self.email) {
            errors.push("email", "invalid email address");
        }

        let birth_date = match NaiveDate::parse_from_str(&self.birth_date, "%Y-%m-%d") {
            Ok(date) if date < earliest_birth_date() => {
                errors.push("birthDate", "birth date must be on or after 1900-01-01");
                None
            }
            Ok(date) if date > today => {
                errors.push("birthDate", "birth date cannot be in the future");
                None
            }
            Ok(date) => Some(date),
            Err(_) => {
                errors.push("birthDate", "birth date must be YYYY-MM-DD");
                None
            }
        };

        let location = Location::parse(&self.location);
        if location.is_none() {
            errors.push("location", format!("unknown station '{}'", self.location));
        }

        let password_len = self.password.chars().count();
        if !(PASSWORD_MIN_CHARS..=PASSWORD_MAX_CHARS).contains(&password_len) {
            errors.push(
                "password",
                format!("password must be {PASSWORD_MIN_CHARS} to {PASSWORD_MAX_CHARS} characters"),
            );
        }

        let gender = Gender::parse(&self.gender);
        if gender.is_none() {
            errors.push("gender", format!("unknown gender '{}'", self.gender));
        }

        let role = UserRole::parse(&self.role);
        if role.is_none() {
            errors.push("role", format!("unknown role '{}'", self.role));
        }

        if !self.terms {
            errors.push("terms", "the user agreement must be accepted");
        }

        match (birth_date, location, gender, role) {
            (Some(birth_date), Some(location), Some(gender), Some(role)) if errors.is_empty() => {
                let (client, trainer) = match role {
                    UserRole::Client => (Some(ClientProfile::default()), None),
                    UserRole::Trainer => (None, Some(TrainerProfile::default())),
                };
                Ok(CreateUserDto {
                    name: self.name.clone(),
                    email: self.email.clone(),
                    birth_date,
                    location,
                    password: Secret::new(self.password.clone()),
                    gender,
                    role,
                    client,
                    trainer,
                })
            }
            _ => Err(errors),
        }
    }
}

/// Avatar image selected for upload.
#[derive(Clone)]
pub struct AvatarFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl fmt::Debug for AvatarFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AvatarFile")
            .field("file_name", &self.file_name)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl AvatarFile {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    /// Read an avatar from disk, keeping its file name.
    pub async fn read(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| String::from("avatar"));
        Ok(Self { file_name, bytes })
    }

    /// Lowercased file extension.
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.file_name)
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
    }

    /// MIME type sent with the multipart part.
    pub fn mime_type(&self) -> &'static str {
        match self.extension().as_deref() {
            Some("png") => "image/png",
            Some("jpg") | Some("jpeg") => "image/jpeg",
            _ => "application/octet-stream",
        }
    }

    /// Check extension and size.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let allowed = self
            .extension()
            .is_some_and(|ext| AVATAR_EXTENSIONS.contains(&ext.as_str()));
        if !allowed {
            errors.push("avatar", "avatar must be a jpg, jpeg or png image");
        }
        if self.bytes.len() > AVATAR_MAX_BYTES {
            errors.push(
                "avatar",
                format!("avatar must be at most {AVATAR_MAX_BYTES} bytes"),
            );
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}
