//! Registration pipeline
//!
//! validate → register → [upload avatar → update profile] → navigate
//!
//! Steps run in order and stop at the first failure. Nothing is rolled back:
//! an account created before a failed upload stays created and signed in.

use std::fmt;

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::dispatcher::AuthDispatcher;
use crate::error::Error;
use crate::models::{AppRoute, CreateUserDto, UpdateUserDto, User};
use crate::validation::{AvatarFile, RegisterForm};

/// Receives route changes decided by the auth flow.
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: AppRoute);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationStep {
    Validate,
    Register,
    UploadAvatar,
    UpdateUser,
}

impl fmt::Display for RegistrationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RegistrationStep::Validate => "validation",
            RegistrationStep::Register => "registration",
            RegistrationStep::UploadAvatar => "avatar upload",
            RegistrationStep::UpdateUser => "profile update",
        })
    }
}

/// Failure of one pipeline step.
#[derive(Debug, thiserror::Error)]
#[error("registration failed at {step}: {source}")]
pub struct RegistrationError {
    pub step: RegistrationStep,
    pub source: Error,
}

trait AtStep<T> {
    fn at(self, step: RegistrationStep) -> Result<T, RegistrationError>;
}

impl<T, E: Into<Error>> AtStep<T> for Result<T, E> {
    fn at(self, step: RegistrationStep) -> Result<T, RegistrationError> {
        self.map_err(|e| RegistrationError {
            step,
            source: e.into(),
        })
    }
}

/// Register a new account and continue to the questionnaire for its role.
///
/// Navigation happens only after every step succeeded.
pub async fn register_user(
    dispatcher: &AuthDispatcher,
    navigator: &dyn Navigator,
    form: &RegisterForm,
    avatar: Option<&AvatarFile>,
    today: NaiveDate,
) -> Result<User, RegistrationError> {
    let dto = validate(form, avatar, today).at(RegistrationStep::Validate)?;

    let mut user = dispatcher
        .register(&dto)
        .await
        .at(RegistrationStep::Register)?;
    info!(user_id = user.id, role = %user.role, "account registered");

    if let Some(avatar) = avatar {
        let uploaded = dispatcher
            .upload_avatar(avatar)
            .await
            .at(RegistrationStep::UploadAvatar)?;
        user = dispatcher
            .update_user(&UpdateUserDto::avatar(uploaded.path))
            .await
            .at(RegistrationStep::UpdateUser)?;
    }

    let route = AppRoute::questionnaire_for(user.role);
    info!(route = %route, "registration complete");
    navigator.navigate(route);
    Ok(user)
}

fn validate(
    form: &RegisterForm,
    avatar: Option<&AvatarFile>,
    today: NaiveDate,
) -> Result<CreateUserDto, Error> {
    let form_result = form.validate(today);
    let avatar_result = avatar.map(AvatarFile::validate).unwrap_or(Ok(()));

    match (form_result, avatar_result) {
        (Ok(dto), Ok(())) => Ok(dto),
        (Ok(_), Err(errors)) | (Err(errors), Ok(())) => {
            warn!(%errors, "registration form rejected");
            Err(Error::Validation(errors))
        }
        (Err(mut errors), Err(avatar_errors)) => {
            errors.merge(avatar_errors);
            warn!(%errors, "registration form rejected");
            Err(Error::Validation(errors))
        }
    }
}
