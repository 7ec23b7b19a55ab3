//! Auth actions over the API client
//!
//! Each action runs as pending → fulfilled | rejected and updates the shared
//! `UserSlice`. A rejected action leaves the slice signed out when the
//! session no longer holds tokens, e.g. after the interceptor dropped them.

use std::future::Future;
use std::sync::Arc;

use common::Secret;
use fitfriends_auth::{
    CHECK_PATH, LOGIN_PATH, LOGOUT_PATH, REGISTER_PATH, UPDATE_USER_PATH, UPLOAD_AVATAR_PATH,
};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::client::ApiClient;
use crate::error::Result;
use crate::models::{CreateUserDto, LoggedUser, LoginDto, UpdateUserDto, UploadedFile, User};
use crate::state::{ActionKind, UserSlice};
use crate::validation::AvatarFile;

pub struct AuthDispatcher {
    client: Arc<ApiClient>,
    state: RwLock<UserSlice>,
}

impl AuthDispatcher {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self {
            client,
            state: RwLock::new(UserSlice::default()),
        }
    }

    pub fn client(&self) -> &Arc<ApiClient> {
        &self.client
    }

    /// Copy of the current slice.
    pub async fn snapshot(&self) -> UserSlice {
        self.state.read().await.clone()
    }

    /// Create an account and sign in with the returned tokens.
    pub async fn register(&self, dto: &CreateUserDto) -> Result<User> {
        let logged = self
            .run(
                ActionKind::Register,
                async {
                    let logged: LoggedUser = self.client.post_json(REGISTER_PATH, dto).await?;
                    self.sign_in(&logged).await?;
                    Ok(logged)
                },
                |slice, logged| slice.signed_in(logged.user.clone()),
            )
            .await?;
        Ok(logged.user)
    }

    pub async fn login(&self, email: &str, password: Secret<String>) -> Result<User> {
        let dto = LoginDto {
            email: email.to_owned(),
            password,
        };
        let logged = self
            .run(
                ActionKind::Login,
                async {
                    let logged: LoggedUser = self.client.post_json(LOGIN_PATH, &dto).await?;
                    self.sign_in(&logged).await?;
                    Ok(logged)
                },
                |slice, logged| slice.signed_in(logged.user.clone()),
            )
            .await?;
        Ok(logged.user)
    }

    /// Ask the server who the current token belongs to.
    pub async fn check(&self) -> Result<User> {
        let result = self
            .run(
                ActionKind::Check,
                self.client.get_json::<User>(CHECK_PATH),
                |slice, user| slice.signed_in(user.clone()),
            )
            .await;
        if result.is_err() {
            // A failed check means the server does not accept this session.
            self.state.write().await.signed_out();
        }
        result
    }

    pub async fn update_user(&self, dto: &UpdateUserDto) -> Result<User> {
        self.run(
            ActionKind::UpdateUser,
            self.client.patch_json::<_, User>(UPDATE_USER_PATH, dto),
            |slice, user| slice.user = Some(user.clone()),
        )
        .await
    }

    pub async fn upload_avatar(&self, file: &AvatarFile) -> Result<UploadedFile> {
        self.run(
            ActionKind::UploadAvatar,
            self.client.upload::<UploadedFile>(UPLOAD_AVATAR_PATH, file),
            |_, _| {},
        )
        .await
    }

    /// End the session. Local tokens are dropped even when the server call fails.
    pub async fn logout(&self) -> Result<()> {
        self.run(
            ActionKind::Logout,
            async {
                let server = self.client.post_empty(LOGOUT_PATH).await;
                self.client.session().sign_out().await?;
                server
            },
            |slice, _| slice.signed_out(),
        )
        .await
    }

    /// Start-up check: run `check` once when an access token is stored.
    ///
    /// Without a token the slice is marked signed out and no request is made.
    pub async fn restore_session(&self) -> Result<Option<User>> {
        if self.client.session().store().access().await.is_none() {
            debug!("no stored access token, skipping session check");
            self.state.write().await.signed_out();
            return Ok(None);
        }
        self.check().await.map(Some)
    }

    async fn sign_in(&self, logged: &LoggedUser) -> Result<()> {
        self.client
            .session()
            .sign_in(logged.access_token.clone(), logged.refresh_token.clone())
            .await?;
        Ok(())
    }

    async fn run<T>(
        &self,
        kind: ActionKind,
        action: impl Future<Output = Result<T>>,
        apply: impl FnOnce(&mut UserSlice, &T),
    ) -> Result<T> {
        self.state.write().await.pending(kind);
        debug!(action = %kind, "action pending");

        match action.await {
            Ok(value) => {
                let mut slice = self.state.write().await;
                apply(&mut slice, &value);
                slice.fulfilled(kind);
                info!(action = %kind, "action fulfilled");
                Ok(value)
            }
            Err(e) => {
                let has_tokens = self.client.session().is_authenticated().await;
                let mut slice = self.state.write().await;
                slice.rejected(kind, e.to_string());
                if !has_tokens {
                    slice.signed_out();
                }
                warn!(action = %kind, error = %e, "action rejected");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::models::UserRole;
    use crate::state::{AuthStatus, SliceStatus};
    use crate::test_support::{MockApi, MockOptions, test_client, token_expiring_in};
    use std::sync::atomic::Ordering;

    fn dispatcher(api: &MockApi) -> AuthDispatcher {
        AuthDispatcher::new(Arc::new(test_client(api)))
    }

    #[tokio::test]
    async fn login_saves_tokens_and_signs_in() {
        let api = MockApi::start(MockOptions::default()).await;
        let dispatcher = dispatcher(&api);

        let user = dispatcher
            .login("anna@fit.ru", Secret::from("secret1"))
            .await
            .unwrap();

        assert_eq!(user.email, "anna@fit.ru");
        assert!(dispatcher.client().session().store().pair().await.is_some());
        let slice = dispatcher.snapshot().await;
        assert_eq!(slice.auth_status, AuthStatus::Auth);
        assert_eq!(slice.status(ActionKind::Login), SliceStatus::Fulfilled);
        assert_eq!(slice.user, Some(user));
    }

    #[tokio::test]
    async fn rejected_login_records_error_and_signs_out() {
        let api = MockApi::start(MockOptions {
            login_status: 401,
            ..Default::default()
        })
        .await;
        let dispatcher = dispatcher(&api);

        let err = dispatcher
            .login("anna@fit.ru", Secret::from("wrong1"))
            .await
            .unwrap_err();

        assert!(err.is_unauthorized());
        let slice = dispatcher.snapshot().await;
        assert_eq!(slice.status(ActionKind::Login), SliceStatus::Rejected);
        assert_eq!(slice.auth_status, AuthStatus::NoAuth);
        assert!(slice.last_error.unwrap().contains("401"));
    }

    #[tokio::test]
    async fn restore_session_without_token_skips_check() {
        let api = MockApi::start(MockOptions::default()).await;
        let dispatcher = dispatcher(&api);

        assert_eq!(dispatcher.restore_session().await.unwrap(), None);
        assert_eq!(api.state.check_calls.load(Ordering::SeqCst), 0);
        assert_eq!(dispatcher.snapshot().await.auth_status, AuthStatus::NoAuth);
    }

    #[tokio::test]
    async fn restore_session_with_token_checks_once() {
        let api = MockApi::start(MockOptions::default()).await;
        let dispatcher = dispatcher(&api);
        dispatcher
            .client()
            .session()
            .sign_in(token_expiring_in(3600), token_expiring_in(7200))
            .await
            .unwrap();

        let user = dispatcher.restore_session().await.unwrap().unwrap();

        assert_eq!(user.id, 1);
        assert_eq!(api.state.check_calls.load(Ordering::SeqCst), 1);
        let slice = dispatcher.snapshot().await;
        assert_eq!(slice.auth_status, AuthStatus::Auth);
        assert_eq!(slice.status(ActionKind::Check), SliceStatus::Fulfilled);
    }

    #[tokio::test]
    async fn rejected_refresh_leaves_slice_signed_out() {
        let api = MockApi::start(MockOptions {
            refresh_status: 401,
            ..Default::default()
        })
        .await;
        let dispatcher = dispatcher(&api);
        dispatcher
            .client()
            .session()
            .sign_in(token_expiring_in(-5), token_expiring_in(3600))
            .await
            .unwrap();

        let err = dispatcher.check().await.unwrap_err();

        assert!(err.is_unauthorized(), "got: {err:?}");
        assert!(!dispatcher.client().session().is_authenticated().await);
        assert_eq!(dispatcher.snapshot().await.auth_status, AuthStatus::NoAuth);
    }

    #[tokio::test]
    async fn logout_drops_tokens_even_when_server_fails() {
        let api = MockApi::start(MockOptions {
            logout_status: 500,
            ..Default::default()
        })
        .await;
        let dispatcher = dispatcher(&api);
        dispatcher
            .login("anna@fit.ru", Secret::from("secret1"))
            .await
            .unwrap();

        let err = dispatcher.logout().await.unwrap_err();

        assert!(matches!(err, Error::Status { status: 500, .. }));
        assert_eq!(api.state.logout_calls.load(Ordering::SeqCst), 1);
        assert!(!dispatcher.client().session().is_authenticated().await);
        let slice = dispatcher.snapshot().await;
        assert_eq!(slice.auth_status, AuthStatus::NoAuth);
        assert_eq!(slice.status(ActionKind::Logout), SliceStatus::Rejected);
    }

    #[tokio::test]
    async fn logout_clears_user() {
        let api = MockApi::start(MockOptions::default()).await;
        let dispatcher = dispatcher(&api);
        dispatcher
            .login("anna@fit.ru", Secret::from("secret1"))
            .await
            .unwrap();

        dispatcher.logout().await.unwrap();

        let slice = dispatcher.snapshot().await;
        assert!(slice.user.is_none());
        assert_eq!(slice.auth_status, AuthStatus::NoAuth);
    }

    #[tokio::test]
    async fn update_user_replaces_user() {
        let api = MockApi::start(MockOptions::default()).await;
        let dispatcher = dispatcher(&api);
        dispatcher
            .login("anna@fit.ru", Secret::from("secret1"))
            .await
            .unwrap();

        let user = dispatcher
            .update_user(&UpdateUserDto::avatar("/upload/me.png"))
            .await
            .unwrap();

        assert_eq!(user.avatar.as_deref(), Some("/upload/me.png"));
        assert_eq!(user.role, UserRole::Client);
        assert_eq!(
            api.state.update_body.lock().unwrap().clone().unwrap(),
            serde_json::json!({"avatar": "/upload/me.png"})
        );
        let slice = dispatcher.snapshot().await;
        assert_eq!(slice.user.unwrap().avatar.as_deref(), Some("/upload/me.png"));
        assert_eq!(slice.auth_status, AuthStatus::Auth);
    }

    #[tokio::test]
    async fn upload_failure_keeps_session() {
        let api = MockApi::start(MockOptions {
            upload_status: 413,
            ..Default::default()
        })
        .await;
        let dispatcher = dispatcher(&api);
        dispatcher
            .login("anna@fit.ru", Secret::from("secret1"))
            .await
            .unwrap();

        let err = dispatcher
            .upload_avatar(&AvatarFile::new("me.png", vec![0; 8]))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Status { status: 413, .. }));
        let slice = dispatcher.snapshot().await;
        assert_eq!(slice.status(ActionKind::UploadAvatar), SliceStatus::Rejected);
        assert_eq!(slice.auth_status, AuthStatus::Auth);
    }
}
