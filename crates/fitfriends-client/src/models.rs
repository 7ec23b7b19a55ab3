//! Wire types for the FitFriends REST API
//!
//! Enumerations serialize to the Russian literals the server expects. Each
//! also accepts a latin alias on input (`trainer`, `female`, `sportivnaya`)
//! so command-line users don't need a Cyrillic keyboard.

use std::fmt;

use chrono::NaiveDate;
use common::Secret;
use serde::{Deserialize, Serialize, Serializer};

/// Account role chosen at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UserRole {
    #[serde(rename = "тренер")]
    Trainer,
    #[serde(rename = "пользователь")]
    Client,
}

impl UserRole {
    pub const ALL: [UserRole; 2] = [UserRole::Trainer, UserRole::Client];

    /// Value sent over the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Trainer => "тренер",
            UserRole::Client => "пользователь",
        }
    }

    fn alias(&self) -> &'static str {
        match self {
            UserRole::Trainer => "trainer",
            UserRole::Client => "client",
        }
    }

    /// Parse a wire value or latin alias.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|r| r.as_str() == value || r.alias() == value)
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    #[serde(rename = "мужской")]
    Male,
    #[serde(rename = "женский")]
    Female,
    #[serde(rename = "неважно")]
    Any,
}

impl Gender {
    pub const ALL: [Gender; 3] = [Gender::Male, Gender::Female, Gender::Any];

    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "мужской",
            Gender::Female => "женский",
            Gender::Any => "неважно",
        }
    }

    fn alias(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Any => "any",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|g| g.as_str() == value || g.alias() == value)
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metro station the user trains near.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Location {
    #[serde(rename = "Фрунзенская")]
    Frunzenskaya,
    #[serde(rename = "Якиманка")]
    Yakimanka,
    #[serde(rename = "Кутузовский")]
    Kutuzovsky,
    #[serde(rename = "Партизанская")]
    Partizanskaya,
    #[serde(rename = "Спортивная")]
    Sportivnaya,
}

impl Location {
    pub const ALL: [Location; 5] = [
        Location::Frunzenskaya,
        Location::Yakimanka,
        Location::Kutuzovsky,
        Location::Partizanskaya,
        Location::Sportivnaya,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Location::Frunzenskaya => "Фрунзенская",
            Location::Yakimanka => "Якиманка",
            Location::Kutuzovsky => "Кутузовский",
            Location::Partizanskaya => "Партизанская",
            Location::Sportivnaya => "Спортивная",
        }
    }

    fn alias(&self) -> &'static str {
        match self {
            Location::Frunzenskaya => "frunzenskaya",
            Location::Yakimanka => "yakimanka",
            Location::Kutuzovsky => "kutuzovsky",
            Location::Partizanskaya => "partizanskaya",
            Location::Sportivnaya => "sportivnaya",
        }
    }

    /// Station names are matched exactly; aliases case-insensitively.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        let lower = value.to_lowercase();
        Self::ALL
            .into_iter()
            .find(|l| l.as_str() == value || l.alias() == lower)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User profile as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(alias = "userId")]
    pub id: u64,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
}

/// Login/register response: the user plus a fresh token pair.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggedUser {
    #[serde(flatten)]
    pub user: User,
    pub access_token: String,
    pub refresh_token: String,
}

fn expose_secret<S: Serializer>(secret: &Secret<String>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.as_str())
}

/// Questionnaire defaults sent with a client registration.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientProfile {
    pub time_of_training: String,
    pub calory_losing_plan_total: u32,
    pub calory_losing_plan_daily: u32,
    pub is_ready: bool,
}

/// Questionnaire defaults sent with a trainer registration.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainerProfile {
    pub is_personal_training: bool,
    pub certificate: Vec<String>,
    pub merits: String,
}

/// Body of `POST /auth/register`.
///
/// Exactly one of `client`/`trainer` is set, matching `role`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserDto {
    pub name: String,
    pub email: String,
    pub birth_date: NaiveDate,
    pub location: Location,
    #[serde(serialize_with = "expose_secret")]
    pub password: Secret<String>,
    pub gender: Gender,
    pub role: UserRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client: Option<ClientProfile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trainer: Option<TrainerProfile>,
}

/// Body of `POST /auth/login`.
#[derive(Debug, Clone, Serialize)]
pub struct LoginDto {
    pub email: String,
    #[serde(serialize_with = "expose_secret")]
    pub password: Secret<String>,
}

/// Partial profile update for `PATCH /users/update`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserDto {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
}

impl UpdateUserDto {
    pub fn avatar(path: impl Into<String>) -> Self {
        Self {
            avatar: Some(path.into()),
            ..Default::default()
        }
    }
}

/// Upload endpoint response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UploadedFile {
    pub path: String,
}

/// Client-side routes the auth flow can navigate to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppRoute {
    RegisterClient,
    RegisterTrainer,
}

impl AppRoute {
    pub fn path(&self) -> &'static str {
        match self {
            AppRoute::RegisterClient => "/register-client",
            AppRoute::RegisterTrainer => "/register-trainer",
        }
    }

    /// Questionnaire page a freshly registered user continues to.
    pub fn questionnaire_for(role: UserRole) -> Self {
        match role {
            UserRole::Trainer => AppRoute::RegisterTrainer,
            UserRole::Client => AppRoute::RegisterClient,
        }
    }
}

impl fmt::Display for AppRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enums_accept_wire_values_and_aliases() {
        assert_eq!(UserRole::parse("тренер"), Some(UserRole::Trainer));
        assert_eq!(UserRole::parse("Client"), Some(UserRole::Client));
        assert_eq!(Gender::parse("неважно"), Some(Gender::Any));
        assert_eq!(Gender::parse("female"), Some(Gender::Female));
        assert_eq!(Location::parse("Якиманка"), Some(Location::Yakimanka));
        assert_eq!(Location::parse("Sportivnaya"), Some(Location::Sportivnaya));
        assert_eq!(UserRole::parse("admin"), None);
        assert_eq!(Location::parse("Арбат"), None);
    }

    #[test]
    fn role_serializes_to_wire_value() {
        assert_eq!(
            serde_json::to_string(&UserRole::Client).unwrap(),
            "\"пользователь\""
        );
        let role: UserRole = serde_json::from_str("\"тренер\"").unwrap();
        assert_eq!(role, UserRole::Trainer);
    }

    #[test]
    fn logged_user_flattens_user_and_tokens() {
        let json = r#"{
            "id": 7,
            "name": "Анна",
            "email": "anna@fit.ru",
            "role": "пользователь",
            "access_token": "at",
            "refresh_token": "rt"
        }"#;
        let logged: LoggedUser = serde_json::from_str(json).unwrap();
        assert_eq!(logged.user.id, 7);
        assert_eq!(logged.user.role, UserRole::Client);
        assert!(logged.user.avatar.is_none());
        assert_eq!(logged.access_token, "at");
        assert_eq!(logged.refresh_token, "rt");
    }

    #[test]
    fn user_accepts_user_id_alias() {
        let json = r#"{"userId":3,"name":"N","email":"n@fit.ru","role":"тренер"}"#;
        let user: User = serde_json::from_str(json).unwrap();
        assert_eq!(user.id, 3);
        assert_eq!(user.role, UserRole::Trainer);
    }

    #[test]
    fn create_user_dto_serializes_camel_case_with_client_profile() {
        let dto = CreateUserDto {
            name: "Анна".into(),
            email: "anna@fit.ru".into(),
            birth_date: NaiveDate::from_ymd_opt(1995, 4, 12).unwrap(),
            location: Location::Kutuzovsky,
            password: Secret::from("secret1"),
            gender: Gender::Female,
            role: UserRole::Client,
            client: Some(ClientProfile::default()),
            trainer: None,
        };
        let json = serde_json::to_value(&dto).unwrap();
        assert_eq!(json["birthDate"], "1995-04-12");
        assert_eq!(json["password"], "secret1");
        assert_eq!(json["location"], "Кутузовский");
        assert_eq!(json["client"]["caloryLosingPlanTotal"], 0);
        assert_eq!(json["client"]["isReady"], false);
        assert!(json.get("trainer").is_none());
        assert!(!format!("{dto:?}").contains("secret1"));
    }

    #[test]
    fn update_dto_only_sends_set_fields() {
        let json = serde_json::to_value(UpdateUserDto::avatar("/img/a.png")).unwrap();
        assert_eq!(json, serde_json::json!({"avatar": "/img/a.png"}));
    }

    #[test]
    fn questionnaire_route_follows_role() {
        assert_eq!(
            AppRoute::questionnaire_for(UserRole::Trainer).path(),
            "/register-trainer"
        );
        assert_eq!(
            AppRoute::questionnaire_for(UserRole::Client).path(),
            "/register-client"
        );
    }
}
