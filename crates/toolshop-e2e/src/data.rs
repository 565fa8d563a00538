//! User records and random test data.

use fake::faker::address::en::{
    BuildingNumber, CityName, CountryCode, PostCode, StateName, StreetName,
};
use fake::faker::internet::en::Password;
use fake::faker::name::en::{FirstName, LastName};
use fake::Fake;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Appended to every generated password so it always carries an upper-case
/// letter, a lower-case letter, a digit and a special character.
pub const PASSWORD_SUFFIX: &str = "A1!xZ";

/// Date of birth given to generated users (the backend requires an adult)
pub const DEFAULT_DATE_OF_BIRTH: &str = "1990-01-01";

/// Phone number given to generated users
pub const DEFAULT_PHONE: &str = "5555555555";

/// Postal address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    /// Street and number
    pub street: String,
    /// City
    pub city: String,
    /// State / province
    pub state: String,
    /// ISO 3166 alpha-2 country code
    pub country: String,
    /// Postal code
    pub postal_code: String,
}

/// A customer account as the backend's registration endpoint expects it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Given name
    pub first_name: String,
    /// Family name
    pub last_name: String,
    /// Unique email address
    pub email: String,
    /// Password meeting the backend complexity policy
    pub password: String,
    /// Date of birth, `YYYY-MM-DD`
    #[serde(rename = "dob")]
    pub date_of_birth: String,
    /// Phone number
    pub phone: String,
    /// Home address
    pub address: Address,
}

impl User {
    /// Generate a fresh user with a unique email
    #[must_use]
    pub fn random() -> Self {
        let first_name: String = FirstName().fake();
        let last_name: String = LastName().fake();
        let email = unique_email(&first_name, &last_name);
        let building: String = BuildingNumber().fake();
        let street: String = StreetName().fake();
        Self {
            email,
            password: strong_password(),
            date_of_birth: DEFAULT_DATE_OF_BIRTH.to_string(),
            phone: DEFAULT_PHONE.to_string(),
            address: Address {
                street: format!("{building} {street}"),
                city: CityName().fake(),
                state: StateName().fake(),
                country: CountryCode().fake(),
                postal_code: PostCode().fake(),
            },
            first_name,
            last_name,
        }
    }
}

/// `first.last.<uuid>@example.com`, reduced to lowercase ASCII alphanumerics
#[must_use]
pub fn unique_email(first_name: &str, last_name: &str) -> String {
    format!(
        "{}.{}.{}@example.com",
        local_part(first_name),
        local_part(last_name),
        Uuid::new_v4().simple()
    )
}

fn local_part(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect();
    if cleaned.is_empty() {
        "user".to_string()
    } else {
        cleaned
    }
}

/// Random password of 17-20 characters that satisfies the complexity policy
#[must_use]
pub fn strong_password() -> String {
    let base: String = Password(12..16).fake();
    format!("{base}{PASSWORD_SUFFIX}")
}

/// Whether `password` satisfies the backend policy
#[must_use]
pub fn meets_password_policy(password: &str) -> bool {
    password.chars().count() >= 8
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(|c| !c.is_alphanumeric())
}
