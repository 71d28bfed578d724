use serde::{Deserialize, Serialize};

/// A user row as stored, password hash included. Never serialized.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub display_name: Option<String>,
    pub profile_image_url: Option<String>,
    pub created_at: i64,
    pub last_login: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

/// What the owner sees about themselves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub username: String,
    pub email: String,
    pub display_name: Option<String>,
    pub profile_image_url: Option<String>,
    pub created_at: i64,
    pub last_login: Option<i64>,
}

/// What other users see. No email.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicProfile {
    pub id: String,
    pub username: String,
    pub display_name: Option<String>,
    pub profile_image_url: Option<String>,
    pub created_at: i64,
}

/// Fields left as `None` are not touched. An empty string clears the field.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub display_name: Option<String>,
    pub profile_image_url: Option<String>,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        UserProfile {
            id: user.id,
            username: user.username,
            email: user.email,
            display_name: user.display_name,
            profile_image_url: user.profile_image_url,
            created_at: user.created_at,
            last_login: user.last_login,
        }
    }
}

impl From<User> for PublicProfile {
    fn from(user: User) -> Self {
        PublicProfile {
            id: user.id,
            username: user.username,
            display_name: user.display_name,
            profile_image_url: user.profile_image_url,
            created_at: user.created_at,
        }
    }
}
