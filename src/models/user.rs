use serde::{Deserialize, Serialize};

/// Login record. Kept in plaintext; its presence is the whole session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserData {
    pub username: String,
    pub password: String,
}
