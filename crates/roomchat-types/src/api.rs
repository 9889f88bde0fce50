use serde::{Deserialize, Serialize};

use crate::models::UserId;

// -- Auth --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub user_id: UserId,
}
