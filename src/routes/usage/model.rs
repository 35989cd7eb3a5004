use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct WelcomeResponse {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ThrottleResponse {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
}
