mod auth;
mod rate_limit;

pub use auth::{GUEST_TIER, Principal, client_ip, identify, resolve_principal};
pub use rate_limit::{LIMIT_HEADER, REMAINING_HEADER, rate_limit};
