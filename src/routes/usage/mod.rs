mod handler;
mod model;

pub use handler::{throttle, usage_status, welcome};
pub use model::{ThrottleResponse, WelcomeResponse};
