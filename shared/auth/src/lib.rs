pub mod jwt;
pub mod password;
pub mod otp;
pub mod middleware;

pub use jwt::*;
pub use password::*;
pub use otp::*;
pub use middleware::{AccountStanding, AdminCaller, Caller};
