pub mod location;
pub mod otp;
pub mod session;
