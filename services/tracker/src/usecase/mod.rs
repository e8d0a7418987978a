pub mod credential;
pub mod location;
pub mod otp;
pub mod session;
pub mod sync;
