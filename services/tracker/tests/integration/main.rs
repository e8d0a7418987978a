
mod db_test;
mod otp_test;
mod session_test;
