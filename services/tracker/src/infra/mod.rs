pub mod challenge;
pub mod cipher;
pub mod db;
pub mod provider;
