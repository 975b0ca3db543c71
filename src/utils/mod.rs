pub mod db_utils;
pub mod email;
pub mod email_cache;
pub mod email_filter;
pub mod geocode;
