pub mod apikeys;
pub mod auth;
pub mod metrics;
pub mod proxy;
pub mod secrets;
