pub mod api_client;
pub mod credentials;
pub mod presentation;
pub mod session;
