//! Service layer: relay connection manager, upstream task, login client.

pub mod login_client;
pub mod relay_service;
pub mod upstream;

pub use login_client::LoginClient;
pub use relay_service::RelayService;
