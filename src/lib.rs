pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod integrations;
pub mod models;
pub mod notify;
pub mod proxy;
pub mod stores;

pub use config::Config;
pub use domain::DomainError;
pub use infrastructure::state::App;
pub use notify::{Notice, NoticeKind};
