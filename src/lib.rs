pub mod addr;
pub mod client;
pub mod config;
pub mod crypto;
pub mod datasources;
pub mod diag;
pub mod error;
pub mod github_ext;
pub mod op;
pub mod provider;
pub mod resource;
pub mod resources;
pub mod schema;
pub mod server;
pub mod util;

pub use provider::GitHubProvider;
