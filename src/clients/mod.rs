pub mod postgrest_client;
pub mod remote;
pub mod session;

pub use postgrest_client::PostgrestClient;
pub use remote::{Authenticator, RemoteStore};
pub use session::TokenSession;
