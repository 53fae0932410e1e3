//! Identity and session handling: credential lifecycle, token service,
//! transport, and the authentication gate.

pub mod change_password;
pub mod gate;
pub mod login;
pub mod password;
pub mod session;
pub mod signup;
pub(crate) mod storage;
pub mod state;
pub mod tokens;
pub mod transport;
pub mod types;
mod utils;

pub use gate::{auth_gate, Principal};
pub use state::{AuthConfig, AuthState};
