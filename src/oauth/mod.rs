/// Provider OAuth: token lifecycle and account linking
pub mod handshake;
pub mod tokens;

pub use handshake::{HandshakeCoordinator, LinkDecision};
pub use tokens::TokenManager;
