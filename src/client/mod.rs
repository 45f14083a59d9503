mod gateway;
mod session;
mod transport;

pub use gateway::*;
pub use session::*;
pub use transport::*;
