mod auth_service;
mod cart_service;
mod favorites_service;
mod profile_service;
mod promocode_service;
mod resource;

pub use auth_service::*;
pub use cart_service::*;
pub use favorites_service::*;
pub use profile_service::*;
pub use promocode_service::*;
pub use resource::*;
