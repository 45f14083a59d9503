mod auth_service_fake;
mod auth_service_impl;
mod cart_service_impl;
mod favorites_service_impl;
mod profile_service_impl;
mod promocode_service_impl;

pub use auth_service_fake::*;
pub use auth_service_impl::*;
pub use cart_service_impl::*;
pub use favorites_service_impl::*;
pub use profile_service_impl::*;
pub use promocode_service_impl::*;
