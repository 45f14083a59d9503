mod auth_repo_mysql;
mod cart_repo_mysql;
mod catalog_repo_mysql;
mod favorites_repo_mysql;
mod profile_repo_mysql;
mod promocode_repo_mysql;
mod user_repo_mysql;
mod util;

pub use auth_repo_mysql::*;
pub use cart_repo_mysql::*;
pub use catalog_repo_mysql::*;
pub use favorites_repo_mysql::*;
pub use profile_repo_mysql::*;
pub use promocode_repo_mysql::*;
pub use user_repo_mysql::*;
pub use util::*;
