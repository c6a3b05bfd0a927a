pub mod cache_control;
pub mod config;
pub mod cookie;
pub mod digest;
pub mod error;
pub mod gateway;
pub mod identity;
pub mod logger;
pub mod recipe;
pub mod routes;
pub mod server;
pub mod store;
pub mod theme;
pub mod utils;

pub use config::Config;
pub use error::{AppError, Result};

pub mod prelude {
    pub use crate::cache_control::{CacheDirective, DirectiveProfiles};
    pub use crate::gateway::{Outcome, RevalidationGateway};
    pub use crate::identity::{IdentityResolver, SessionCookieResolver};
    pub use crate::recipe::{Ingredient, Recipe};
    pub use crate::server::{AppState, RecipeServer};
    pub use crate::store::{InMemoryRecipeStore, RecipeStore};
}
