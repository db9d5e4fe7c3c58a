pub mod interaction;
pub mod movie;
pub mod pagination;
pub mod recommendation;
pub mod user;

pub use interaction::{Interaction, InteractionKey, RatingSummary, Score};
pub use movie::{Movie, NewMovie, RatedMovie};
pub use pagination::{Collection, Page, PageParams, PageRequest};
pub use recommendation::{NewRecommendation, Recommendation};
pub use user::{CreateUserRequest, NewUser, UpdateUserRequest, User, UserChanges};

/// Prefix under which every resource link is rooted
pub const API_PREFIX: &str = "/api";
