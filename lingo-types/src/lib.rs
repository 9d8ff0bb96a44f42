pub mod enums;
pub mod models;
pub mod normalize;

pub use enums::*;
pub use models::*;
pub use normalize::{absolutize_url, api_origin, UserPatch};
