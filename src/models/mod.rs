pub mod book;
pub mod favorite;
pub mod track;
pub mod user;

pub use book::{Book, VolumeInfo, VolumePage};
pub use favorite::{BookSnapshot, FavoriteRecord};
pub use track::Track;
pub use user::User;
