pub mod comments;
pub mod feed;
pub mod gateway;
pub mod models;
pub mod video;
