pub mod image;
pub mod request;
pub mod settings;

pub use self::image::*;
pub use self::request::*;
pub use self::settings::*;
