mod capture;
mod category;
mod example;
mod manifest;
mod message;

pub use capture::*;
pub use category::*;
pub use example::*;
pub use manifest::*;
pub use message::*;
