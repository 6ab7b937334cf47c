pub mod branches;
pub mod build;
pub mod cache;
pub mod configs;
pub mod deploy;
pub mod download;
pub mod env;
pub mod rate_limit;
pub mod reset;
pub mod select;
pub mod status;
pub mod step;

pub use branches::*;
pub use build::*;
pub use cache::*;
pub use configs::*;
pub use deploy::*;
pub use download::*;
pub use env::*;
pub use rate_limit::*;
pub use reset::*;
pub use select::*;
pub use status::*;
pub use step::*;
