pub mod browser;
pub mod checker;
pub mod error;
pub mod probe;
pub mod token;
pub mod tv;
pub mod validate;

pub use checker::Checker;
pub use error::SessionError;
pub use token::{token_link, GraphqlTokenMinter};
pub use tv::{submit_tv_code, TvCodeReport};
pub use validate::SessionValidator;
