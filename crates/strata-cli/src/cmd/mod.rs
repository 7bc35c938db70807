pub mod accounts;
pub mod resolve;
pub mod run;
pub mod validate;
