pub mod client;
pub mod flows;
