pub mod account;
pub mod audit;
pub mod credential;
pub mod order;
