pub mod account;
pub mod turn;
