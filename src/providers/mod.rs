pub mod openai;
pub mod yahoo_finance;
