pub mod merchant_reader;
