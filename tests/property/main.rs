// tests/property/main.rs

mod filter;
mod scheduler;
