pub mod controller;
pub mod filter;
pub mod loader;
pub mod model;
pub mod output;
pub mod scale;
pub mod traffic;
