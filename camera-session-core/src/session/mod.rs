pub mod callbacks;
pub mod controller;
