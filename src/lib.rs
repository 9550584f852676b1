// src/lib.rs

//! jobwatch Library

pub mod error;
#[cfg(feature = "lambda")]
pub mod lambda;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod testing;
pub mod utils;
