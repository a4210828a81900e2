pub mod capture_loop;
pub mod controller;
pub mod detectors;
pub mod dto;
pub mod ports;
pub mod services;
pub mod sessions;
mod shared;
