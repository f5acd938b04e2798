extern crate vulkano;

pub mod debug;
pub mod error;
pub mod frame;
pub mod gpu;
pub mod input;
pub mod logging;
pub mod model;
pub mod options;
pub mod platform;
pub mod renderer;
pub mod scene;
pub mod shutdown;
pub mod state;
pub mod world;
