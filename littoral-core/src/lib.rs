pub mod forcing;
pub mod kinetics;
pub mod mesh;
pub mod pool;
pub mod utils;

pub mod errors;
