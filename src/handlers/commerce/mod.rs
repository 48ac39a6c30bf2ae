/// Commerce HTTP handlers
pub mod carts;

pub use carts::cart_routes;
