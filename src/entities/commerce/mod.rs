/// Commerce entities module
pub mod cart_item;
pub mod product;
pub mod product_weight;
pub mod weight_option;

// Re-export entities
pub use cart_item::{Entity as CartItem, Model as CartItemModel, OrderType};
pub use product::{Entity as Product, Model as ProductModel};
pub use product_weight::{Entity as ProductWeight, Model as ProductWeightModel};
pub use weight_option::{Entity as WeightOption, Model as WeightOptionModel};
