/// Commerce services module - cart and catalog business logic
pub mod cart_service;
pub mod product_catalog_service;

// Re-export services for convenience
pub use cart_service::{
    CartItemRequest, CartLine, CartLineView, CartService, ProductSummary, UpsertCartInput,
    WeightSummary,
};
pub use product_catalog_service::{
    CreateProductInput, CreateWeightOptionInput, ProductCatalogService,
};
