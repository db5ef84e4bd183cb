mod allocator;
mod builder;

pub use allocator::Allocator;
pub use builder::RecommendationBuilder;
