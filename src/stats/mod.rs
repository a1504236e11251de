/// Statistics used by the cleaning, reporting and comparison stages.
pub mod descriptive;
pub mod kruskal;
pub mod normality;

pub use descriptive::{describe, median, zscores, Describe};
pub use kruskal::{kruskal_wallis, KruskalWallis};
pub use normality::{shapiro_wilk, ShapiroWilk};
