/// Data layer: core types, loading, writing, and filtering.
///
/// Architecture:
/// ```text
///  .csv / .parquet / .json
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  decode (UTF-8, Latin-1 fallback) → Dataset, sorted by time
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  Dataset  │  Vec<Column>, one Value per row
///   └──────────┘
///        │
///        ├──────────────► filter   date-range predicate → row indices
///        ▼
///   ┌──────────┐
///   │  writer   │  Dataset → .csv / .parquet, Table → .csv, manifests → .json
///   └──────────┘
/// ```

pub mod filter;
pub mod loader;
pub mod model;
pub mod table;
pub mod writer;
