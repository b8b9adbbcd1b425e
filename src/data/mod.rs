/// Data layer: core types, loading, and filtering.
///
/// Architecture:
/// ```text
///  prescription .txt / .csv
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  decode + parse → Vec<Surface>
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  model    │  Surface pose (coords + tilt rotation vector)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  include / format predicates for writing
///   └──────────┘
/// ```
pub mod filter;
pub mod loader;
pub mod model;
