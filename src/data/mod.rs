/// Data layer: typed datasets, materialization, filtering, and aggregation.
///
/// Architecture:
/// ```text
///   seed ──► generator        students.db / sales_data.db
///                │                     │
///                ▼                     ▼
///          ┌─────────────────────────────────┐
///          │  loader   materialize → Dataset │◄── cache (seed / table revision)
///          └─────────────────────────────────┘
///                │
///                ▼
///          ┌──────────┐
///          │  filter   │  membership / range constraints → row subset
///          └──────────┘
///                │
///                ▼
///          ┌───────────┐
///          │ aggregate  │  group mean/sum/count, correlation, describe
///          └───────────┘
///                │
///                ▼
///           chart / ui  (plus export of the filtered rows)
/// ```

pub mod aggregate;
pub mod cache;
pub mod export;
pub mod filter;
pub mod loader;
pub mod model;
pub mod pipeline;
pub mod rng;
