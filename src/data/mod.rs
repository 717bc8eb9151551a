//! Data layer: core types, loading, and the filter → aggregate pipeline.
//!
//! Architecture:
//! ```text
//!  remote .csv / local .csv .json .parquet
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  loader   │  fetch once → Dataset
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  session  │  owns the Dataset, validates columns, dispatches Requests
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐    ┌───────────┐    ┌───────┐
//!   │  filter   │ →  │ aggregate  │ →  │ top-n │
//!   └──────────┘    └───────────┘    └───────┘
//!        │
//!        ├── stats       describe / histogram / box / correlation
//!        └── regression  OLS yield predictor
//! ```

pub mod aggregate;
pub mod error;
pub mod filter;
pub mod loader;
pub mod model;
pub mod regression;
pub mod request;
pub mod session;
pub mod stats;
