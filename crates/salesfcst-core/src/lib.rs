//! Core library for sales demand forecasting.
//!
//! This crate loads historical sales records, builds daily demand series and
//! calendar/lag features, runs five forecasting models behind a common
//! interface, compares their accuracy and derives rule-based insights.

pub mod artifacts;
pub mod cache;
pub mod compare;
pub mod error;
pub mod features;
pub mod forecast;
pub mod imputation;
pub mod metrics;
pub mod models;
pub mod recommend;
pub mod records;
pub mod regression;
pub mod rollout;
pub mod series;
pub mod stats;
pub mod swot;

// Re-exports for convenience
pub use artifacts::{Artifact, ArtifactStatus, ModelStore, TrainReport};
pub use cache::DatasetCache;
pub use compare::{compare, compare_parallel, ComparisonRow, ComparisonTable};
pub use error::{ForecastError, Result};
pub use features::{
    build_features, training_rows, CalendarFeatures, FeatureColumn, FeatureRow, FeatureSchema,
};
pub use forecast::{
    list_models, ForecastContext, ForecastPoint, ForecastRun, ForecastSeries, Forecaster,
    ModelKind, TrainSettings, EXPORT_HEADER,
};
pub use imputation::{fill_forward, fill_forward_text};
pub use metrics::{evaluate, mae, mse, rmse, ErrorSummary};
pub use recommend::{recommendations, RecommendationStats};
pub use records::{SalesDataset, SalesRecord};
pub use regression::LinearModel;
pub use rollout::{recursive_forecast, LagState, Rollout, RowModel};
pub use series::DailySeries;
pub use stats::{
    promotion_impact, seasonal_demand, units_sold_by_category, units_sold_by_product,
    units_sold_by_region, PromotionImpact, SalesSummary, Season,
};
pub use swot::{swot_analysis, SwotReport, SwotSection, SwotStats};
