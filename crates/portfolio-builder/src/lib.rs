mod builder;
mod query;
mod sizing;

pub use builder::PortfolioBuilder;
pub use query::{query_portfolio, PortfolioError, PortfolioParams};
pub use sizing::{holding_count, rank_weights, truncate_weights};
