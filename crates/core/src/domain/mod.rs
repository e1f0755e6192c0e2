pub mod product;
pub mod watchlist;
