pub mod context;
pub mod eval;
pub mod ordering;
pub mod picker;
pub mod search;
pub mod tt;
