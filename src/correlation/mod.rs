pub mod cidp;
pub mod idfa;
pub mod relations;
pub mod risk;
