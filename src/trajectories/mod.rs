pub mod itd;
pub mod population;
pub mod traits;
pub mod trajectory;
