pub mod budget_vector;
pub mod pure_dp_budget;
