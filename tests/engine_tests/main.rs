//! Engine and database test suite


mod database_tests;
mod model_tests;
