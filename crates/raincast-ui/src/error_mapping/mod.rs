//! Maps UI service errors to raincast_core::AppError for consistent user-facing messages.

mod forecast;
