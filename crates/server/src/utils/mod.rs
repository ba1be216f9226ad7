mod shutdown_signal;
mod state;

pub use shutdown_signal::shutdown_signal;
pub use state::AppState;
