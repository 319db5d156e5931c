//! Plain-text views of a trained hierarchy: policy arrows per free cell,
//! marked paths and ASCII plots of training metrics.

pub mod policy;
pub mod text_plots;

pub use policy::{render_path, render_policy};
pub use text_plots::{metrics_summary, plot_q_deltas, plot_reward_history, plot_series};
