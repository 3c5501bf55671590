pub mod details;
pub mod footer;
pub mod format;
pub mod header;
pub mod help_overlay;
pub mod output_log;

pub use details::render_details;
pub use footer::render_footer;
pub use header::render_header;
pub use help_overlay::render_help_overlay;
pub use output_log::render_output_log;
