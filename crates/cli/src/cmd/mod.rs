mod build;
mod cache_path;
mod checksum;
mod graph;
mod run;
mod show;

pub use build::cmd_build;
pub use cache_path::cmd_cache_path;
pub use checksum::cmd_checksum;
pub use graph::cmd_graph;
pub use run::cmd_run;
pub use show::cmd_show;
