pub mod config;
pub mod device;
pub mod sample_sheet;
pub mod utils;

pub use config::PipelineConfig;
pub use sample_sheet::SampleSheet;
