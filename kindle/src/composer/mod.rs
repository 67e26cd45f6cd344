mod factory;
pub mod pipeline;

pub use self::factory::PipelineFactory;
pub use self::pipeline::Pipeline;
