//! Built-in block sections. Each registers compile functions for one
//! palette category and the natives those compile functions call.

mod control;
mod data;
mod events;
mod looks;
mod motion;
mod operators;
mod procedures;
mod sensing;

pub use control::ControlBlocks;
pub use data::DataBlocks;
pub use events::EventBlocks;
pub use looks::LooksBlocks;
pub use motion::MotionBlocks;
pub use operators::OperatorBlocks;
pub use procedures::ProcedureBlocks;
pub use sensing::SensingBlocks;

use crate::registry::BlockSection;

pub fn default_sections() -> Vec<Box<dyn BlockSection>> {
    vec![
        Box::new(ControlBlocks),
        Box::new(EventBlocks),
        Box::new(LooksBlocks),
        Box::new(MotionBlocks),
        Box::new(OperatorBlocks),
        Box::new(SensingBlocks),
        Box::new(DataBlocks),
        Box::new(ProcedureBlocks),
    ]
}
