pub mod checkpoints;
pub mod replay;
pub mod resume;
pub mod run;
