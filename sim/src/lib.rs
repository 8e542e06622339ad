//! `sim`: synthetic video sequences with ground truth, plus replay logs.

pub mod render;
pub mod replay;
pub mod scenes;
pub mod target;

pub use render::{FrameRenderer, RenderParams};
pub use replay::{load_log, save_log, FrameRecord, SequenceLog};
pub use scenes::{Scene, SceneKind};
pub use target::{MotionSpec, Target};
