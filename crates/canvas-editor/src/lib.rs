pub mod apply;
pub mod commands;
pub mod config;
pub mod engine;
pub mod history;
pub mod hit;
pub mod input;
pub mod overlay;
pub mod session;
pub mod shortcuts;
pub mod snapping;
pub mod strategies;

pub use apply::{ApplyResult, CommandDiagnostic, CommandPhase, apply_commands};
pub use commands::{CanvasCommand, CommandError, WhenToRun};
pub use config::CanvasConfig;
pub use engine::{CanvasEngine, EditorState};
pub use history::History;
pub use input::{InputEvent, Modifiers};
pub use overlay::{CanvasOverlay, CursorStyle, IntendedBounds};
pub use session::{ActiveControl, EdgePosition, InteractionSession};
pub use snapping::{Guideline, GuidelineWithSnappingVector};
pub use strategies::{
    CanvasStrategy, CanvasStrategyId, REGISTERED_CANVAS_STRATEGIES, StrategyError, StrategyState, find_canvas_strategy,
};
