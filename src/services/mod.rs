//! 业务能力层
//!
//! 纯函数或无 I/O 的状态对象：阶段切分、提示词、医嘱缓存、教学白板。

pub mod board;
pub mod order_cache;
pub mod prompt_builder;
pub mod segmenter;

pub use board::{BoardCategory, BoardItem, BoardState};
pub use order_cache::OrderCache;
pub use prompt_builder::{build_case_prompt, build_debrief_prompt, build_order_prompt, DebriefInput, TopicPicker};
pub use segmenter::{extract_final_diagnosis, segment, Segmentation};
