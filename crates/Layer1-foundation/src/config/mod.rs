//! Config - 설정 관리
//!
//! - `tree.rs` - TreeConfig 렌더링/세션 설정

mod tree;

pub use tree::{TreeConfig, ARBOR_DIR, DEFAULT_WIDTH, TREE_CONFIG_FILE};
