pub mod preview;
pub mod tree;
pub mod view;

pub use preview::{Preview, PreviewBody, PreviewKind};
pub use tree::TreeNode;
pub use view::{Frame, Gesture, ViewState};
