//! In-memory adapters for tests and the scripted demo.
//! 用于测试和演示脚本的内存适配器。

mod backend;
mod selection;

pub use backend::InMemoryBackend;
pub use selection::InMemorySelectionStore;
