#[cfg(target_arch = "wasm32")]
pub mod download;
pub mod runtime;
#[cfg(target_arch = "wasm32")]
pub mod storage;
