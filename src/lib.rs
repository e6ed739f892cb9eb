#![cfg_attr(not(test), no_std)]

use core::sync::atomic::{fence, Ordering};

pub mod sdio;
pub mod tuning;
mod err;

pub use err::SdError;
pub use sdio::{SdioHost, SharedSdioHost};
pub use tuning::{SdhciVariant, SdioVariant, GenericVariant, TuningOps, TuningOutcome};

/// 微秒延时函数
pub(crate) fn delay_us(us: u32) {
    for _ in 0..us * 10 {
        // 防止编译器优化掉的内存屏障
        fence(Ordering::SeqCst);
    }
}
