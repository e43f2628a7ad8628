/// Maximum request body size: 4 MiB. A 478-point frame is roughly 20 KiB.
pub const MAX_BODY_SIZE: usize = 4 * 1024 * 1024;

/// Frames accepted by one `/api/frames/batch` call.
pub const MAX_BATCH_FRAMES: usize = 256;

pub const SSE_KEEPALIVE_SECS: u64 = 15;

/// Shutdown broadcast channel depth.
pub const SHUTDOWN_CHANNEL_CAPACITY: usize = 8;
