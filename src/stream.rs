//! Interface to the tuner/demux collaborator. The engine displays what the
//! stream controller reports and hands finalized channel-dial entries back to
//! it; channel/volume business logic lives entirely on the other side.

use anyhow::Result;

use crate::state::Teletext;

/// What the stream controller knows about the tuned channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChannelInfo {
    pub program_number: u16,
    pub audio_pid: i16,
    pub video_pid: i16,
    pub teletext: Teletext,
}

/// Channel-change entry point consumed by the dial input. The number is
/// passed exactly as typed; any off-by-one normalization between displayed
/// and internal channel indices is the collaborator's concern.
pub trait StreamControl: Send + Sync {
    fn change_channel(&self, number: u16) -> Result<()>;
}
