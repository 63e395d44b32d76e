use netem_host::{
    ext::{Arg, Capability, ParamType, Signature},
    PacketContext,
};
use nix::errno::Errno;

use crate::{reader::NetemStatsReader, snapshot::Snapshot};

/// Name programs resolve [`ReadStatsCapability`] by.
pub const READ_STATS: &str = "netem_read_stats";

/// `netem_read_stats(ctx, handle: u32, out: *mut Snapshot) -> i32`
const SIGNATURE: Signature = Signature {
    context: true,
    params: &[ParamType::Scalar, ParamType::MemOut { size: Snapshot::SIZE }],
};

/// [`NetemStatsReader::read_stats`] published to extension programs.
#[derive(Debug, Clone)]
pub struct ReadStatsCapability {
    reader: NetemStatsReader,
}

impl ReadStatsCapability {
    /// Publish `reader`.
    pub fn new(reader: NetemStatsReader) -> Self {
        Self { reader }
    }
}

impl Capability for ReadStatsCapability {
    fn name(&self) -> &'static str {
        READ_STATS
    }

    fn signature(&self) -> Signature {
        SIGNATURE
    }

    fn call(&self, ctx: &PacketContext, args: &mut [Arg<'_>]) -> i32 {
        let [Arg::Scalar(handle), Arg::Mem(out)] = args else {
            return -(Errno::EINVAL as i32);
        };
        let Some(out) = out.get_mut(..Snapshot::SIZE) else {
            return -(Errno::EINVAL as i32);
        };
        // Handles are 32 bits wide; nothing can live above that.
        let Ok(handle) = u32::try_from(*handle) else {
            return -(Errno::ENOENT as i32);
        };

        let mut snapshot = Snapshot::default();
        match self.reader.read_stats(ctx, handle, &mut snapshot) {
            Ok(()) => {
                out.copy_from_slice(&snapshot.to_bytes());
                0
            }
            Err(e) => e.errno(),
        }
    }
}
