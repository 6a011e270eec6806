//! Queue ownership transfers of uploaded buffers.
//!
//! When uploads are recorded on a dedicated transfer encoder, every buffer copied on it is
//! released by the transfer queue and acquired by the graphics queue before it is read.
//! Buffers written through `Queue::write_buffer` never leave the graphics queue. wgpu tracks these hazards internally, so a [`BarrierBatch`] is the record of which
//! buffers changed hands and which graphics stages wait on them.

use std::fmt;

/// The queue a buffer belongs to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum QueueKind {
    Graphics,
    Transfer,
}

bitflags! {
    /// Memory accesses synchronized by a barrier.
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
    pub struct AccessFlags: u32 {
        const NONE = 0;
        const TRANSFER_WRITE = 1 << 0;
        const SHADER_READ = 1 << 1;
        const VERTEX_ATTRIBUTE_READ = 1 << 2;
        const INDEX_READ = 1 << 3;
    }
}

bitflags! {
    /// Graphics pipeline stages that wait on acquired buffers.
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
    pub struct PipelineStages: u32 {
        const NONE = 0;
        const TRANSFER = 1 << 0;
        const VERTEX_INPUT = 1 << 1;
        const VERTEX_SHADER = 1 << 2;
        const FRAGMENT_SHADER = 1 << 3;
    }
}

/// An ownership transfer of one buffer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BufferBarrier {
    pub label: String,
    pub size: u64,
    pub src_queue: QueueKind,
    pub dst_queue: QueueKind,
    pub src_access: AccessFlags,
    pub dst_access: AccessFlags,
}

impl fmt::Display for BufferBarrier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "'{}' ({} bytes) {:?}:{:?} -> {:?}:{:?}",
            self.label, self.size, self.src_queue, self.src_access, self.dst_queue, self.dst_access
        )
    }
}

/// Graphics-side half of an upload.
///
/// With a separate transfer queue the release on the transfer side already made the writes
/// available, so nothing is waited on at the source. Otherwise the transfer writes happened on
/// the graphics queue itself.
pub fn acquire_barrier(
    label: &str,
    size: u64,
    separate_transfer: bool,
    dst_access: AccessFlags,
) -> BufferBarrier {
    BufferBarrier {
        label: label.to_string(),
        size,
        src_queue: if separate_transfer {
            QueueKind::Transfer
        } else {
            QueueKind::Graphics
        },
        dst_queue: QueueKind::Graphics,
        src_access: if separate_transfer {
            AccessFlags::NONE
        } else {
            AccessFlags::TRANSFER_WRITE
        },
        dst_access,
    }
}

/// Transfer-side half of an upload. Only recorded when transfers use their own queue.
pub fn release_barrier(label: &str, size: u64) -> BufferBarrier {
    BufferBarrier {
        label: label.to_string(),
        size,
        src_queue: QueueKind::Transfer,
        dst_queue: QueueKind::Graphics,
        src_access: AccessFlags::TRANSFER_WRITE,
        dst_access: AccessFlags::NONE,
    }
}

/// Barriers collected while uploading one frame.
#[derive(Clone, Debug, Default)]
pub struct BarrierBatch {
    separate_transfer: bool,
    /// Storage buffers read by vertex shaders.
    pub shader_acquires: Vec<BufferBarrier>,
    /// Vertex and index buffers.
    pub vertex_acquires: Vec<BufferBarrier>,
    /// Transfer-side releases.
    pub releases: Vec<BufferBarrier>,
}

impl BarrierBatch {
    /// An empty batch.
    pub fn new(separate_transfer: bool) -> Self {
        Self {
            separate_transfer,
            ..Default::default()
        }
    }

    /// Whether uploads are recorded on a dedicated transfer encoder.
    pub fn separate_transfer(&self) -> bool {
        self.separate_transfer
    }

    fn record(&mut self, label: &str, size: u64, dst_access: AccessFlags, staged: bool) {
        // Queue writes land on the graphics queue whatever encoder the frame uploads on.
        let via_transfer = staged && self.separate_transfer;
        let acquire = acquire_barrier(label, size, via_transfer, dst_access);
        if dst_access.contains(AccessFlags::SHADER_READ) {
            self.shader_acquires.push(acquire);
        } else {
            self.vertex_acquires.push(acquire);
        }
        if via_transfer {
            self.releases.push(release_barrier(label, size));
        }
    }

    /// Records a storage buffer written through the queue and read by shaders.
    pub fn storage_write(&mut self, label: &str, size: u64) {
        self.record(label, size, AccessFlags::SHADER_READ, false);
    }

    /// Records vertex and index data written through the queue.
    pub fn vertex_write(&mut self, label: &str, size: u64) {
        self.record(
            label,
            size,
            AccessFlags::VERTEX_ATTRIBUTE_READ | AccessFlags::INDEX_READ,
            false,
        );
    }

    /// Records vertex and index data copied from a staging buffer on the upload encoder.
    pub fn vertex_upload(&mut self, label: &str, size: u64) {
        self.record(
            label,
            size,
            AccessFlags::VERTEX_ATTRIBUTE_READ | AccessFlags::INDEX_READ,
            true,
        );
    }

    /// Whether no buffer was uploaded.
    pub fn is_empty(&self) -> bool {
        self.shader_acquires.is_empty() && self.vertex_acquires.is_empty()
    }

    /// Emits the batch and returns the graphics stages that wait on it.
    pub fn apply(&self) -> PipelineStages {
        let mut stages = PipelineStages::NONE;
        if !self.shader_acquires.is_empty() {
            stages |= PipelineStages::VERTEX_SHADER;
        }
        if !self.vertex_acquires.is_empty() {
            stages |= PipelineStages::VERTEX_INPUT;
        }

        if log::log_enabled!(log::Level::Trace) {
            for barrier in &self.releases {
                log::trace!("release {barrier}");
            }
            for barrier in self.shader_acquires.iter().chain(&self.vertex_acquires) {
                log::trace!("acquire {barrier}");
            }
        }

        stages
    }

    /// Forgets every barrier.
    pub fn clear(&mut self) {
        self.shader_acquires.clear();
        self.vertex_acquires.clear();
        self.releases.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_source_access_depends_on_queue_split() {
        let shared = acquire_barrier("instances", 64, false, AccessFlags::SHADER_READ);
        assert_eq!(shared.src_access, AccessFlags::TRANSFER_WRITE);
        assert_eq!(shared.src_queue, QueueKind::Graphics);

        let split = acquire_barrier("instances", 64, true, AccessFlags::SHADER_READ);
        assert_eq!(split.src_access, AccessFlags::NONE);
        assert_eq!(split.src_queue, QueueKind::Transfer);
        assert_eq!(split.dst_queue, QueueKind::Graphics);
    }

    #[test]
    fn test_releases_only_with_separate_transfer() {
        let mut batch = BarrierBatch::new(false);
        batch.vertex_upload("meshes", 16);
        assert!(batch.releases.is_empty());
        assert_eq!(batch.vertex_acquires[0].src_queue, QueueKind::Graphics);

        let mut batch = BarrierBatch::new(true);
        batch.vertex_upload("meshes", 16);
        assert_eq!(batch.releases.len(), 1);
        assert_eq!(batch.releases[0].src_access, AccessFlags::TRANSFER_WRITE);
        assert_eq!(batch.vertex_acquires[0].src_queue, QueueKind::Transfer);
    }

    #[test]
    fn test_queue_writes_stay_on_graphics() {
        let mut batch = BarrierBatch::new(true);
        batch.storage_write("instances", 32);
        batch.vertex_write("polygons", 16);

        assert!(batch.releases.is_empty());
        for barrier in batch.shader_acquires.iter().chain(&batch.vertex_acquires) {
            assert_eq!(barrier.src_queue, QueueKind::Graphics);
            assert_eq!(barrier.src_access, AccessFlags::TRANSFER_WRITE);
        }
        assert_eq!(batch.shader_acquires[0].dst_access, AccessFlags::SHADER_READ);
    }

    #[test]
    fn test_apply_reports_waiting_stages() {
        let mut batch = BarrierBatch::new(true);
        assert_eq!(batch.apply(), PipelineStages::NONE);

        batch.storage_write("instances", 32);
        assert_eq!(batch.apply(), PipelineStages::VERTEX_SHADER);

        batch.vertex_write("polygons", 48);
        assert_eq!(
            batch.apply(),
            PipelineStages::VERTEX_SHADER | PipelineStages::VERTEX_INPUT
        );

        batch.clear();
        assert!(batch.is_empty());
    }
}
