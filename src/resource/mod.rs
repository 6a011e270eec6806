//! GPU resources: typed buffers, per-frame instance storage and geometry.

pub use crate::resource::barrier::{
    acquire_barrier, release_barrier, AccessFlags, BarrierBatch, BufferBarrier, PipelineStages,
    QueueKind,
};
pub use crate::resource::buffer::DeviceBuffer;
pub use crate::resource::device_data::DeviceInstanceData;
pub use crate::resource::dynamic_buffer::DynamicUniformBuffer;
pub use crate::resource::host_data::{FlatInstances, InstanceBatch, KeyedInstances};
pub use crate::resource::mesh::{
    GeometryBuffers, GeometryData, Mesh, MeshRegistry, PrimitiveDataLayout, Vertex2d, Vertex3d,
};
pub use crate::resource::primitives::{Primitive, Primitives};

mod barrier;
mod buffer;
mod device_data;
mod dynamic_buffer;
mod host_data;
mod mesh;
pub mod primitives;
