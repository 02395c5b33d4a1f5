mod algorithm;
mod backend;
mod errors;
mod hyperparams;
mod init;

pub use algorithm::*;
pub use backend::{
    Accelerator, Backend, ClusteringBackend, ComputeDevice, Convergence, DeviceBuffer, HostDevice,
    Refinement, Sequential, ThreadParallel, UnknownBackend, THREADS_PER_BLOCK,
};
pub use errors::*;
pub use hyperparams::*;
pub use init::*;
