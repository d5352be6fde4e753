// ============================================================
// Layer 5 — Compute Device Selection
// ============================================================
// The backend is chosen once at startup and the matching device
// is passed explicitly to every component that creates tensors.
//
//   wgpu     GPU through WebGPU; the default device picks the
//            best adapter available (discrete, integrated, then
//            a software fallback)
//   ndarray  plain CPU
//
// Training runs on the Autodiff wrapper of the chosen backend;
// evaluation runs on the bare backend.

use anyhow::bail;
use burn::backend::{Autodiff, NdArray, Wgpu};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

pub use burn::backend::ndarray::NdArrayDevice;
pub use burn::backend::wgpu::WgpuDevice;

pub type WgpuBackend     = Wgpu;
pub type WgpuAutodiff    = Autodiff<Wgpu>;
pub type NdArrayBackend  = NdArray;
pub type NdArrayAutodiff = Autodiff<NdArray>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComputeDevice {
    #[default]
    Wgpu,
    NdArray,
}

impl FromStr for ComputeDevice {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "wgpu" | "gpu"    => Ok(ComputeDevice::Wgpu),
            "ndarray" | "cpu" => Ok(ComputeDevice::NdArray),
            other             => bail!("Unknown device '{other}' (expected wgpu or ndarray)"),
        }
    }
}

impl fmt::Display for ComputeDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComputeDevice::Wgpu    => f.write_str("wgpu"),
            ComputeDevice::NdArray => f.write_str("ndarray"),
        }
    }
}
