// Compute backend selection.
//
// Training always wraps the chosen backend in Autodiff; evaluation
// and export run on the plain backend.

use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

pub type CpuBackend = burn::backend::NdArray;
pub type GpuBackend = burn::backend::Wgpu;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Pure-Rust CPU backend.
    #[default]
    #[value(name = "ndarray")]
    NdArray,
    /// GPU backend via wgpu (Vulkan, Metal, DX12).
    Wgpu,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::NdArray => f.write_str("ndarray"),
            BackendKind::Wgpu    => f.write_str("wgpu"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_names_round_trip_through_json() {
        let json = serde_json::to_string(&BackendKind::NdArray).unwrap();
        assert_eq!(json, "\"ndarray\"");
        let back: BackendKind = serde_json::from_str("\"wgpu\"").unwrap();
        assert_eq!(back, BackendKind::Wgpu);
        assert_eq!(BackendKind::Wgpu.to_string(), "wgpu");
    }
}
