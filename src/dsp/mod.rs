//! DSP module tree: primitives, analysis, synthesis and dynamics, in the
//! order the Orchestrator calls them.

pub mod convolve;
pub mod correction;
pub mod fft;
pub mod fir;
pub mod level;
pub mod limiter;
pub mod segmenter;
pub mod spectral;
pub mod utils;
