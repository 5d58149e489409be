pub mod alignment;
pub mod binning;
pub mod fit;
pub mod model;
pub mod noise;
pub mod outlier;
