pub mod base;
pub mod composite;
pub mod geotiff;
pub mod gradient;
pub mod gridlines;
pub mod steepness;
pub mod track;
