pub mod config;
pub mod corr;
pub mod io;
#[cfg(test)]
pub mod tests;
pub mod utils;
pub mod vcf;
